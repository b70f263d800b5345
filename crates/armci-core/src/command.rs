//! External command execution.
//!
//! Every program armci depends on is invoked through [`CommandRunner`], so
//! the mount manager, git checks and container build share one place that
//! decides about privilege elevation, output capture and logging.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::process::Command;

use armci_common::constants::SUDO;
use armci_common::error::{ArmCiError, Result};

/// How a command's standard streams are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Capture stdout and stderr into the returned [`CommandOutput`].
    #[default]
    Capture,
    /// Stream directly to the terminal. Used for long-running builds.
    Inherit,
}

/// Description of a single external invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name, resolved through `PATH`.
    pub program: String,
    /// Arguments in order.
    pub args: Vec<OsString>,
    /// Extra environment variables.
    pub env: Vec<(String, String)>,
    /// Whether the command needs root privileges.
    pub elevated: bool,
    /// Stream handling.
    pub output: OutputMode,
}

impl CommandLine {
    /// Starts a command line for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            elevated: false,
            output: OutputMode::Capture,
        }
    }

    /// Appends one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Appends several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Sets an environment variable for the child.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Marks the command as requiring root privileges.
    #[must_use]
    pub const fn elevated(mut self) -> Self {
        self.elevated = true;
        self
    }

    /// Streams output to the terminal instead of capturing it.
    #[must_use]
    pub const fn inherit_output(mut self) -> Self {
        self.output = OutputMode::Inherit;
        self
    }

    /// Returns the last argument, lossily converted. Mount-style commands
    /// put their target there.
    #[must_use]
    pub fn last_arg(&self) -> Option<String> {
        self.args.last().map(|a| a.to_string_lossy().into_owned())
    }

    /// Returns whether any argument equals `needle`.
    #[must_use]
    pub fn has_arg(&self, needle: &str) -> bool {
        self.args.iter().any(|a| a == needle)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elevated {
            write!(f, "{SUDO} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Result of a finished external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `-1` when the process was killed by a signal.
    pub code: i32,
    /// Captured standard output. Empty for inherited output.
    pub stdout: String,
    /// Captured standard error. Empty for inherited output.
    pub stderr: String,
}

impl CommandOutput {
    /// Creates an output with the given exit code and no captured text.
    #[must_use]
    pub const fn with_code(code: i32) -> Self {
        Self {
            code,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    /// Returns whether the command exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.code == 0
    }

    /// Converts a non-zero exit into [`ArmCiError::CommandFailed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the exit code is non-zero.
    pub fn check(self, cmd: &CommandLine) -> Result<Self> {
        if self.success() {
            Ok(self)
        } else {
            Err(ArmCiError::CommandFailed {
                program: cmd.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_owned(),
            })
        }
    }
}

/// Executes external programs on behalf of armci.
///
/// Implementations block until the program exits. No timeout is applied.
pub trait CommandRunner {
    /// Runs the command to completion.
    ///
    /// A non-zero exit is not an error at this level; callers decide with
    /// [`CommandOutput::check`].
    ///
    /// # Errors
    ///
    /// Returns an error only if the program could not be started.
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput>;

    /// Locates a program on `PATH`.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    /// Returns the program used to elevate privileged commands, if any is needed.
    fn elevation_tool(&self) -> Option<&'static str>;
}

/// Runner backed by real processes.
///
/// Elevated commands are prefixed with `sudo` unless the effective user is
/// already root.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    as_root: bool,
}

impl SystemRunner {
    /// Creates a runner for the current effective user.
    #[must_use]
    pub fn new() -> Self {
        Self {
            as_root: nix::unistd::geteuid().is_root(),
        }
    }

    fn build(&self, cmd: &CommandLine) -> Command {
        let mut command = if cmd.elevated && !self.as_root {
            let mut c = Command::new(SUDO);
            let _ = c.arg(&cmd.program);
            c
        } else {
            Command::new(&cmd.program)
        };
        let _ = command
            .args(&cmd.args)
            .envs(cmd.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        command
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput> {
        tracing::debug!(cmd = %cmd, "running");
        let mut command = self.build(cmd);
        let spawn_err = |source| ArmCiError::Spawn {
            program: cmd.program.clone(),
            source,
        };

        match cmd.output {
            OutputMode::Capture => {
                let output = command.output().map_err(spawn_err)?;
                Ok(CommandOutput {
                    code: output.status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                })
            }
            OutputMode::Inherit => {
                let status = command.status().map_err(spawn_err)?;
                Ok(CommandOutput::with_code(status.code().unwrap_or(-1)))
            }
        }
    }

    fn elevation_tool(&self) -> Option<&'static str> {
        (!self.as_root).then_some(SUDO)
    }
}
