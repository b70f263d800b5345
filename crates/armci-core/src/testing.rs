//! Scripted [`CommandRunner`] for tests.
//!
//! Simulates the pieces of the host armci talks to: a mount table driven by
//! `mountpoint`/`mount`/`umount`, a git repository answering `status` and
//! `rev-parse`, and arbitrary exit codes for other programs. Every command
//! is recorded in order.

#![allow(clippy::missing_panics_doc)]

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::{Path, PathBuf};

use armci_common::error::{ArmCiError, Result};

use crate::command::{CommandLine, CommandOutput, CommandRunner};

type Hook = Box<dyn FnMut()>;

#[derive(Default)]
struct State {
    log: Vec<CommandLine>,
    mounted: BTreeSet<PathBuf>,
    mounted_log: Vec<PathBuf>,
    unmounted_log: Vec<PathBuf>,
    failing_mounts: BTreeSet<PathBuf>,
    failing_unmounts: BTreeSet<PathBuf>,
    open_files: String,
    porcelain: String,
    heads: VecDeque<String>,
    exit_codes: HashMap<String, i32>,
    hooks: HashMap<String, Hook>,
    missing_tools: BTreeSet<String>,
}

/// In-memory stand-in for the host.
pub struct ScriptedRunner {
    state: RefCell<State>,
}

impl ScriptedRunner {
    /// Creates a runner with an empty mount table, a clean working tree and
    /// HEAD fixed at `0000000`.
    #[must_use]
    pub fn new() -> Self {
        let state = State {
            heads: VecDeque::from([String::from("0000000")]),
            ..State::default()
        };
        Self {
            state: RefCell::new(state),
        }
    }

    /// Marks `target` as mounted before the run starts.
    pub fn premount(&self, target: &Path) {
        let _ = self.state.borrow_mut().mounted.insert(target.to_path_buf());
    }

    /// Makes every `mount` onto `target` fail.
    pub fn fail_mount(&self, target: &Path) {
        let _ = self.state.borrow_mut().failing_mounts.insert(target.to_path_buf());
    }

    /// Makes every `umount` of `target` fail.
    pub fn fail_unmount(&self, target: &Path) {
        let _ = self.state.borrow_mut().failing_unmounts.insert(target.to_path_buf());
    }

    /// Sets the listing returned by `lsof`.
    pub fn set_open_files(&self, listing: &str) {
        listing.clone_into(&mut self.state.borrow_mut().open_files);
    }

    /// Sets the output of `git status --porcelain`.
    pub fn set_porcelain(&self, status: &str) {
        status.clone_into(&mut self.state.borrow_mut().porcelain);
    }

    /// Sets the sequence of commits returned by `git rev-parse`. The last
    /// one repeats once the others are consumed.
    pub fn set_heads<I, S>(&self, heads: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state.borrow_mut().heads = heads.into_iter().map(Into::into).collect();
    }

    /// Sets the exit code returned for `program`.
    pub fn set_exit_code(&self, program: &str, code: i32) {
        let _ = self
            .state
            .borrow_mut()
            .exit_codes
            .insert(program.to_owned(), code);
    }

    /// Runs `hook` every time `program` is executed.
    pub fn on_run(&self, program: &str, hook: impl FnMut() + 'static) {
        let _ = self
            .state
            .borrow_mut()
            .hooks
            .insert(program.to_owned(), Box::new(hook));
    }

    /// Makes [`CommandRunner::locate`] fail for `program`.
    pub fn hide_tool(&self, program: &str) {
        let _ = self.state.borrow_mut().missing_tools.insert(program.to_owned());
    }

    /// Returns whether `target` is currently in the simulated mount table.
    #[must_use]
    pub fn is_mounted(&self, target: &Path) -> bool {
        self.state.borrow().mounted.contains(target)
    }

    /// Returns every command run so far.
    #[must_use]
    pub fn log(&self) -> Vec<CommandLine> {
        self.state.borrow().log.clone()
    }

    /// Returns the programs run so far, in order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.state.borrow().log.iter().map(|c| c.program.clone()).collect()
    }

    /// Returns how many times `program` was run.
    #[must_use]
    pub fn count_program(&self, program: &str) -> usize {
        self.state
            .borrow()
            .log
            .iter()
            .filter(|c| c.program == program)
            .count()
    }

    /// Returns targets mounted successfully, in order.
    #[must_use]
    pub fn mount_targets(&self) -> Vec<PathBuf> {
        self.state.borrow().mounted_log.clone()
    }

    /// Returns targets unmounted successfully, in order.
    #[must_use]
    pub fn unmount_targets(&self) -> Vec<PathBuf> {
        self.state.borrow().unmounted_log.clone()
    }

    fn respond(state: &mut State, cmd: &CommandLine) -> CommandOutput {
        let target = cmd.last_arg().map(PathBuf::from).unwrap_or_default();
        match cmd.program.as_str() {
            "mountpoint" => CommandOutput::with_code(if state.mounted.contains(&target) { 0 } else { 32 }),
            "mount" if state.failing_mounts.contains(&target) => CommandOutput {
                code: 32,
                stdout: String::new(),
                stderr: format!("mount: {}: permission denied", target.display()),
            },
            "mount" => {
                let _ = state.mounted.insert(target.clone());
                state.mounted_log.push(target);
                CommandOutput::with_code(0)
            }
            "umount" if state.failing_unmounts.contains(&target) => CommandOutput {
                code: 32,
                stdout: String::new(),
                stderr: format!("umount: {}: target is busy", target.display()),
            },
            "umount" => {
                let _ = state.mounted.remove(&target);
                state.unmounted_log.push(target);
                CommandOutput::with_code(0)
            }
            "lsof" => CommandOutput {
                code: i32::from(state.open_files.is_empty()),
                stdout: state.open_files.clone(),
                stderr: String::new(),
            },
            "git" if cmd.has_arg("status") => CommandOutput {
                code: 0,
                stdout: state.porcelain.clone(),
                stderr: String::new(),
            },
            "git" if cmd.has_arg("rev-parse") => {
                let head = if state.heads.len() > 1 {
                    state.heads.pop_front().unwrap_or_default()
                } else {
                    state.heads.front().cloned().unwrap_or_default()
                };
                CommandOutput {
                    code: 0,
                    stdout: format!("{head}\n"),
                    stderr: String::new(),
                }
            }
            other => CommandOutput::with_code(state.exit_codes.get(other).copied().unwrap_or(0)),
        }
    }
}

impl Default for ScriptedRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, cmd: &CommandLine) -> Result<CommandOutput> {
        // Hooks may call back into the runner, so take them out of the
        // state before invoking.
        let hook = self.state.borrow_mut().hooks.remove(&cmd.program);
        if let Some(mut hook) = hook {
            hook();
            let _ = self
                .state
                .borrow_mut()
                .hooks
                .insert(cmd.program.clone(), hook);
        }

        let mut state = self.state.borrow_mut();
        if state.missing_tools.contains(&cmd.program) {
            return Err(ArmCiError::Spawn {
                program: cmd.program.clone(),
                source: std::io::ErrorKind::NotFound.into(),
            });
        }
        state.log.push(cmd.clone());
        Ok(Self::respond(&mut state, cmd))
    }

    fn locate(&self, program: &str) -> Option<PathBuf> {
        if self.state.borrow().missing_tools.contains(program) {
            None
        } else {
            Some(PathBuf::from("/usr/bin").join(program))
        }
    }

    fn elevation_tool(&self) -> Option<&'static str> {
        None
    }
}
