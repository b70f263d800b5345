//! Unified error types for the armci workspace.
//!
//! Variants are grouped by how the CLI reacts to them: validation errors
//! print usage, everything else is reported on its own. Unmount failures are
//! deliberately absent, they never surface as errors.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum ArmCiError {
    /// A required command-line argument was not supplied.
    #[error("missing required argument --{name}")]
    MissingArgument {
        /// Flag name, without leading dashes.
        name: &'static str,
    },

    /// An argument value could not be parsed.
    #[error("invalid value '{value}' for {what}")]
    InvalidValue {
        /// What the value was meant to describe.
        what: &'static str,
        /// Offending input.
        value: String,
    },

    /// Two otherwise valid arguments cannot be combined.
    #[error("{message}")]
    InvalidCombination {
        /// Description of the conflict.
        message: String,
    },

    /// A path the build depends on does not exist.
    #[error("path does not exist: {}", path.display())]
    MissingPath {
        /// Path that was expected on disk.
        path: PathBuf,
    },

    /// A required host tool is not installed.
    #[error("required tool not found in PATH: {tool}")]
    ToolNotFound {
        /// Program name that could not be located.
        tool: &'static str,
    },

    /// The git working tree has uncommitted changes.
    #[error("please commit or stash uncommitted changes before building:\n{status}")]
    DirtyWorkingTree {
        /// Porcelain status output describing the changes.
        status: String,
    },

    /// Mounting one layer of the emulator failed.
    #[error("failed to mount {}: {reason}", target.display())]
    Mount {
        /// Mount point that could not be brought up.
        target: PathBuf,
        /// Output of the failing mount command.
        reason: String,
    },

    /// Git HEAD moved while the build was running.
    #[error("git HEAD was updated during the build: initial HEAD was {initial}, current HEAD is {current}")]
    Integrity {
        /// Commit captured before any mount.
        initial: String,
        /// Commit observed during cleanup.
        current: String,
    },

    /// An external program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        /// Program that failed to spawn.
        program: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// An external program exited unsuccessfully.
    #[error("{program} exited with status {code}: {stderr}")]
    CommandFailed {
        /// Rendered command line.
        program: String,
        /// Exit code, `-1` if terminated by a signal.
        code: i32,
        /// Captured standard error, trimmed.
        stderr: String,
    },

    /// An I/O operation failed.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The run was aborted by an interrupt signal.
    #[error("interrupted before complete execution")]
    Interrupted,
}

impl ArmCiError {
    /// Returns whether the CLI should print usage text alongside this error.
    #[must_use]
    pub const fn shows_usage(&self) -> bool {
        matches!(
            self,
            Self::MissingArgument { .. }
                | Self::InvalidValue { .. }
                | Self::InvalidCombination { .. }
                | Self::MissingPath { .. }
        )
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, ArmCiError>;
