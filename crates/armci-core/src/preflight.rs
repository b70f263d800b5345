//! Presence checks for the host tools a run depends on.

use armci_common::error::{ArmCiError, Result};

use crate::command::CommandRunner;

/// Tools every full run invokes.
///
/// `lsof` is optional: the open-file check before unmounting is skipped
/// when it cannot be started.
pub const REQUIRED_TOOLS: [&str; 5] = ["git", "mountpoint", "mount", "umount", "docker"];

/// Fails on the first required tool that is not on `PATH`.
///
/// The runner's elevation tool (`sudo` for non-root users) is checked too.
///
/// # Errors
///
/// Returns [`ArmCiError::ToolNotFound`] naming the missing program.
pub fn require_tools<R>(runner: &R) -> Result<()>
where
    R: CommandRunner + ?Sized,
{
    for tool in runner.elevation_tool().into_iter().chain(REQUIRED_TOOLS) {
        match runner.locate(tool) {
            Some(path) => tracing::debug!(tool, path = %path.display(), "found tool"),
            None => return Err(ArmCiError::ToolNotFound { tool }),
        }
    }
    Ok(())
}
