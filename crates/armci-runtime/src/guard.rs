//! Guaranteed cleanup on every exit path.
//!
//! Two pieces cooperate:
//! - [`InterruptFlag`] is raised from a Ctrl-C handler. The handler thread
//!   only logs and flips an atomic; the run loop notices and bails out.
//! - [`TerminationGuard`] is armed before the first mount. Its cleanup
//!   (unmount everything, then compare git HEAD) runs exactly once, either
//!   through [`TerminationGuard::finish`] or from `Drop`.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use armci_common::constants::INTERRUPT_MESSAGE;
use armci_common::error::{ArmCiError, Result};
use armci_core::command::CommandRunner;
use armci_core::filesystem::emulator::{EmulatorLayout, unmount_emulator};
use armci_core::filesystem::mount::UnmountOutcome;
use armci_core::vcs::GitHeadSnapshot;

/// Shared flag set when the user interrupts the run.
#[derive(Debug, Clone, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    /// Creates a lowered flag with no signal handler attached.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a flag and installs the process-wide Ctrl-C handler that raises it.
    ///
    /// Must be called once, before anything is mounted.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler is already installed or the signal
    /// cannot be hooked.
    pub fn install() -> std::result::Result<Self, ctrlc::Error> {
        let flag = Self::new();
        let handler_flag = flag.clone();
        ctrlc::set_handler(move || {
            announce_interrupt(std::io::stderr().lock());
            tracing::debug!("interrupt flag raised");
            handler_flag.raise();
        })?;
        Ok(flag)
    }

    /// Raises the flag.
    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Returns whether the flag has been raised.
    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Fails with [`ArmCiError::Interrupted`] once the flag is raised.
    ///
    /// # Errors
    ///
    /// Returns an error if the run was interrupted.
    pub fn check(&self) -> Result<()> {
        if self.is_raised() {
            Err(ArmCiError::Interrupted)
        } else {
            Ok(())
        }
    }
}

/// Writes the interrupt notice straight to `out`, independent of the log filter.
fn announce_interrupt<W: Write>(mut out: W) {
    let _ = writeln!(out, "{INTERRUPT_MESSAGE}");
}

/// Unmounts the emulator and checks git HEAD when the run ends.
///
/// Cleanup from `Drop` relies on unwinding; the release profile must not
/// set `panic = "abort"`.
pub struct TerminationGuard<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    layout: &'a EmulatorLayout,
    repo: &'a Path,
    // Taken by the first cleanup; `None` means cleanup already ran.
    snapshot: Option<GitHeadSnapshot>,
}

impl<'a, R: CommandRunner + ?Sized> TerminationGuard<'a, R> {
    /// Arms the guard. Call before the first mount.
    pub const fn arm(
        runner: &'a R,
        layout: &'a EmulatorLayout,
        repo: &'a Path,
        snapshot: GitHeadSnapshot,
    ) -> Self {
        Self {
            runner,
            layout,
            repo,
            snapshot: Some(snapshot),
        }
    }

    /// Runs cleanup now and returns the git integrity verdict.
    ///
    /// Unmount failures are logged only.
    ///
    /// # Errors
    ///
    /// Returns [`ArmCiError::Integrity`] if HEAD moved during the run.
    pub fn finish(mut self) -> Result<()> {
        self.cleanup()
    }

    fn cleanup(&mut self) -> Result<()> {
        let Some(snapshot) = self.snapshot.take() else {
            return Ok(());
        };

        tracing::info!(mount_path = %self.layout.mount_path().display(), "unmounting emulator");
        let failed: Vec<_> = unmount_emulator(self.runner, self.layout)
            .into_iter()
            .filter(|(_, outcome)| matches!(outcome, UnmountOutcome::Failed(_)))
            .map(|(layer, _)| layer.to_string())
            .collect();
        if !failed.is_empty() {
            tracing::warn!(layers = ?failed, "some emulator layers are still mounted");
        }

        snapshot.verify(self.runner, self.repo)
    }
}

impl<R: CommandRunner + ?Sized> Drop for TerminationGuard<'_, R> {
    fn drop(&mut self) {
        if let Err(e) = self.cleanup() {
            tracing::error!(error = %e, "cleanup after abnormal exit");
        }
    }
}
