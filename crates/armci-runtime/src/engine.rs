//! End-to-end run of one cross-build.

use armci_common::config::BuildSettings;
use armci_common::error::Result;
use armci_core::command::CommandRunner;
use armci_core::filesystem::emulator::{EmulatorLayout, MountLayer, mount_emulator};
use armci_core::filesystem::mount::MountOutcome;
use armci_core::preflight;
use armci_core::vcs::{self, GitHeadSnapshot};

use crate::docker;
use crate::guard::{InterruptFlag, TerminationGuard};

/// What a successful run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Mount outcome for each layer, in mount order.
    pub mounts: Vec<(MountLayer, MountOutcome)>,
    /// Commit HEAD pointed at before and after the build.
    pub head: String,
}

/// Drives a run against a [`CommandRunner`].
pub struct Engine<'a, R: CommandRunner + ?Sized> {
    runner: &'a R,
    interrupt: InterruptFlag,
}

impl<'a, R: CommandRunner + ?Sized> Engine<'a, R> {
    /// Creates an engine that watches `interrupt` between steps.
    pub const fn new(runner: &'a R, interrupt: InterruptFlag) -> Self {
        Self { runner, interrupt }
    }

    /// Runs preflight, mounts the emulator, builds, and cleans up.
    ///
    /// Cleanup runs exactly once after the guard is armed, whatever the
    /// build outcome. If git HEAD moved, the integrity error wins over any
    /// build error, which is logged instead.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error: a missing tool, a dirty working tree,
    /// a mount failure, a failed build, an interrupt, or an integrity
    /// violation.
    pub fn run(&self, settings: &BuildSettings) -> Result<RunReport> {
        preflight::require_tools(self.runner)?;
        vcs::ensure_clean(self.runner, &settings.working_dir)?;

        let snapshot = GitHeadSnapshot::capture(self.runner, &settings.working_dir)?;
        let head = snapshot.commit().to_owned();
        let layout = EmulatorLayout::from_settings(settings);
        let guard = TerminationGuard::arm(self.runner, &layout, &settings.working_dir, snapshot);

        let outcome = self.run_guarded(settings, &layout);
        let integrity = guard.finish();

        match (outcome, integrity) {
            (Ok(mounts), Ok(())) => Ok(RunReport { mounts, head }),
            (Err(e), Ok(())) | (Ok(_), Err(e)) => Err(e),
            (Err(build), Err(integrity)) => {
                tracing::error!(error = %build, "build failed");
                Err(integrity)
            }
        }
    }

    fn run_guarded(
        &self,
        settings: &BuildSettings,
        layout: &EmulatorLayout,
    ) -> Result<Vec<(MountLayer, MountOutcome)>> {
        self.interrupt.check()?;
        let mounts = mount_emulator(self.runner, layout)?;

        self.interrupt.check()?;
        let built = docker::run_build(self.runner, settings);
        // An interrupted container exits non-zero; report the interrupt.
        self.interrupt.check()?;
        built?;

        Ok(mounts)
    }
}
