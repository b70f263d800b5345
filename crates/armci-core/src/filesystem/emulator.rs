//! The emulator rootfs and its nested pseudo-filesystems.
//!
//! Six layers, all under one mount point:
//!
//! | layer    | options     | source                      | target          |
//! |----------|-------------|-----------------------------|-----------------|
//! | root     |             | `<emulator>/platform/…ext4` | `<root>`        |
//! | proc     | `-t proc`   | `/proc`                     | `<root>/proc`   |
//! | dev      | `-o bind`   | `/dev/`                     | `<root>/dev`    |
//! | dev/pts  | `-o bind`   | `/dev/pts`                  | `<root>/dev/pts`|
//! | shm      | `-t tmpfs`  | `shm`                       | `<root>/run/shm`|
//! | sys      | `-o bind`   | `/sys`                      | `<root>/sys`    |

use std::fmt;
use std::path::{Path, PathBuf};

use armci_common::config::BuildSettings;
use armci_common::constants::SHM_DIR;
use armci_common::error::Result;

use super::mount::{MountOutcome, MountSpec, UnmountOutcome, ensure_mount, ensure_unmount};
use crate::command::{CommandLine, CommandRunner};

/// One layer of the emulator environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MountLayer {
    /// The rootfs image itself.
    Root,
    /// `proc` filesystem.
    Proc,
    /// Bind of the host `/dev`.
    Dev,
    /// Bind of the host `/dev/pts`, nested under `Dev`.
    DevPts,
    /// Shared-memory tmpfs.
    Shm,
    /// Bind of the host `/sys`.
    Sys,
}

impl MountLayer {
    /// Mount order: parents before children.
    pub const MOUNT_ORDER: [Self; 6] = [
        Self::Root,
        Self::Proc,
        Self::Dev,
        Self::DevPts,
        Self::Shm,
        Self::Sys,
    ];

    /// Unmount order: every child before its parent, root last.
    pub const UNMOUNT_ORDER: [Self; 6] = [
        Self::Proc,
        Self::DevPts,
        Self::Dev,
        Self::Shm,
        Self::Sys,
        Self::Root,
    ];
}

impl fmt::Display for MountLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Root => "root",
            Self::Proc => "proc",
            Self::Dev => "dev",
            Self::DevPts => "dev/pts",
            Self::Shm => "shm",
            Self::Sys => "sys",
        })
    }
}

/// Where the emulator comes from and where it is mounted.
///
/// Mount specs are derived on demand, so every target is a subpath of
/// `mount_path` and cannot be configured separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorLayout {
    rootfs_image: PathBuf,
    mount_path: PathBuf,
}

impl EmulatorLayout {
    /// Creates a layout from an explicit image and mount point.
    #[must_use]
    pub fn new(rootfs_image: impl Into<PathBuf>, mount_path: impl Into<PathBuf>) -> Self {
        Self {
            rootfs_image: rootfs_image.into(),
            mount_path: mount_path.into(),
        }
    }

    /// Creates the layout described by the build settings.
    #[must_use]
    pub fn from_settings(settings: &BuildSettings) -> Self {
        Self::new(settings.rootfs_image(), settings.mount_path.clone())
    }

    /// Returns the root mount point.
    #[must_use]
    pub fn mount_path(&self) -> &Path {
        &self.mount_path
    }

    /// Returns the mount point of `layer`.
    #[must_use]
    pub fn target(&self, layer: MountLayer) -> PathBuf {
        match layer {
            MountLayer::Root => self.mount_path.clone(),
            MountLayer::Proc => self.mount_path.join("proc"),
            MountLayer::Dev => self.mount_path.join("dev"),
            MountLayer::DevPts => self.mount_path.join("dev/pts"),
            MountLayer::Shm => self.mount_path.join(SHM_DIR),
            MountLayer::Sys => self.mount_path.join("sys"),
        }
    }

    /// Returns the mount spec for `layer`.
    #[must_use]
    pub fn spec(&self, layer: MountLayer) -> MountSpec {
        let (options, source) = match layer {
            MountLayer::Root => ("", self.rootfs_image.clone()),
            MountLayer::Proc => ("-t proc", PathBuf::from("/proc")),
            MountLayer::Dev => ("-o bind", PathBuf::from("/dev/")),
            MountLayer::DevPts => ("-o bind", PathBuf::from("/dev/pts")),
            MountLayer::Shm => ("-t tmpfs", PathBuf::from("shm")),
            MountLayer::Sys => ("-o bind", PathBuf::from("/sys")),
        };
        MountSpec {
            options,
            source,
            target: self.target(layer),
        }
    }
}

/// Brings up all six layers in [`MountLayer::MOUNT_ORDER`].
///
/// Creates the root mount point first if it does not exist. Layers that are
/// already mounted are left alone.
///
/// # Errors
///
/// Returns an error as soon as the mount point cannot be created or any
/// layer fails to mount. Later layers are not attempted.
pub fn mount_emulator<R>(runner: &R, layout: &EmulatorLayout) -> Result<Vec<(MountLayer, MountOutcome)>>
where
    R: CommandRunner + ?Sized,
{
    if !layout.mount_path.is_dir() {
        let cmd = CommandLine::new("mkdir")
            .arg("-p")
            .arg(&layout.mount_path)
            .elevated();
        tracing::info!(cmd = %cmd, "creating mount point");
        let _ = runner.run(&cmd)?.check(&cmd)?;
    }

    let mut outcomes = Vec::with_capacity(MountLayer::MOUNT_ORDER.len());
    for layer in MountLayer::MOUNT_ORDER {
        let outcome = ensure_mount(runner, &layout.spec(layer))?;
        tracing::debug!(%layer, ?outcome, "layer ready");
        outcomes.push((layer, outcome));
    }
    Ok(outcomes)
}

/// Tears down all six layers in [`MountLayer::UNMOUNT_ORDER`].
///
/// Every layer is attempted even if an earlier one fails.
pub fn unmount_emulator<R>(runner: &R, layout: &EmulatorLayout) -> Vec<(MountLayer, UnmountOutcome)>
where
    R: CommandRunner + ?Sized,
{
    MountLayer::UNMOUNT_ORDER
        .into_iter()
        .map(|layer| (layer, ensure_unmount(runner, &layout.target(layer))))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedRunner;

    fn layout() -> EmulatorLayout {
        EmulatorLayout::new("/emul/platform/rootfs-t30.ext4", "/mnt/emul")
    }

    fn all_targets(layout: &EmulatorLayout, order: [MountLayer; 6]) -> Vec<PathBuf> {
        order.into_iter().map(|l| layout.target(l)).collect()
    }

    #[test]
    fn every_target_is_under_mount_path() {
        let layout = layout();
        for layer in MountLayer::MOUNT_ORDER {
            assert!(layout.target(layer).starts_with(layout.mount_path()));
        }
        assert_eq!(layout.target(MountLayer::Shm), PathBuf::from("/mnt/emul/run/shm"));
        assert_eq!(layout.target(MountLayer::DevPts), PathBuf::from("/mnt/emul/dev/pts"));
    }

    #[test]
    fn root_spec_mounts_rootfs_image() {
        let spec = layout().spec(MountLayer::Root);
        assert_eq!(spec.options, "");
        assert_eq!(spec.source, PathBuf::from("/emul/platform/rootfs-t30.ext4"));
        assert_eq!(spec.target, PathBuf::from("/mnt/emul"));
    }

    #[test]
    fn mount_emulator_mounts_root_first() {
        let runner = ScriptedRunner::new();
        let layout = layout();

        let outcomes = mount_emulator(&runner, &layout).unwrap();

        assert_eq!(runner.mount_targets(), all_targets(&layout, MountLayer::MOUNT_ORDER));
        assert!(outcomes.iter().all(|(_, o)| *o == MountOutcome::Mounted));
    }

    #[test]
    fn mount_emulator_creates_missing_mount_point() {
        let runner = ScriptedRunner::new();
        let _ = mount_emulator(&runner, &layout()).unwrap();
        assert_eq!(runner.count_program("mkdir"), 1);
    }

    #[test]
    fn mount_emulator_skips_existing_mount_point() {
        let dir = tempfile::tempdir().unwrap();
        let runner = ScriptedRunner::new();
        let layout = EmulatorLayout::new("/emul/platform/rootfs-t30.ext4", dir.path());

        let _ = mount_emulator(&runner, &layout).unwrap();
        assert_eq!(runner.count_program("mkdir"), 0);
    }

    #[test]
    fn mount_emulator_is_idempotent() {
        let runner = ScriptedRunner::new();
        let layout = layout();

        let _ = mount_emulator(&runner, &layout).unwrap();
        let second = mount_emulator(&runner, &layout).unwrap();

        assert_eq!(runner.mount_targets().len(), 6);
        assert!(second.iter().all(|(_, o)| *o == MountOutcome::AlreadyMounted));
    }

    #[test]
    fn mount_emulator_stops_at_first_failure() {
        let runner = ScriptedRunner::new();
        let layout = layout();
        runner.fail_mount(&layout.target(MountLayer::Dev));

        assert!(mount_emulator(&runner, &layout).is_err());
        assert_eq!(
            runner.mount_targets(),
            vec![layout.target(MountLayer::Root), layout.target(MountLayer::Proc)]
        );
    }

    #[test]
    fn unmount_emulator_unmounts_root_last() {
        let runner = ScriptedRunner::new();
        let layout = layout();
        let _ = mount_emulator(&runner, &layout).unwrap();

        let outcomes = unmount_emulator(&runner, &layout);

        assert_eq!(runner.unmount_targets(), all_targets(&layout, MountLayer::UNMOUNT_ORDER));
        assert!(outcomes.iter().all(|(_, o)| *o == UnmountOutcome::Unmounted));
        assert_eq!(runner.unmount_targets().last(), Some(&layout.target(MountLayer::Root)));
    }

    #[test]
    fn unmount_emulator_continues_past_failures() {
        let runner = ScriptedRunner::new();
        let layout = layout();
        let _ = mount_emulator(&runner, &layout).unwrap();
        runner.fail_unmount(&layout.target(MountLayer::DevPts));

        let outcomes = unmount_emulator(&runner, &layout);

        assert_eq!(outcomes.len(), 6);
        assert!(matches!(outcomes[1], (MountLayer::DevPts, UnmountOutcome::Failed(_))));
        assert_eq!(runner.unmount_targets().len(), 5);
    }

    #[test]
    fn unmount_emulator_on_clean_host_is_noop() {
        let runner = ScriptedRunner::new();
        let outcomes = unmount_emulator(&runner, &layout());
        assert!(outcomes.iter().all(|(_, o)| *o == UnmountOutcome::NotMounted));
        assert!(runner.unmount_targets().is_empty());
    }
}
