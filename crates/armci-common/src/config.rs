//! Immutable build configuration.
//!
//! Built exactly once from the parsed command line and then passed by
//! reference to every operation. Nothing downstream mutates it.

use std::path::{Path, PathBuf};

use crate::constants::ROOTFS_IMAGE;
use crate::types::{Architecture, BuildConfiguration, LinuxCodeName};

/// Settings for a single cross-build run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    /// Emulator directory containing `platform/rootfs-t30.ext4`.
    pub emulator_path: PathBuf,
    /// Mount point for the emulator rootfs. Created if absent.
    pub mount_path: PathBuf,
    /// Build flavor forwarded to the build script.
    pub configuration: BuildConfiguration,
    /// Target architecture.
    pub arch: Architecture,
    /// Target distribution.
    pub code_name: LinuxCodeName,
    /// Whether verbose output was requested.
    pub verbose: bool,
    /// Repository root, bind-mounted into the build container.
    pub working_dir: PathBuf,
}

impl BuildSettings {
    /// Returns the location of the rootfs image inside the emulator directory.
    #[must_use]
    pub fn rootfs_image(&self) -> PathBuf {
        rootfs_image_in(&self.emulator_path)
    }
}

/// Returns the rootfs image path for the given emulator directory.
#[must_use]
pub fn rootfs_image_in(emulator_path: &Path) -> PathBuf {
    emulator_path.join(ROOTFS_IMAGE)
}
