//! System-wide constants and fixed paths.

/// Rootfs image location, relative to the emulator directory.
pub const ROOTFS_IMAGE: &str = "platform/rootfs-t30.ext4";

/// Shared-memory tmpfs mount point, relative to the rootfs mount.
pub const SHM_DIR: &str = "run/shm";

/// Directory the working tree is bind-mounted to inside the build container.
pub const CONTAINER_WORKDIR: &str = "/opt/code";

/// Build entry point, relative to the working tree.
pub const BUILD_SCRIPT: &str = "./build.sh";

/// Build output directory whose ownership is restored after a container build.
pub const OUTPUT_DIR: &str = "Bin";

/// Toolchain image for arm on Ubuntu 14.04.
pub const TRUSTY_ARM_IMAGE: &str = "microsoft/dotnet-buildtools-prereqs:ubuntu1404_cross_prereqs_v3";

/// Cross rootfs location baked into the arm toolchain image.
pub const TRUSTY_ARM_ROOTFS_DIR: &str = "/crossrootfs/arm";

/// Program used to elevate privileged commands.
pub const SUDO: &str = "sudo";

/// Application name used in CLI output.
pub const APP_NAME: &str = "armci";

/// Message printed when the run is aborted with Ctrl-C.
pub const INTERRUPT_MESSAGE: &str = "Ctrl-C handled. Script aborted before complete execution.";
