//! # armci-core
//!
//! Host-side primitives for the armci cross-build orchestrator.
//!
//! This crate provides:
//! - **Command execution**: a single [`command::CommandRunner`] seam through
//!   which every external program (`mount`, `git`, `docker`, ...) is run.
//! - **Filesystem**: idempotent mount/unmount of the emulator rootfs and its
//!   pseudo-filesystems, always re-querying the live mount table.
//! - **Version control**: working-tree cleanliness and HEAD snapshots.
//! - **Preflight**: presence checks for the host tools the run depends on.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod command;
pub mod filesystem;
pub mod preflight;
pub mod vcs;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
