//! Run orchestration for the armci cross-build.
//!
//! Ties the host primitives of `armci-core` into one guarded run: the
//! emulator is mounted under a [`guard::TerminationGuard`] that unmounts it
//! and checks git HEAD exactly once however the run ends.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod docker;
pub mod engine;
pub mod guard;
