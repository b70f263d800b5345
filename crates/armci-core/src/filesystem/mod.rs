//! Filesystem management for the emulator environment.
//!
//! Provides idempotent single-target mount primitives and the fixed
//! six-layer emulator layout built on top of them.

pub mod emulator;
pub mod mount;
