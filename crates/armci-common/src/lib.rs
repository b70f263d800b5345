//! # armci-common
//!
//! Shared types, error definitions, the immutable build configuration, and
//! constants used across the armci workspace.
//!
//! This crate is the leaf of the dependency graph. It depends on no other
//! internal crate and provides the primitives that the mount manager, the
//! runtime engine and the CLI build upon.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
