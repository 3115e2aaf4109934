//! Shared utilities for grace
//!
//! Currently this is the tracing setup used by binaries built on the
//! coordinator.

pub mod tracing;

pub use self::tracing::*;
