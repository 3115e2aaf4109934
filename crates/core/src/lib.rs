//! Core types, errors and configuration for the `grace` shutdown coordinator.
//!
//! ## Key Components
//!
//! - **`errors`**: the primary `Error` enum and `Result` alias shared by every
//!   crate in the workspace.
//! - **`config`**: `ShutdownConfig` and the `SignalKind` it is expressed in.
//! - **`events`**: lifecycle events and the observer trait the coordinator
//!   notifies when a halt sweep finishes.
//! - **`constants`**: exit codes, environment variable names and lifecycle
//!   messages.

pub mod config;
pub mod constants;
pub mod errors;
pub mod events;
pub mod testing;

pub use self::{
    config::{ShutdownConfig, SignalKind},
    constants::*,
    errors::{Error, Result},
    events::{LifecycleEvent, LifecycleObserver, Termination, TracingObserver},
};
