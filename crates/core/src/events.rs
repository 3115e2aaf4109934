//! Lifecycle events emitted by the shutdown coordinator
//!
//! The coordinator does not format or log its own termination. Instead it
//! notifies every registered [`LifecycleObserver`] with exactly one
//! [`LifecycleEvent`] per halt sweep. The default observer,
//! [`TracingObserver`], turns those events into log lines.

use crate::constants::{MSG_TERMINATED_GRACEFULLY, MSG_TERMINATED_WITH_ERROR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Notification emitted once a halt sweep has completed every handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleEvent {
    /// The halt was requested without an error (signal or explicit)
    TerminatedGracefully,
    /// The halt was requested with an error
    TerminatedWithError(String),
}

impl LifecycleEvent {
    /// Build the event matching an optional halt error
    pub fn from_error(err: Option<&(dyn std::error::Error + '_)>) -> Self {
        match err {
            Some(e) => LifecycleEvent::TerminatedWithError(e.to_string()),
            None => LifecycleEvent::TerminatedGracefully,
        }
    }

    /// Whether this event reports an error
    pub fn is_error(&self) -> bool {
        matches!(self, LifecycleEvent::TerminatedWithError(_))
    }

    /// The termination outcome this event describes
    pub fn termination(&self) -> Termination {
        match self {
            LifecycleEvent::TerminatedGracefully => Termination::Graceful,
            LifecycleEvent::TerminatedWithError(message) => Termination::Error(message.clone()),
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleEvent::TerminatedGracefully => f.write_str(MSG_TERMINATED_GRACEFULLY),
            LifecycleEvent::TerminatedWithError(err) => {
                write!(f, "{MSG_TERMINATED_WITH_ERROR}: {err}")
            }
        }
    }
}

/// How the process was asked to stop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    Graceful,
    Error(String),
}

impl Termination {
    /// Map the outcome to a process exit code
    pub fn exit_code(&self, success: i32, failure: i32) -> i32 {
        match self {
            Termination::Graceful => success,
            Termination::Error(_) => failure,
        }
    }
}

/// Observer of coordinator lifecycle events
///
/// Observers are invoked on the thread that ran the halt sweep, after every
/// handler has been completed and before the process exits in non-blocking
/// mode. Implementations should return quickly.
pub trait LifecycleObserver: Send + Sync {
    /// Handle a lifecycle event
    fn on_event(&self, event: &LifecycleEvent);

    /// Observer name for debugging
    fn name(&self) -> &'static str;
}

/// Observer that reports lifecycle events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl LifecycleObserver for TracingObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::TerminatedGracefully => tracing::info!("{event}"),
            LifecycleEvent::TerminatedWithError(_) => tracing::error!("{event}"),
        }
    }

    fn name(&self) -> &'static str {
        "tracing"
    }
}
