//! Per-worker cleanup handler
//!
//! A [`Handler`] is created by [`Coordinator::register`](crate::Coordinator::register)
//! and completes exactly once, either when the coordinator sweeps it during a
//! halt or when its worker calls [`Handler::done`], whichever acquires the
//! handler's guard first.

use crate::coordinator::{Coordinator, Shared};
use crate::wait_group::WaitGroup;
use crossbeam::channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use tracing::{debug, error, warn};

/// Cleanup callback run once when a handler completes
pub type Cleanup = Box<dyn FnOnce() + Send + 'static>;

struct HandlerState {
    active: bool,
    decremented: bool,
    cleanup: Option<Cleanup>,
    quit_tx: Option<Sender<()>>,
}

/// A registered unit of cleanup work
pub struct Handler {
    id: usize,
    name: Option<String>,
    owner: Weak<Shared>,
    outstanding: Arc<WaitGroup>,
    auto_complete: bool,
    quit_rx: Receiver<()>,
    state: Mutex<HandlerState>,
}

impl Handler {
    pub(crate) fn new(
        id: usize,
        name: Option<String>,
        owner: Weak<Shared>,
        outstanding: Arc<WaitGroup>,
        cleanup: Option<Cleanup>,
        wait_for_signal: bool,
    ) -> Self {
        let (quit_tx, quit_rx) = crossbeam::channel::bounded(1);
        Self {
            id,
            name,
            owner,
            outstanding,
            auto_complete: !wait_for_signal,
            quit_rx,
            state: Mutex::new(HandlerState {
                active: true,
                decremented: false,
                cleanup,
                quit_tx: Some(quit_tx),
            }),
        }
    }

    /// Registration index within the owning coordinator
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the sweep decrements the outstanding count for this handler
    pub fn is_auto_complete(&self) -> bool {
        self.auto_complete
    }

    /// Whether the handler has not completed yet
    ///
    /// Must not be called from the handler's own cleanup callback.
    pub fn is_active(&self) -> bool {
        self.state.lock().active
    }

    /// Receiver that disconnects when the handler completes
    ///
    /// Nothing is ever sent on the channel; `recv()` returning an error is
    /// the stop notification. Any number of receivers may be taken.
    pub fn quit(&self) -> Receiver<()> {
        self.quit_rx.clone()
    }

    /// Whether the stop notification has been broadcast
    pub fn is_quit(&self) -> bool {
        matches!(
            self.quit_rx.try_recv(),
            Err(crossbeam::channel::TryRecvError::Disconnected)
        )
    }

    /// Request a process-wide halt from this handler's context
    pub fn halt(&self, err: Option<&dyn std::error::Error>) {
        match self.owner.upgrade() {
            Some(shared) => Coordinator::from_shared(shared).halt(err),
            None => warn!(
                handler_id = self.id,
                handler = self.label(),
                "halt requested after coordinator was dropped"
            ),
        }
    }

    /// Signal that the worker owning this handler has finished
    ///
    /// Runs the cleanup callback and closes the quit channel if the halt
    /// sweep has not done so already, and always releases this handler's
    /// share of the outstanding count exactly once.
    ///
    /// Must not be called from the handler's own cleanup callback.
    pub fn done(&self) {
        self.complete(true);
    }

    /// Exactly-once completion shared by the halt sweep and [`Handler::done`]
    pub(crate) fn complete(&self, force_decrement: bool) {
        let mut state = self.state.lock();

        if !state.active {
            if force_decrement && !state.decremented {
                state.decremented = true;
                self.outstanding.done();
                debug!(
                    handler_id = self.id,
                    handler = self.label(),
                    "deferred completion released"
                );
            }
            return;
        }

        if let Some(cleanup) = state.cleanup.take() {
            if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(cleanup)) {
                error!(
                    handler_id = self.id,
                    handler = self.label(),
                    panic = %panic_message(payload.as_ref()),
                    "cleanup callback panicked"
                );
            }
        }

        // Dropping the only sender disconnects every receiver.
        state.quit_tx.take();

        if self.auto_complete || force_decrement {
            state.decremented = true;
            self.outstanding.done();
        }
        state.active = false;

        debug!(
            handler_id = self.id,
            handler = self.label(),
            released = state.decremented,
            "handler completed"
        );
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("-")
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("auto_complete", &self.auto_complete)
            .finish_non_exhaustive()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
