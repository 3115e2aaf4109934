//! Exactly-once graceful shutdown for processes with many background workers
//!
//! Workers register a [`Handler`] with the [`Coordinator`], optionally with a
//! cleanup callback. A halt, requested by a signal, by application code, or
//! by any single handler, sweeps every handler once in registration order:
//! the cleanup callback runs, the handler's quit channel disconnects, and
//! the outstanding-work count is released. The main thread parks in
//! [`Coordinator::wait`] until that count reaches zero.
//!
//! There are two kinds of handlers:
//!
//! - **auto-complete** (`wait_for_signal = false`): the sweep releases the
//!   handler's share of the outstanding count.
//! - **wait-for-signal** (`wait_for_signal = true`): the sweep runs the
//!   callback and closes the channel, but the count is only released when
//!   the worker calls [`Handler::done`] after it has actually stopped.
//!
//! Until [`Coordinator::wait`] is called, a halt exits the process directly
//! with the configured success or failure code.
//!
//! ## Locking
//!
//! The registry sits behind a read/write lock and each handler has its own
//! mutex. The sweep snapshots the registry and releases the lock before
//! completing any handler, so independent cleanup callbacks never contend on
//! a global lock and a callback may register or halt without deadlocking.
//! A callback runs while its handler's mutex is held, so it must not call
//! [`Handler::done`] on its own handler, and it must not block on anything
//! that waits for that call either, such as joining the worker thread that
//! owns the handler. Signal the worker and return; the worker calls `done()`
//! once the sweep has moved on.

pub mod coordinator;
pub mod handler;
pub mod signals;
pub mod wait_group;

pub use coordinator::{Coordinator, CoordinatorBuilder, ExitHook};
pub use handler::{Cleanup, Handler};
pub use wait_group::WaitGroup;

use grace_core::{Result, ShutdownConfig};
use once_cell::sync::OnceCell;

static GLOBAL: OnceCell<Coordinator> = OnceCell::new();

/// Process-wide coordinator, created on first use
///
/// Built from the default config with `GRACE_*` environment overrides
/// applied. Every call returns the same coordinator.
pub fn global() -> Result<&'static Coordinator> {
    GLOBAL.get_or_try_init(|| {
        let config = ShutdownConfig::default().with_env_overrides()?;
        Coordinator::builder().config(config).build()
    })
}
