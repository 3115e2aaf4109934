//! Process-wide shutdown coordinator.

use crate::handler::{Cleanup, Handler};
use crate::signals::SignalListener;
use crate::wait_group::WaitGroup;
use grace_core::{
    LifecycleEvent, LifecycleObserver, Result, ShutdownConfig, Termination, TracingObserver,
    MSG_WAITING,
};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Function used to terminate the process when a halt happens outside of
/// blocking mode
pub type ExitHook = Arc<dyn Fn(i32) + Send + Sync>;

const RUNNING: u8 = 0;
const HALTING: u8 = 1;
const HALTED: u8 = 2;

pub(crate) struct Shared {
    handlers: RwLock<Vec<Arc<Handler>>>,
    outstanding: Arc<WaitGroup>,
    blocking: AtomicBool,
    phase: AtomicU8,
    outcome: Mutex<Option<Termination>>,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    exit: ExitHook,
    config: ShutdownConfig,
    #[cfg(unix)]
    signal_handle: Option<signal_hook::iterator::Handle>,
}

#[cfg(unix)]
impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.signal_handle.take() {
            handle.close();
        }
    }
}

/// Coordinates an exactly-once shutdown across registered handlers.
///
/// Cloning yields another handle to the same coordinator.
///
/// ```no_run
/// use grace_shutdown::Coordinator;
///
/// # fn main() -> grace_core::Result<()> {
/// let coordinator = Coordinator::new()?;
/// let handler = coordinator.on_shutdown(|| println!("closing listener"), true);
///
/// let quit = handler.quit();
/// std::thread::spawn(move || {
///     // serve until the quit channel disconnects
///     let _ = quit.recv();
///     handler.done();
/// });
///
/// coordinator.wait();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Coordinator {
    shared: Arc<Shared>,
}

impl Coordinator {
    /// Coordinator with default config, listening for SIGINT and SIGTERM
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::default()
    }

    pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
        Self { shared }
    }

    /// Register a handler with an optional cleanup callback
    ///
    /// With `wait_for_signal` set, the halt sweep runs the callback and
    /// closes the quit channel but leaves the outstanding count to the
    /// worker's own [`Handler::done`] call.
    ///
    /// The callback runs with the handler locked. It must not wait for the
    /// worker's `done()` (for example by joining the worker thread), or the
    /// two deadlock.
    pub fn register(&self, cleanup: Option<Cleanup>, wait_for_signal: bool) -> Arc<Handler> {
        self.register_inner(None, cleanup, wait_for_signal)
    }

    /// Register a handler whose cleanup is `f`
    pub fn on_shutdown<F>(&self, f: F, wait_for_signal: bool) -> Arc<Handler>
    where
        F: FnOnce() + Send + 'static,
    {
        self.register_inner(None, Some(Box::new(f)), wait_for_signal)
    }

    /// Register a handler with a name used in log output
    pub fn register_named(
        &self,
        name: impl Into<String>,
        cleanup: Option<Cleanup>,
        wait_for_signal: bool,
    ) -> Arc<Handler> {
        self.register_inner(Some(name.into()), cleanup, wait_for_signal)
    }

    fn register_inner(
        &self,
        name: Option<String>,
        cleanup: Option<Cleanup>,
        wait_for_signal: bool,
    ) -> Arc<Handler> {
        if self.is_halted() {
            warn!(
                handler = name.as_deref().unwrap_or("-"),
                "handler registered after halt started; it may not be swept"
            );
        }

        let mut handlers = self.shared.handlers.write();
        let handler = Arc::new(Handler::new(
            handlers.len(),
            name,
            Arc::downgrade(&self.shared),
            Arc::clone(&self.shared.outstanding),
            cleanup,
            wait_for_signal,
        ));
        self.shared.outstanding.add();
        handlers.push(Arc::clone(&handler));

        debug!(
            handler_id = handler.id(),
            wait_for_signal,
            outstanding = self.shared.outstanding.count(),
            "registered shutdown handler"
        );
        handler
    }

    /// Halt every registered handler, at most once per coordinator
    ///
    /// Completes each handler in registration order, notifies observers, and
    /// outside blocking mode exits the process with the configured code.
    /// Calls made while or after a sweep runs return immediately.
    pub fn halt(&self, err: Option<&dyn std::error::Error>) {
        if self
            .shared
            .phase
            .compare_exchange(RUNNING, HALTING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("halt already in progress or finished; ignoring");
            return;
        }

        let event = LifecycleEvent::from_error(err);
        *self.shared.outcome.lock() = Some(event.termination());

        // The sweep holds one unit of work so wait() cannot return before
        // observers have been notified.
        self.shared.outstanding.add();

        // Snapshot so callbacks may register or halt without holding the registry lock.
        let handlers: Vec<Arc<Handler>> = self.shared.handlers.read().clone();
        debug!(handlers = handlers.len(), "halt sweep started");
        for handler in &handlers {
            handler.complete(false);
        }

        for observer in &self.shared.observers {
            if panic::catch_unwind(AssertUnwindSafe(|| observer.on_event(&event))).is_err() {
                warn!(observer = observer.name(), "lifecycle observer panicked");
            }
        }

        self.shared.phase.store(HALTED, Ordering::Release);
        self.shared.outstanding.done();

        if !self.is_blocking() {
            let code = self.shared.config.exit_code(event.is_error());
            debug!(code, "not in blocking mode; exiting");
            (self.shared.exit)(code);
        }
    }

    /// Enter blocking mode and park until the outstanding count reaches zero
    pub fn wait(&self) {
        self.shared.blocking.store(true, Ordering::SeqCst);
        info!(outstanding = self.outstanding(), "{MSG_WAITING}");
        self.shared.outstanding.wait();
        debug!("all shutdown handlers released");
    }

    /// Registered work not yet released
    pub fn outstanding(&self) -> usize {
        self.shared.outstanding.count()
    }

    /// Number of handlers ever registered
    pub fn handler_count(&self) -> usize {
        self.shared.handlers.read().len()
    }

    /// Whether [`Coordinator::wait`] has been called
    pub fn is_blocking(&self) -> bool {
        self.shared.blocking.load(Ordering::SeqCst)
    }

    /// Whether a halt sweep has started
    pub fn is_halted(&self) -> bool {
        self.shared.phase.load(Ordering::Acquire) != RUNNING
    }

    /// How the coordinator was halted, once a halt has started
    pub fn outcome(&self) -> Option<Termination> {
        self.shared.outcome.lock().clone()
    }

    /// Exit code matching the recorded outcome
    pub fn exit_code(&self) -> Option<i32> {
        let config = &self.shared.config;
        self.outcome()
            .map(|t| t.exit_code(config.success_exit_code, config.failure_exit_code))
    }

    pub fn config(&self) -> &ShutdownConfig {
        &self.shared.config
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("handlers", &self.handler_count())
            .field("outstanding", &self.outstanding())
            .field("blocking", &self.is_blocking())
            .field("halted", &self.is_halted())
            .finish()
    }
}

/// Builder for [`Coordinator`]
pub struct CoordinatorBuilder {
    config: ShutdownConfig,
    observers: Vec<Arc<dyn LifecycleObserver>>,
    exit: ExitHook,
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self {
            config: ShutdownConfig::default(),
            observers: vec![Arc::new(TracingObserver)],
            exit: Arc::new(|code: i32| std::process::exit(code)),
        }
    }
}

impl CoordinatorBuilder {
    pub fn config(mut self, config: ShutdownConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a lifecycle observer alongside the default tracing observer
    pub fn observer(mut self, observer: Arc<dyn LifecycleObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Replace the process exit used outside blocking mode
    pub fn exit_with<F>(mut self, exit: F) -> Self
    where
        F: Fn(i32) + Send + Sync + 'static,
    {
        self.exit = Arc::new(exit);
        self
    }

    /// Validate the config, install the signal listener and build
    pub fn build(self) -> Result<Coordinator> {
        self.config.validate()?;

        let listener = if self.config.listen_for_signals {
            Some(SignalListener::register(&self.config.signals)?)
        } else {
            None
        };

        let shared = Arc::new(Shared {
            handlers: RwLock::new(Vec::new()),
            outstanding: Arc::new(WaitGroup::new()),
            blocking: AtomicBool::new(false),
            phase: AtomicU8::new(RUNNING),
            outcome: Mutex::new(None),
            observers: self.observers,
            exit: self.exit,
            #[cfg(unix)]
            signal_handle: listener.as_ref().map(SignalListener::handle),
            config: self.config,
        });

        if let Some(listener) = listener {
            listener.spawn(Arc::downgrade(&shared))?;
        }

        Ok(Coordinator { shared })
    }
}
