//! Background OS-signal listener feeding the halt path.

use crate::coordinator::Shared;
use grace_core::{Result, SignalKind};
use std::sync::Weak;

#[cfg(unix)]
pub(crate) use unix::SignalListener;

#[cfg(not(unix))]
pub(crate) use fallback::SignalListener;

/// Raw signal number for a configured signal kind
#[cfg(unix)]
pub fn raw_signal(kind: SignalKind) -> i32 {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
    match kind {
        SignalKind::Interrupt => SIGINT,
        SignalKind::Terminate => SIGTERM,
        SignalKind::Hangup => SIGHUP,
        SignalKind::Quit => SIGQUIT,
    }
}

#[cfg(unix)]
fn signal_name(raw: i32, kinds: &[SignalKind]) -> String {
    kinds
        .iter()
        .find(|kind| raw_signal(**kind) == raw)
        .map(|kind| kind.name().to_string())
        .unwrap_or_else(|| format!("signal {raw}"))
}

#[cfg(unix)]
mod unix {
    use super::*;
    use crate::coordinator::Coordinator;
    use grace_core::Error;
    use signal_hook::iterator::{Handle, Signals};
    use std::thread;
    use tracing::{debug, info};

    /// Registered but not yet running signal listener
    pub(crate) struct SignalListener {
        signals: Signals,
        kinds: Vec<SignalKind>,
    }

    impl SignalListener {
        /// Install handlers for `kinds` so that they no longer terminate the process
        pub(crate) fn register(kinds: &[SignalKind]) -> Result<Self> {
            let raw: Vec<i32> = kinds.iter().map(|kind| raw_signal(*kind)).collect();
            let signals = Signals::new(raw).map_err(|e| {
                Error::signal_registration(
                    kinds.iter().map(|kind| kind.name().to_string()).collect(),
                    e,
                )
            })?;
            Ok(Self {
                signals,
                kinds: kinds.to_vec(),
            })
        }

        pub(crate) fn handle(&self) -> Handle {
            self.signals.handle()
        }

        /// Forward the first received signal into `halt(None)`
        ///
        /// The thread holds only a weak reference, so it never keeps the
        /// coordinator alive; it stops when the coordinator is dropped.
        pub(crate) fn spawn(self, shared: Weak<Shared>) -> Result<()> {
            let Self { mut signals, kinds } = self;
            let names: Vec<String> = kinds.iter().map(|k| k.name().to_string()).collect();

            thread::Builder::new()
                .name("grace-signals".to_string())
                .spawn(move || {
                    for raw in signals.forever() {
                        let name = signal_name(raw, &kinds);
                        let Some(shared) = shared.upgrade() else {
                            break;
                        };
                        let coordinator = Coordinator::from_shared(shared);
                        if coordinator.is_halted() {
                            info!(signal = %name, "Received signal '{name}' while shutting down; ignoring");
                            continue;
                        }
                        info!(signal = %name, "Received signal '{name}'! Exiting...");
                        coordinator.halt(None);
                    }
                    debug!("signal listener stopped");
                })
                .map_err(|e| Error::signal_registration(names, e))?;

            Ok(())
        }
    }
}

#[cfg(not(unix))]
mod fallback {
    use super::*;
    use tracing::warn;

    pub(crate) struct SignalListener;

    impl SignalListener {
        pub(crate) fn register(kinds: &[SignalKind]) -> Result<Self> {
            warn!(
                signals = ?kinds,
                "signal listener is only supported on unix; halts must be requested explicitly"
            );
            Ok(Self)
        }

        pub(crate) fn spawn(self, _shared: Weak<Shared>) -> Result<()> {
            Ok(())
        }
    }
}
