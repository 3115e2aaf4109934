//! Background workers run by the demo service.
//!
//! - **pollers** tick on an interval and push ticks into the pump. They use
//!   wait-for-signal handlers: on halt they finish the current tick, stop,
//!   and only then call `done()`.
//! - the **pump** buffers ticks and flushes them in batches. Its
//!   wait-for-signal handler flushes the buffer as cleanup; the pump then
//!   drains the channel until every poller has dropped its sender, flushes
//!   the rest and calls `done()`.
//! - the optional **watchdog** simulates a fatal condition by halting the
//!   whole process with an error.

use crossbeam::channel::{self, Receiver, Sender};
use crossbeam::select;
use grace_core::Error;
use grace_shutdown::Coordinator;
use grace_utils::worker_span;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, trace};

const PUMP_CAPACITY: usize = 64;
const PUMP_BATCH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub poller: usize,
    pub seq: u64,
}

/// Handle to the running pump
pub struct Pump {
    flushed: Arc<AtomicU64>,
    thread: JoinHandle<()>,
}

impl Pump {
    /// Start the pump; ticks are fed through the returned sender and its clones
    ///
    /// The pump keeps accepting ticks after a halt until every sender has
    /// been dropped, so nothing accepted by the channel is lost.
    pub fn start(coordinator: &Coordinator) -> std::io::Result<(Self, Sender<Tick>)> {
        let (ticks, rx) = channel::bounded(PUMP_CAPACITY);
        let buffer = Arc::new(Mutex::new(Vec::with_capacity(PUMP_BATCH)));
        let flushed = Arc::new(AtomicU64::new(0));

        let handler = {
            let buffer = Arc::clone(&buffer);
            let flushed = Arc::clone(&flushed);
            coordinator.register_named(
                "pump",
                Some(Box::new(move || {
                    let pending = flush(&buffer, &flushed);
                    info!(
                        pending,
                        total = flushed.load(Ordering::SeqCst),
                        "pump flushed on shutdown"
                    );
                })),
                true,
            )
        };

        let thread = {
            let flushed = Arc::clone(&flushed);
            thread::Builder::new()
                .name("pump".to_string())
                .spawn(move || {
                    let _span = worker_span("pump", 0).entered();
                    pump_loop(&rx, &handler.quit(), &buffer, &flushed);
                    handler.done();
                })?
        };

        Ok((Self { flushed, thread }, ticks))
    }

    /// Wait for the pump thread and return the number of ticks flushed
    pub fn join(self) -> u64 {
        if self.thread.join().is_err() {
            tracing::error!("pump thread panicked");
        }
        self.flushed.load(Ordering::SeqCst)
    }
}

fn pump_loop(
    rx: &Receiver<Tick>,
    quit: &Receiver<()>,
    buffer: &Mutex<Vec<Tick>>,
    flushed: &AtomicU64,
) {
    loop {
        select! {
            recv(rx) -> msg => match msg {
                Ok(tick) => accept(tick, buffer, flushed),
                Err(_) => break,
            },
            recv(quit) -> _ => {
                debug!("pump draining until all producers stop");
                break;
            }
        }
    }

    // Blocks until every sender is gone.
    for tick in rx.iter() {
        accept(tick, buffer, flushed);
    }
    let last = flush(buffer, flushed);
    debug!(batch = last, "pump stopped");
}

fn accept(tick: Tick, buffer: &Mutex<Vec<Tick>>, flushed: &AtomicU64) {
    trace!(poller = tick.poller, seq = tick.seq, "tick received");
    let full = {
        let mut buffer = buffer.lock();
        buffer.push(tick);
        buffer.len() >= PUMP_BATCH
    };
    if full {
        let n = flush(buffer, flushed);
        debug!(batch = n, "pump flushed batch");
    }
}

fn flush(buffer: &Mutex<Vec<Tick>>, flushed: &AtomicU64) -> usize {
    let batch = std::mem::take(&mut *buffer.lock());
    flushed.fetch_add(batch.len() as u64, Ordering::SeqCst);
    batch.len()
}

/// Start a poller; the join handle yields the number of ticks it produced
pub fn spawn_poller(
    coordinator: &Coordinator,
    index: usize,
    interval: Duration,
    ticks: Sender<Tick>,
) -> std::io::Result<JoinHandle<u64>> {
    let handler = coordinator.register_named(format!("poller-{index}"), None, true);

    thread::Builder::new()
        .name(format!("poller-{index}"))
        .spawn(move || {
            let _span = worker_span("poller", index).entered();
            let quit = handler.quit();
            let mut seq = 0;
            loop {
                select! {
                    recv(quit) -> _ => break,
                    default(interval) => {
                        seq += 1;
                        if ticks.try_send(Tick { poller: index, seq }).is_err() {
                            debug!(seq, "pump unavailable; tick dropped");
                        }
                    }
                }
            }
            info!(ticks = seq, "poller stopped");
            handler.done();
            seq
        })
}

/// Halt the process with an error after `after`, unless it stops first
pub fn spawn_watchdog(coordinator: &Coordinator, after: Duration) -> std::io::Result<()> {
    let handler = coordinator.register_named("watchdog", None, false);

    thread::Builder::new()
        .name("watchdog".to_string())
        .spawn(move || {
            let quit = handler.quit();
            select! {
                recv(quit) -> _ => debug!("watchdog stopped"),
                default(after) => {
                    let err = Error::worker(
                        "watchdog",
                        format!("no heartbeat within {}ms", after.as_millis()),
                    );
                    handler.halt(Some(&err));
                }
            }
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use grace_core::ShutdownConfig;

    fn coordinator() -> Coordinator {
        Coordinator::builder()
            .config(ShutdownConfig::without_signals())
            .exit_with(|_| {})
            .build()
            .unwrap()
    }

    #[test]
    fn test_pump_flushes_every_accepted_tick() {
        let coordinator = coordinator();
        let (pump, tx) = Pump::start(&coordinator).unwrap();
        for seq in 0..5 {
            tx.send(Tick { poller: 0, seq }).unwrap();
        }

        coordinator.halt(None);
        assert_eq!(coordinator.outstanding(), 1);

        // Producers that have not stopped yet are still drained.
        for seq in 5..7 {
            tx.send(Tick { poller: 0, seq }).unwrap();
        }
        drop(tx);

        assert_eq!(pump.join(), 7);
        assert_eq!(coordinator.outstanding(), 0);
    }

    #[test]
    fn test_pump_flushes_batches_while_running() {
        let coordinator = coordinator();
        let (pump, tx) = Pump::start(&coordinator).unwrap();
        for seq in 0..(PUMP_BATCH as u64 * 2 + 3) {
            tx.send(Tick { poller: 1, seq }).unwrap();
        }
        drop(tx);

        assert_eq!(pump.join(), PUMP_BATCH as u64 * 2 + 3);
        assert!(!coordinator.is_halted());
    }

    #[test]
    fn test_poller_stops_and_releases_on_halt() {
        let coordinator = coordinator();
        let (tx, rx) = channel::unbounded();
        let poller = spawn_poller(&coordinator, 0, Duration::from_millis(5), tx).unwrap();

        thread::sleep(Duration::from_millis(40));
        coordinator.halt(None);

        let produced = poller.join().unwrap();
        assert!(produced > 0);
        assert_eq!(rx.try_iter().count() as u64, produced);
        assert_eq!(coordinator.outstanding(), 0);
    }

    #[test]
    fn test_watchdog_halts_with_error() {
        let coordinator = coordinator();
        spawn_watchdog(&coordinator, Duration::from_millis(10)).unwrap();

        coordinator.wait();

        assert_eq!(
            coordinator.outcome(),
            Some(grace_core::Termination::Error(
                "worker 'watchdog' failed: no heartbeat within 10ms".to_string()
            ))
        );
    }
}
