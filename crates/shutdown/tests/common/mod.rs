#![allow(dead_code)]
//! Shared helpers for shutdown integration tests

use grace_core::testing::RecordingObserver;
use grace_core::ShutdownConfig;
use grace_shutdown::{Cleanup, Coordinator};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;

/// Coordinator wired for tests: no signal listener, recorded events and a
/// non-terminating exit hook
pub struct Harness {
    pub coordinator: Coordinator,
    pub recorder: RecordingObserver,
    pub exits: Arc<Mutex<Vec<i32>>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(ShutdownConfig::without_signals())
    }

    pub fn with_config(config: ShutdownConfig) -> Self {
        let recorder = RecordingObserver::new();
        let exits = Arc::new(Mutex::new(Vec::new()));
        let exits_clone = Arc::clone(&exits);
        let coordinator = Coordinator::builder()
            .config(config)
            .observer(Arc::new(recorder.clone()))
            .exit_with(move |code| exits_clone.lock().push(code))
            .build()
            .expect("test coordinator");
        Self {
            coordinator,
            recorder,
            exits,
        }
    }

    /// Call `wait()` on a background thread; the receiver fires when it returns
    pub fn spawn_waiter(&self) -> Receiver<()> {
        let (tx, rx) = mpsc::channel();
        let coordinator = self.coordinator.clone();
        thread::spawn(move || {
            coordinator.wait();
            let _ = tx.send(());
        });
        while !self.coordinator.is_blocking() {
            thread::yield_now();
        }
        rx
    }
}

/// Cleanup callback that bumps `counter`
pub fn counting(counter: &Arc<AtomicUsize>) -> Option<Cleanup> {
    let counter = Arc::clone(counter);
    Some(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
}
