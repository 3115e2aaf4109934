//! Test helpers shared by the workspace's test suites

use crate::events::{LifecycleEvent, LifecycleObserver};
use parking_lot::Mutex;
use std::sync::Arc;

/// Observer that records every lifecycle event it receives
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<LifecycleEvent>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events received so far
    pub fn events(&self) -> Vec<LifecycleEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }
}

impl LifecycleObserver for RecordingObserver {
    fn on_event(&self, event: &LifecycleEvent) {
        self.events.lock().push(event.clone());
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
