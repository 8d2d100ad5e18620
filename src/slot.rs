//! Single-slot handoff of the latest flushed batch to the viewer.
//!
//! One writer (the publisher, on the accumulator task) and one reader (the
//! viewer). Only the freshest snapshot is ever visible: publishing
//! overwrites an unread snapshot, and sampling is a destructive read.

use crate::types::BatchSnapshot;
use std::sync::Mutex;
use tracing::debug;

#[derive(Default)]
pub struct LatestBatchSlot {
    inner: Mutex<Option<BatchSnapshot>>,
}

impl LatestBatchSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a snapshot, replacing any unread one.
    pub fn publish(&self, snapshot: BatchSnapshot) {
        if let Ok(mut slot) = self.inner.lock() {
            if let Some(replaced) = slot.replace(snapshot) {
                debug!(
                    batch_id = %replaced.batch_id,
                    "Unsampled batch replaced by newer flush"
                );
            }
        }
    }

    /// Destructive read: returns the pending snapshot and empties the slot.
    pub fn try_sample(&self) -> Option<BatchSnapshot> {
        self.inner.lock().ok().and_then(|mut slot| slot.take())
    }
}
