//! Latest-value landmark handoff
//!
//! The vision provider runs on its own thread and delivers results
//! asynchronously; the control loop reads whatever is current on each tick.
//! `LandmarkMailbox` is a single slot: every post overwrites the previous value
//! and every read returns a copy of the current one. A result may therefore be
//! skipped or read more than once.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::types::LandmarkSet;

/// Single-slot, overwrite-on-write mailbox shared between provider and consumer
#[derive(Debug, Clone, Default)]
pub struct LandmarkMailbox {
    slot: Arc<Mutex<Option<LandmarkSet>>>,
}

impl LandmarkMailbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current value. `None` means no face in the latest result.
    pub fn post(&self, landmarks: Option<LandmarkSet>) {
        *self.lock() = landmarks;
    }

    /// Copy of the current value, leaving it in place
    pub fn latest(&self) -> Option<LandmarkSet> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Option<LandmarkSet>> {
        // A panicking writer can only leave a whole value behind
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
