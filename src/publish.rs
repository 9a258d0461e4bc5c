//! Hand-off of published estimates to consumers on other threads.
//!
//! The pipeline owns the only [`EstimatePublisher`]; any number of
//! [`EstimateReader`]s observe the latest snapshot.

use crate::filters::HeadPositionEstimate;
use std::sync::{Arc, PoisonError, RwLock};

/// One published estimate
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EstimateSnapshot {
    /// Number of estimates published before this one
    pub sequence: u64,
    pub estimate: HeadPositionEstimate,
}

type Slot = Arc<RwLock<Option<EstimateSnapshot>>>;

/// Single writer of estimate snapshots
#[derive(Debug, Default)]
pub struct EstimatePublisher {
    slot: Slot,
    next_sequence: u64,
}

impl EstimatePublisher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current snapshot
    pub fn publish(&mut self, estimate: HeadPositionEstimate) -> EstimateSnapshot {
        let snapshot = EstimateSnapshot {
            sequence: self.next_sequence,
            estimate,
        };
        self.next_sequence += 1;
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(snapshot);
        snapshot
    }

    /// A new reader of this publisher's snapshots
    #[must_use]
    pub fn reader(&self) -> EstimateReader {
        EstimateReader {
            slot: Arc::clone(&self.slot),
        }
    }
}

/// Read-only view of the latest snapshot
#[derive(Debug, Clone)]
pub struct EstimateReader {
    slot: Slot,
}

impl EstimateReader {
    /// Latest snapshot, `None` until the first publish
    #[must_use]
    pub fn latest(&self) -> Option<EstimateSnapshot> {
        *self.slot.read().unwrap_or_else(PoisonError::into_inner)
    }
}
