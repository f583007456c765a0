//! Single-slot latest-snapshot channel
//!
//! The producer swaps in a new `Arc<Snapshot>`; readers clone the current
//! `Arc` and serialize it on their own time. The lock guards only the
//! pointer swap and clone, never serialization.

use parking_lot::RwLock;
use std::sync::Arc;

use super::snapshot::Snapshot;

/// Latest-value holder shared between the sequencing thread and readers
#[derive(Debug, Clone, Default)]
pub struct SnapshotPublisher {
    latest: Arc<RwLock<Option<Arc<Snapshot>>>>,
}

impl SnapshotPublisher {
    /// Create an empty publisher
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored snapshot
    pub fn publish(&self, snapshot: Arc<Snapshot>) {
        let previous = self.latest.write().replace(snapshot);
        // Last reference to the superseded snapshot is released outside the lock
        drop(previous);
    }

    /// Most recently published snapshot, if any
    pub fn fetch_latest(&self) -> Option<Arc<Snapshot>> {
        self.latest.read().clone()
    }

    /// Sequence number of the latest snapshot
    pub fn latest_seq(&self) -> Option<u64> {
        self.latest.read().as_ref().map(|s| s.seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::inventory::InventorySummary;
    use crate::runtime::phase::PhaseFacts;
    use crate::runtime::snapshot::{CarryFlags, Targets};
    use chrono::Utc;

    fn snapshot(seq: u64) -> Arc<Snapshot> {
        Arc::new(Snapshot {
            seq,
            ts: Utc::now(),
            logged_in: false,
            in_minigame: false,
            in_main_region: false,
            player: None,
            inventory: InventorySummary::default(),
            carrying: CarryFlags::default(),
            targets: Targets::default(),
            phase: PhaseFacts::default(),
        })
    }

    #[test]
    fn test_empty_until_published() {
        let publisher = SnapshotPublisher::new();
        assert!(publisher.fetch_latest().is_none());
        assert_eq!(publisher.latest_seq(), None);
    }

    #[test]
    fn test_publish_replaces() {
        let publisher = SnapshotPublisher::new();
        let reader = publisher.clone();
        let first = snapshot(1);
        publisher.publish(first.clone());
        publisher.publish(snapshot(2));

        let latest = reader.fetch_latest().unwrap();
        assert_eq!(latest.seq, 2);
        // A reader holding the old snapshot keeps it intact
        assert_eq!(first.seq, 1);
        assert_eq!(Arc::strong_count(&first), 1);
    }
}
