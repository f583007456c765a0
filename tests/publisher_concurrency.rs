use chrono::{TimeZone, Utc};
use riftwatch::runtime::inventory::InventorySummary;
use riftwatch::runtime::phase::PhaseFacts;
use riftwatch::runtime::snapshot::{CarryFlags, Targets};
use riftwatch::{Snapshot, SnapshotPublisher};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

const PUBLISHES: u64 = 2_000;
const READERS: usize = 4;

fn snapshot(seq: u64) -> Arc<Snapshot> {
    Arc::new(Snapshot {
        seq,
        ts: Utc.timestamp_opt(1_700_000_000 + seq as i64, 0).unwrap(),
        logged_in: seq % 2 == 0,
        in_minigame: true,
        in_main_region: seq % 3 == 0,
        player: None,
        inventory: InventorySummary {
            essence: (seq % 29) as u32,
            pouch_essence: (seq % 41) as u32,
            ..InventorySummary::default()
        },
        carrying: CarryFlags::default(),
        targets: Targets::default(),
        phase: PhaseFacts {
            guardian_energy: Some((seq % 101) as u32),
            ..PhaseFacts::default()
        },
    })
}

#[test]
fn readers_only_see_published_instances() {
    let published: Arc<Vec<Arc<Snapshot>>> = Arc::new((1..=PUBLISHES).map(snapshot).collect());
    let publisher = SnapshotPublisher::new();
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let publisher = publisher.clone();
            let published = published.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut last_seq = 0;
                let mut observed = 0u64;
                loop {
                    let finished = done.load(Ordering::Acquire);
                    if let Some(seen) = publisher.fetch_latest() {
                        let expected = &published[(seen.seq - 1) as usize];
                        assert!(Arc::ptr_eq(&seen, expected));
                        assert_eq!(*seen, **expected);
                        // Serializing outside the lock sees a whole snapshot
                        let json = serde_json::to_value(&*seen).unwrap();
                        assert_eq!(json["seq"], seen.seq);
                        assert!(seen.seq >= last_seq);
                        last_seq = seen.seq;
                        observed += 1;
                    }
                    if finished {
                        break;
                    }
                }
                (last_seq, observed)
            })
        })
        .collect();

    for snapshot in published.iter() {
        publisher.publish(snapshot.clone());
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        let (last_seq, observed) = reader.join().unwrap();
        assert_eq!(last_seq, PUBLISHES);
        assert!(observed > 0);
    }
    assert_eq!(publisher.latest_seq(), Some(PUBLISHES));
}
