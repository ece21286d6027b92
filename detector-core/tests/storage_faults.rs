use core::time::Duration;

use detector_core::record::{RECORD_BEGIN, ResetRecord};
use detector_core::telemetry::TrackerEvent;
use detector_core::{MemoryStore, Persistence, ResetCycleTracker, TrackerFault};

const TIMEOUT: Duration = Duration::from_secs(10);

fn tracker(store: MemoryStore) -> ResetCycleTracker<MemoryStore> {
    ResetCycleTracker::new(3, TIMEOUT, store)
}

#[test]
fn unavailable_store_never_reports_multi_reset() {
    let mut tracker = tracker(MemoryStore::unavailable());
    assert_eq!(tracker.persistence(), Persistence::Unavailable);
    assert_eq!(tracker.last_fault(), Some(TrackerFault::StoreUnavailable));

    for _ in 0..6 {
        assert!(!tracker.detect());
    }
    assert_eq!(tracker.persistence(), Persistence::Unavailable);
    assert_eq!(tracker.last_fault(), Some(TrackerFault::StoreUnavailable));
}

#[test]
fn read_failure_is_not_reported_as_corruption() {
    let mut tracker = tracker(MemoryStore::new(ResetRecord::with_count(3).to_word()).failing_reads());

    assert!(!tracker.detect(), "an unreadable record counts as absent");
    assert_eq!(tracker.last_fault(), Some(TrackerFault::StoreReadFailed));
    assert_eq!(tracker.persistence(), Persistence::MemoryFallback);
    assert!(
        tracker
            .events()
            .oldest_first()
            .all(|record| !matches!(
                record.event,
                TrackerEvent::Fault(TrackerFault::RecordCorrupt { .. })
            ))
    );
    assert_eq!(tracker.record(), ResetRecord::with_count(1));
}

#[test]
fn memory_fallback_keeps_repeated_calls_consistent() {
    let mut tracker = tracker(MemoryStore::blank().failing_reads());

    assert!(!tracker.detect());
    assert!(!tracker.detect());
    assert!(!tracker.detect());
    assert!(tracker.detect(), "in-memory count reached the threshold");
    assert_eq!(tracker.record().to_word(), RECORD_BEGIN);

    let store = tracker.into_store();
    assert_eq!(store.commit_count(), 0, "nothing reaches a faulted store");
}

#[test]
fn write_failure_is_distinguishable_from_no_detection() {
    let mut tracker = tracker(MemoryStore::new(RECORD_BEGIN).failing_writes());

    assert!(!tracker.detect());
    let status = tracker.status();
    assert!(!status.detected);
    assert!(status.waiting);
    assert_eq!(status.last_fault, Some(TrackerFault::StoreWriteFailed));
    assert_eq!(status.persistence, Persistence::MemoryFallback);
    assert_eq!(status.record, ResetRecord::with_count(2));
    assert_eq!(tracker.store().committed(), RECORD_BEGIN);
}

#[test]
fn commit_failure_surfaces_from_cancel() {
    let mut tracker = tracker(MemoryStore::new(RECORD_BEGIN).failing_commits());

    assert_eq!(tracker.cancel(), Err(TrackerFault::StoreWriteFailed));
    assert_eq!(tracker.persistence(), Persistence::MemoryFallback);
    assert!(!tracker.is_waiting());

    // Once in memory, later clears succeed without touching the store.
    assert_eq!(tracker.cancel(), Ok(()));
}

#[test]
fn poll_after_write_fault_still_closes_the_window() {
    let mut store = MemoryStore::new(RECORD_BEGIN);
    let mut tracker = ResetCycleTracker::new(3, TIMEOUT, &mut store);
    assert!(!tracker.detect());
    drop(tracker);

    let mut faulty = store.clone().failing_commits();
    let mut tracker = ResetCycleTracker::new(3, TIMEOUT, &mut faulty);
    assert!(!tracker.detect());
    assert_eq!(tracker.last_fault(), Some(TrackerFault::StoreWriteFailed));
    assert_eq!(tracker.poll(TIMEOUT), Ok(true));
    assert!(!tracker.is_waiting());
    assert_eq!(tracker.poll(TIMEOUT * 2), Ok(false));
}

#[test]
fn corruption_self_heals_and_is_logged() {
    let mut tracker = tracker(MemoryStore::new(0xFFFF_FFFF));

    assert!(!tracker.detect());
    assert_eq!(
        tracker.last_fault(),
        Some(TrackerFault::RecordCorrupt { raw: 0xFFFF_FFFF })
    );
    assert_eq!(tracker.persistence(), Persistence::Persistent);
    assert_eq!(tracker.store().committed(), RECORD_BEGIN);

    let events: Vec<TrackerEvent> = tracker.events().oldest_first().map(|r| r.event).collect();
    assert_eq!(
        events,
        [
            TrackerEvent::RecordRead { raw: 0xFFFF_FFFF },
            TrackerEvent::Fault(TrackerFault::RecordCorrupt { raw: 0xFFFF_FFFF }),
            TrackerEvent::Armed { count: 1 },
        ]
    );
}
