#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Shared detector status for the firmware target.
//!
//! The boot path publishes the tracker state into lightweight atomics so the
//! application can ask whether it should enter configuration mode without
//! holding the tracker itself.

use detector_core::{Persistence, TrackerStatus};
use portable_atomic::{AtomicBool, AtomicU8, AtomicU16, Ordering};

/// Set once per boot when the threshold was reached.
static DETECTED: AtomicBool = AtomicBool::new(false);
/// True while the detection window is open.
static WAITING: AtomicBool = AtomicBool::new(false);
/// Counter value of the in-memory record.
static COUNT: AtomicU16 = AtomicU16::new(0);
/// Code of the most recent fault (0 == none).
static FAULT: AtomicU8 = AtomicU8::new(0);
/// Encoded [`Persistence`] mode.
static PERSISTENCE: AtomicU8 = AtomicU8::new(0);

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusSnapshot {
    pub detected: bool,
    pub waiting: bool,
    pub count: u16,
    pub fault_code: u8,
    pub persistence: Persistence,
}

fn encode_persistence(persistence: Persistence) -> u8 {
    match persistence {
        Persistence::Persistent => 0,
        Persistence::MemoryFallback => 1,
        Persistence::Unavailable => 2,
    }
}

fn decode_persistence(raw: u8) -> Persistence {
    match raw {
        0 => Persistence::Persistent,
        1 => Persistence::MemoryFallback,
        _ => Persistence::Unavailable,
    }
}

/// Stores the latest tracker status.
pub fn publish(status: &TrackerStatus) {
    DETECTED.store(status.detected, Ordering::Relaxed);
    WAITING.store(status.waiting, Ordering::Relaxed);
    COUNT.store(status.record.count, Ordering::Relaxed);
    FAULT.store(status.last_fault.map_or(0, |fault| fault.code()), Ordering::Relaxed);
    PERSISTENCE.store(encode_persistence(status.persistence), Ordering::Relaxed);
}

/// Returns `true` when this boot was a multi-reset.
pub fn multi_reset_detected() -> bool {
    DETECTED.load(Ordering::Relaxed)
}

pub fn snapshot() -> StatusSnapshot {
    StatusSnapshot {
        detected: DETECTED.load(Ordering::Relaxed),
        waiting: WAITING.load(Ordering::Relaxed),
        count: COUNT.load(Ordering::Relaxed),
        fault_code: FAULT.load(Ordering::Relaxed),
        persistence: decode_persistence(PERSISTENCE.load(Ordering::Relaxed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use detector_core::{ResetRecord, TrackerFault};

    #[test]
    fn published_status_round_trips_through_the_atomics() {
        publish(&TrackerStatus {
            detected: false,
            waiting: true,
            record: ResetRecord::with_count(2),
            persistence: Persistence::MemoryFallback,
            last_fault: Some(TrackerFault::StoreWriteFailed),
        });

        let snapshot = snapshot();
        assert!(!multi_reset_detected());
        assert!(snapshot.waiting);
        assert_eq!(snapshot.count, 2);
        assert_eq!(snapshot.fault_code, TrackerFault::StoreWriteFailed.code());
        assert_eq!(snapshot.persistence, Persistence::MemoryFallback);
    }
}
