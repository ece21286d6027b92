//! Diagnostics events emitted by the reset tracker.
//!
//! Every state change the tracker makes is appended to a fixed-capacity ring
//! so firmware and host tools can inspect what happened during boot without
//! a console attached. With the `defmt` feature enabled each event is also
//! logged as it is recorded.

use core::fmt;

use heapless::{HistoryBuf, OldestOrdered};

use crate::tracker::TrackerFault;

/// Number of events retained before the oldest is evicted.
pub const EVENT_LOG_CAPACITY: usize = 16;

/// Identifier assigned to each recorded event.
pub type EventId = u32;

/// What the tracker did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackerEvent {
    /// Raw word read from storage at boot.
    RecordRead { raw: u32 },
    /// Threshold reached; the cycle was cleared.
    Detected { count: u16 },
    /// Counter advanced and the waiting window armed.
    Armed { count: u16 },
    /// Window elapsed without a further reset.
    WindowClosed,
    /// Window closed on request.
    Cancelled,
    /// Storage or integrity fault.
    Fault(TrackerFault),
}

impl fmt::Display for TrackerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerEvent::RecordRead { raw } => write!(f, "record-read 0x{raw:08X}"),
            TrackerEvent::Detected { count } => write!(f, "multi-reset-detected count={count}"),
            TrackerEvent::Armed { count } => write!(f, "window-armed count={count}"),
            TrackerEvent::WindowClosed => f.write_str("window-closed"),
            TrackerEvent::Cancelled => f.write_str("window-cancelled"),
            TrackerEvent::Fault(fault) => write!(f, "fault {fault}"),
        }
    }
}

/// Event stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EventRecord {
    pub id: EventId,
    pub event: TrackerEvent,
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {}", self.id, self.event)
    }
}

/// Ring of the most recent tracker events.
pub struct EventLog<const CAPACITY: usize = EVENT_LOG_CAPACITY> {
    ring: HistoryBuf<EventRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> EventLog<CAPACITY> {
    /// Creates an empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Returns the retained events in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, EventRecord> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent event, if any.
    #[must_use]
    pub fn latest(&self) -> Option<&EventRecord> {
        self.ring.recent()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Total number of events recorded, including evicted ones.
    #[must_use]
    pub const fn total(&self) -> EventId {
        self.next_event_id
    }

    /// Appends an event, evicting the oldest when full.
    pub fn record(&mut self, event: TrackerEvent) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        let record = EventRecord { id, event };
        emit(&record);
        self.ring.write(record);
        id
    }
}

impl<const CAPACITY: usize> Default for EventLog<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "defmt")]
fn emit(record: &EventRecord) {
    match record.event {
        TrackerEvent::Fault(fault) => defmt::warn!("mrd #{}: {}", record.id, fault),
        TrackerEvent::Detected { count } => {
            defmt::info!("mrd #{}: multi-reset detected (count={})", record.id, count);
        }
        event => defmt::debug!("mrd #{}: {}", record.id, event),
    }
}

#[cfg(not(feature = "defmt"))]
fn emit(_: &EventRecord) {}
