//! Reset-cycle state machine.
//!
//! [`ResetCycleTracker`] interprets the persisted reset record once at boot,
//! decides whether the user reset the device enough times inside the waiting
//! window, and clears the record once the window elapses. Time is supplied by
//! the caller as the duration since [`detect`](ResetCycleTracker::detect)
//! returned, so the tracker never reads a clock.
//!
//! Storage faults never escalate. The tracker switches to an in-memory copy
//! of the record for the rest of the process and reports the fault through
//! [`ResetCycleTracker::status`]; the worst outcome is that a multi-reset goes
//! undetected.

use core::{fmt, time::Duration};

use crate::config::DetectorConfig;
use crate::record::{RECORD_BEGIN, RECORD_CLEAR, ResetRecord};
use crate::store::{PersistentStore, StoreError};
use crate::telemetry::{EventLog, TrackerEvent};

/// Diagnostic fault observed by the tracker.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TrackerFault {
    /// The medium never initialized; detection is disabled.
    StoreUnavailable,
    /// The record could not be read; treated as absent.
    StoreReadFailed,
    /// Writing or committing the record failed.
    StoreWriteFailed,
    /// The record failed its integrity check and was reset.
    RecordCorrupt { raw: u32 },
}

impl TrackerFault {
    const UNAVAILABLE_CODE: u8 = 1;
    const READ_FAILED_CODE: u8 = 2;
    const WRITE_FAILED_CODE: u8 = 3;
    const CORRUPT_CODE: u8 = 4;

    /// Compact non-zero code for status registers; the raw word is dropped.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            TrackerFault::StoreUnavailable => Self::UNAVAILABLE_CODE,
            TrackerFault::StoreReadFailed => Self::READ_FAILED_CODE,
            TrackerFault::StoreWriteFailed => Self::WRITE_FAILED_CODE,
            TrackerFault::RecordCorrupt { .. } => Self::CORRUPT_CODE,
        }
    }

    /// Returns `true` for faults that stop the record from being persisted.
    #[must_use]
    pub const fn is_storage_fault(self) -> bool {
        !matches!(self, TrackerFault::RecordCorrupt { .. })
    }

    const fn from_read(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => TrackerFault::StoreUnavailable,
            StoreError::Read | StoreError::Write => TrackerFault::StoreReadFailed,
        }
    }

    const fn from_write(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => TrackerFault::StoreUnavailable,
            StoreError::Read | StoreError::Write => TrackerFault::StoreWriteFailed,
        }
    }
}

impl fmt::Display for TrackerFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerFault::StoreUnavailable => f.write_str("store-unavailable"),
            TrackerFault::StoreReadFailed => f.write_str("store-read-failed"),
            TrackerFault::StoreWriteFailed => f.write_str("store-write-failed"),
            TrackerFault::RecordCorrupt { raw } => write!(f, "record-corrupt raw=0x{raw:08X}"),
        }
    }
}

/// Where the tracker keeps the record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Persistence {
    /// Reads and writes reach the store.
    Persistent,
    /// An I/O fault occurred; the record lives in RAM until the next boot.
    MemoryFallback,
    /// The store never initialized; detection always reports `false`.
    Unavailable,
}

impl fmt::Display for Persistence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Persistence::Persistent => f.write_str("persistent"),
            Persistence::MemoryFallback => f.write_str("memory-fallback"),
            Persistence::Unavailable => f.write_str("unavailable"),
        }
    }
}

/// Point-in-time view of the tracker.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TrackerStatus {
    pub detected: bool,
    pub waiting: bool,
    pub record: ResetRecord,
    pub persistence: Persistence,
    pub last_fault: Option<TrackerFault>,
}

impl fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "detected={} waiting={} record={} storage={}",
            self.detected, self.waiting, self.record, self.persistence
        )?;
        match self.last_fault {
            Some(fault) => write!(f, " fault={fault}"),
            None => f.write_str(" fault=none"),
        }
    }
}

/// Counts resets across boots and reports when the threshold is reached.
pub struct ResetCycleTracker<S> {
    config: DetectorConfig,
    store: S,
    persistence: Persistence,
    mirror: Option<u32>,
    waiting: bool,
    detected: bool,
    last_fault: Option<TrackerFault>,
    events: EventLog,
}

impl<S> ResetCycleTracker<S>
where
    S: PersistentStore,
{
    /// Creates a tracker requiring `threshold` resets within `timeout`.
    pub fn new(threshold: u16, timeout: Duration, store: S) -> Self {
        Self::from_config(DetectorConfig::new(threshold, timeout), store)
    }

    /// Creates a tracker from a prepared configuration.
    ///
    /// Only [`PersistentStore::ready`] is consulted here; the record is not
    /// read until [`detect`](Self::detect).
    pub fn from_config(config: DetectorConfig, store: S) -> Self {
        let mut tracker = Self {
            config,
            store,
            persistence: Persistence::Persistent,
            mirror: None,
            waiting: false,
            detected: false,
            last_fault: None,
            events: EventLog::new(),
        };

        if !tracker.store.ready() {
            tracker.persistence = Persistence::Unavailable;
            tracker.note_fault(TrackerFault::StoreUnavailable);
        }

        tracker
    }

    /// Interprets the persisted record; call once at boot.
    ///
    /// Returns `true` when the threshold was reached, in which case the cycle
    /// is cleared. Otherwise the counter advances and the waiting window is
    /// armed. Storage faults are recorded, not returned; check
    /// [`status`](Self::status) to tell "no multi-reset" from "could not
    /// persist".
    pub fn detect(&mut self) -> bool {
        let record = match self.load() {
            // Never-written media: no prior cycle to continue, nothing corrupt.
            None | Some(RECORD_CLEAR) => ResetRecord::from_word(RECORD_CLEAR),
            Some(raw) => {
                let record = ResetRecord::from_word(raw);
                if record.is_valid() {
                    record
                } else {
                    self.note_fault(TrackerFault::RecordCorrupt { raw });
                    ResetRecord::from_word(RECORD_CLEAR)
                }
            }
        };

        let triggered = record.is_valid()
            && record.count >= self.config.threshold
            && self.persistence != Persistence::Unavailable;

        if triggered {
            self.detected = true;
            self.waiting = false;
            self.events.record(TrackerEvent::Detected {
                count: record.count,
            });
            // Persist faults land in `last_fault`; detection still stands.
            self.persist(RECORD_BEGIN).ok();
        } else {
            let next = record.incremented();
            self.detected = false;
            self.waiting = true;
            self.events.record(TrackerEvent::Armed { count: next.count });
            self.persist(next.to_word()).ok();
        }

        self.detected
    }

    /// Closes the waiting window once `elapsed_since_detect` reaches the timeout.
    ///
    /// Returns `Ok(true)` on the call that closed the window; every other call
    /// is a no-op returning `Ok(false)`.
    ///
    /// # Errors
    ///
    /// Returns the storage fault when clearing the record could not be
    /// persisted. The window is closed regardless.
    pub fn poll(&mut self, elapsed_since_detect: Duration) -> Result<bool, TrackerFault> {
        if !self.waiting || elapsed_since_detect < self.config.timeout {
            return Ok(false);
        }

        self.waiting = false;
        self.events.record(TrackerEvent::WindowClosed);
        self.persist(RECORD_BEGIN)?;
        Ok(true)
    }

    /// Ends the current cycle immediately, whether or not a window is armed.
    ///
    /// # Errors
    ///
    /// Returns the storage fault when the cleared record could not be
    /// persisted.
    pub fn cancel(&mut self) -> Result<(), TrackerFault> {
        self.waiting = false;
        self.events.record(TrackerEvent::Cancelled);
        self.persist(RECORD_BEGIN)
    }

    /// Result of the last [`detect`](Self::detect) call.
    pub const fn detected(&self) -> bool {
        self.detected
    }

    /// Returns `true` while a waiting window is armed.
    pub const fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// Record as last read or written; `CLEAR` before the first access.
    pub fn record(&self) -> ResetRecord {
        ResetRecord::from_word(self.mirror.unwrap_or(RECORD_CLEAR))
    }

    /// Where the record currently lives.
    pub const fn persistence(&self) -> Persistence {
        self.persistence
    }

    /// Most recent storage or corruption fault, if any.
    pub const fn last_fault(&self) -> Option<TrackerFault> {
        self.last_fault
    }

    /// Snapshot of the detection state and fault information.
    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            detected: self.detected,
            waiting: self.waiting,
            record: self.record(),
            persistence: self.persistence,
            last_fault: self.last_fault,
        }
    }

    /// Configuration fixed at construction.
    pub const fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Diagnostics recorded since construction.
    pub const fn events(&self) -> &EventLog {
        &self.events
    }

    /// Borrows the storage backend.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Releases the storage backend.
    pub fn into_store(self) -> S {
        self.store
    }

    fn load(&mut self) -> Option<u32> {
        if self.persistence != Persistence::Persistent {
            return self.mirror;
        }

        match self.store.read() {
            Ok(raw) => {
                self.events.record(TrackerEvent::RecordRead { raw });
                self.mirror = Some(raw);
                Some(raw)
            }
            Err(err) => {
                self.fall_back(TrackerFault::from_read(err));
                None
            }
        }
    }

    fn persist(&mut self, word: u32) -> Result<(), TrackerFault> {
        self.mirror = Some(word);
        if self.persistence != Persistence::Persistent {
            return Ok(());
        }

        let result = self.store.write(word).and_then(|()| self.store.commit());
        result.map_err(|err| {
            let fault = TrackerFault::from_write(err);
            self.fall_back(fault);
            fault
        })
    }

    fn fall_back(&mut self, fault: TrackerFault) {
        self.note_fault(fault);
        if self.persistence == Persistence::Persistent {
            self.persistence = Persistence::MemoryFallback;
        }
    }

    fn note_fault(&mut self, fault: TrackerFault) {
        self.last_fault = Some(fault);
        self.events.record(TrackerEvent::Fault(fault));
    }
}
