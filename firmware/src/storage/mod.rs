#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Record storage backends available on the board.

#[cfg(target_os = "none")]
pub mod flash;
pub mod retained;

use detector_core::{PersistentStore, StoreError};
#[cfg(target_os = "none")]
use detector_core::store::SlotJournal;

use retained::RetainedWord;

/// Backend chosen at boot from [`crate::config::BACKEND`].
pub enum BoardStore<'a> {
    #[cfg(target_os = "none")]
    Flash(SlotJournal<flash::RecordPage>),
    Retained(RetainedWord<'a>),
}

impl PersistentStore for BoardStore<'_> {
    fn ready(&self) -> bool {
        match self {
            #[cfg(target_os = "none")]
            BoardStore::Flash(journal) => journal.ready(),
            BoardStore::Retained(word) => word.ready(),
        }
    }

    fn read(&mut self) -> Result<u32, StoreError> {
        match self {
            #[cfg(target_os = "none")]
            BoardStore::Flash(journal) => journal.read(),
            BoardStore::Retained(word) => word.read(),
        }
    }

    fn write(&mut self, value: u32) -> Result<(), StoreError> {
        match self {
            #[cfg(target_os = "none")]
            BoardStore::Flash(journal) => journal.write(value),
            BoardStore::Retained(word) => word.write(value),
        }
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        match self {
            #[cfg(target_os = "none")]
            BoardStore::Flash(journal) => journal.commit(),
            BoardStore::Retained(word) => word.commit(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::time::Duration;
    use detector_core::{RECORD_BEGIN, ResetCycleTracker};

    fn boot(cell: &mut u32) -> bool {
        let store = BoardStore::Retained(RetainedWord::over(cell));
        ResetCycleTracker::new(3, Duration::from_secs(10), store).detect()
    }

    #[test]
    fn retained_backend_detects_rapid_warm_resets() {
        // Power-on RAM contents are arbitrary.
        let mut cell = 0xDEAD_BEEF;
        let results: Vec<bool> = (0..4).map(|_| boot(&mut cell)).collect();

        assert_eq!(results, [false, false, false, true]);
        assert_eq!(cell, RECORD_BEGIN);
    }
}
