//! Persistent storage seam consumed by the reset tracker.
//!
//! The tracker never touches a medium directly. Board crates and host tools
//! implement [`PersistentStore`] for whatever keeps the record across a reset
//! (emulated EEPROM in flash, a file, retention RAM) and hand it over at
//! construction time. [`MemoryStore`] is the RAM-only implementation used by
//! tests and host tooling.

use core::fmt;

use crate::record::RECORD_CLEAR;

pub mod journal;

pub use journal::{MemoryPage, PageFlash, SLOT_SEAL, SLOT_SIZE, SlotJournal};

/// Failure reported by a storage backend.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StoreError {
    /// The medium never initialized.
    Unavailable,
    /// The record could not be read back.
    Read,
    /// Writing or committing the record failed.
    Write,
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable => f.write_str("storage unavailable"),
            StoreError::Read => f.write_str("storage read failed"),
            StoreError::Write => f.write_str("storage write failed"),
        }
    }
}

/// Fixed-location storage for the 4-byte reset record.
pub trait PersistentStore {
    /// Returns `true` when the backing medium initialized successfully.
    fn ready(&self) -> bool;

    /// Reads the record word.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] when the medium cannot be read, or
    /// [`StoreError::Unavailable`] when it never initialized.
    fn read(&mut self) -> Result<u32, StoreError>;

    /// Replaces the record word. The value need not be durable until
    /// [`commit`](Self::commit) returns.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] when the value cannot be staged.
    fn write(&mut self, value: u32) -> Result<(), StoreError>;

    /// Makes the last write survive a reset.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] when the medium rejects the update.
    fn commit(&mut self) -> Result<(), StoreError>;
}

impl<S> PersistentStore for &mut S
where
    S: PersistentStore + ?Sized,
{
    fn ready(&self) -> bool {
        (**self).ready()
    }

    fn read(&mut self) -> Result<u32, StoreError> {
        (**self).read()
    }

    fn write(&mut self, value: u32) -> Result<(), StoreError> {
        (**self).write(value)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        (**self).commit()
    }
}

/// RAM-backed store with optional fault injection.
///
/// Reads return the most recent write, committed or not, matching emulated
/// EEPROM where the RAM cache is visible before `commit`. Use
/// [`drop_uncommitted`](Self::drop_uncommitted) to model a reset that loses
/// staged data.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryStore {
    committed: u32,
    staged: Option<u32>,
    ready: bool,
    fail_reads: bool,
    fail_writes: bool,
    fail_commits: bool,
    commits: usize,
}

impl MemoryStore {
    /// Creates a store already holding `word`.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self {
            committed: word,
            staged: None,
            ready: true,
            fail_reads: false,
            fail_writes: false,
            fail_commits: false,
            commits: 0,
        }
    }

    /// Creates a store that has never been written.
    #[must_use]
    pub const fn blank() -> Self {
        Self::new(RECORD_CLEAR)
    }

    /// Creates a store whose medium failed to initialize.
    #[must_use]
    pub const fn unavailable() -> Self {
        let mut store = Self::blank();
        store.ready = false;
        store
    }

    #[must_use]
    pub const fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    #[must_use]
    pub const fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    #[must_use]
    pub const fn failing_commits(mut self) -> Self {
        self.fail_commits = true;
        self
    }

    /// Word that would survive a reset right now.
    #[must_use]
    pub const fn committed(&self) -> u32 {
        self.committed
    }

    /// Number of successful commits.
    #[must_use]
    pub const fn commit_count(&self) -> usize {
        self.commits
    }

    /// Overwrites the durable word, bypassing the failure switches.
    pub fn set_committed(&mut self, word: u32) {
        self.committed = word;
        self.staged = None;
    }

    /// Discards a staged write, as a reset before `commit` would.
    pub fn drop_uncommitted(&mut self) {
        self.staged = None;
    }

    /// Clears every injected failure.
    pub fn heal(&mut self) {
        self.fail_reads = false;
        self.fail_writes = false;
        self.fail_commits = false;
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::blank()
    }
}

impl PersistentStore for MemoryStore {
    fn ready(&self) -> bool {
        self.ready
    }

    fn read(&mut self) -> Result<u32, StoreError> {
        if !self.ready {
            return Err(StoreError::Unavailable);
        }
        if self.fail_reads {
            return Err(StoreError::Read);
        }
        Ok(self.staged.unwrap_or(self.committed))
    }

    fn write(&mut self, value: u32) -> Result<(), StoreError> {
        if !self.ready {
            return Err(StoreError::Unavailable);
        }
        if self.fail_writes {
            return Err(StoreError::Write);
        }
        self.staged = Some(value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.ready {
            return Err(StoreError::Unavailable);
        }
        if self.fail_commits {
            return Err(StoreError::Write);
        }
        if let Some(value) = self.staged.take() {
            self.committed = value;
        }
        self.commits += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RECORD_BEGIN;

    #[test]
    fn writes_are_visible_before_commit_but_not_durable() {
        let mut store = MemoryStore::blank();
        store.write(RECORD_BEGIN).unwrap();
        assert_eq!(store.read(), Ok(RECORD_BEGIN));
        assert_eq!(store.committed(), RECORD_CLEAR);

        store.drop_uncommitted();
        assert_eq!(store.read(), Ok(RECORD_CLEAR));
    }

    #[test]
    fn commit_makes_the_write_durable() {
        let mut store = MemoryStore::blank();
        store.write(RECORD_BEGIN).unwrap();
        store.commit().unwrap();
        store.drop_uncommitted();
        assert_eq!(store.committed(), RECORD_BEGIN);
        assert_eq!(store.commit_count(), 1);
    }

    #[test]
    fn injected_failures_map_to_store_errors() {
        let mut store = MemoryStore::blank().failing_reads().failing_commits();
        assert_eq!(store.read(), Err(StoreError::Read));
        assert_eq!(store.write(1), Ok(()));
        assert_eq!(store.commit(), Err(StoreError::Write));

        store.heal();
        assert_eq!(store.commit(), Ok(()));
        assert_eq!(store.committed(), 1);
    }

    #[test]
    fn unavailable_store_rejects_everything() {
        let mut store = MemoryStore::unavailable();
        assert!(!store.ready());
        assert_eq!(store.read(), Err(StoreError::Unavailable));
        assert_eq!(store.write(1), Err(StoreError::Unavailable));
        assert_eq!(store.commit(), Err(StoreError::Unavailable));
    }

    #[test]
    fn mutable_references_forward_to_the_store() {
        let mut store = MemoryStore::new(RECORD_BEGIN);
        {
            let mut borrowed = &mut store;
            assert_eq!(PersistentStore::read(&mut borrowed), Ok(RECORD_BEGIN));
            borrowed.write(7).unwrap();
            PersistentStore::commit(&mut borrowed).unwrap();
        }
        assert_eq!(store.committed(), 7);
    }
}
