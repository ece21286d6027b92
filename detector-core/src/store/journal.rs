//! EEPROM emulation for the reset record on a single erasable flash page.
//!
//! Rewriting one word in place would cost a page erase per update. The
//! journal instead appends each committed word to the next free 8-byte slot
//! and only erases once the page is full. Each slot holds the record word
//! followed by [`SLOT_SEAL`], both little-endian; a slot whose bytes are all
//! `0xFF` is free. A slot that is neither free nor sealed was torn by a reset
//! during programming and reads back as [`RECORD_ERASED`], which never passes
//! the record check. A page with no used slot reads as [`RECORD_CLEAR`].

use crate::record::{RECORD_CLEAR, RECORD_ERASED};

use super::{PersistentStore, StoreError};

/// Bytes occupied by one journal entry (record word + seal).
pub const SLOT_SIZE: usize = 8;
/// Marker programmed after the record word once the slot is complete.
pub const SLOT_SEAL: u32 = 0x4D52_4431;

const ERASED: u8 = 0xFF;

/// One erasable page of NOR flash reserved for the journal.
///
/// Offsets are relative to the start of the page and always slot aligned.
pub trait PageFlash {
    /// Size of the erase unit in bytes.
    const PAGE_SIZE: usize;

    /// Reads one slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] when the flash controller reports a fault.
    fn read(&mut self, offset: usize, buf: &mut [u8; SLOT_SIZE]) -> Result<(), StoreError>;

    /// Programs one previously erased slot.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] when programming fails.
    fn program(&mut self, offset: usize, data: &[u8; SLOT_SIZE]) -> Result<(), StoreError>;

    /// Erases the whole page back to `0xFF`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] when the erase fails.
    fn erase(&mut self) -> Result<(), StoreError>;
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct Cursor {
    next_free: usize,
    stored: Option<u32>,
}

/// [`PersistentStore`] that journals the record across a flash page.
pub struct SlotJournal<F> {
    flash: F,
    cursor: Option<Cursor>,
    staged: Option<u32>,
}

impl<F> SlotJournal<F>
where
    F: PageFlash,
{
    /// Number of slots that fit in one page.
    pub const SLOTS: usize = F::PAGE_SIZE / SLOT_SIZE;

    /// Wraps `flash`; the page is scanned lazily on first access.
    pub const fn new(flash: F) -> Self {
        Self {
            flash,
            cursor: None,
            staged: None,
        }
    }

    /// Index of the slot the next commit will program.
    ///
    /// # Errors
    ///
    /// Propagates read failures from the page scan.
    pub fn next_free_slot(&mut self) -> Result<usize, StoreError> {
        Ok(self.cursor()?.next_free)
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }

    pub fn into_inner(self) -> F {
        self.flash
    }

    fn cursor(&mut self) -> Result<Cursor, StoreError> {
        if let Some(cursor) = self.cursor {
            return Ok(cursor);
        }

        let mut cursor = Cursor {
            next_free: Self::SLOTS,
            stored: None,
        };
        let mut slot = [0u8; SLOT_SIZE];
        for index in 0..Self::SLOTS {
            self.flash.read(index * SLOT_SIZE, &mut slot)?;
            if slot.iter().all(|byte| *byte == ERASED) {
                cursor.next_free = index;
                break;
            }
            cursor.stored = Some(decode_slot(&slot));
        }

        self.cursor = Some(cursor);
        Ok(cursor)
    }

    fn append(&mut self, word: u32) -> Result<(), StoreError> {
        let mut cursor = self.cursor()?;
        if cursor.stored == Some(word) {
            return Ok(());
        }

        if cursor.next_free >= Self::SLOTS {
            self.flash.erase()?;
            cursor.next_free = 0;
        }

        self.flash
            .program(cursor.next_free * SLOT_SIZE, &encode_slot(word))?;
        self.cursor = Some(Cursor {
            next_free: cursor.next_free + 1,
            stored: Some(word),
        });
        Ok(())
    }
}

impl<F> PersistentStore for SlotJournal<F>
where
    F: PageFlash,
{
    fn ready(&self) -> bool {
        Self::SLOTS > 0
    }

    fn read(&mut self) -> Result<u32, StoreError> {
        if let Some(word) = self.staged {
            return Ok(word);
        }
        Ok(self.cursor()?.stored.unwrap_or(RECORD_CLEAR))
    }

    fn write(&mut self, value: u32) -> Result<(), StoreError> {
        self.staged = Some(value);
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let Some(word) = self.staged else {
            return Ok(());
        };

        match self.append(word) {
            Ok(()) => {
                self.staged = None;
                Ok(())
            }
            Err(err) => {
                // Force a rescan; the page state is unknown after a failed erase/program.
                self.cursor = None;
                Err(err)
            }
        }
    }
}

fn encode_slot(word: u32) -> [u8; SLOT_SIZE] {
    let mut slot = [0u8; SLOT_SIZE];
    slot[..4].copy_from_slice(&word.to_le_bytes());
    slot[4..].copy_from_slice(&SLOT_SEAL.to_le_bytes());
    slot
}

fn decode_slot(slot: &[u8; SLOT_SIZE]) -> u32 {
    let word = u32::from_le_bytes([slot[0], slot[1], slot[2], slot[3]]);
    let seal = u32::from_le_bytes([slot[4], slot[5], slot[6], slot[7]]);
    if seal == SLOT_SEAL { word } else { RECORD_ERASED }
}

/// RAM model of a NOR flash page.
///
/// Programming can only clear bits, as on real flash, so writing a slot that
/// was not erased leaves the AND of old and new contents.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryPage<const N: usize> {
    bytes: [u8; N],
    erases: usize,
    programs: usize,
    fail_program: bool,
}

impl<const N: usize> MemoryPage<N> {
    /// Creates an erased page.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bytes: [ERASED; N],
            erases: 0,
            programs: 0,
            fail_program: false,
        }
    }

    /// Makes every subsequent program call fail.
    #[must_use]
    pub const fn failing_program(mut self) -> Self {
        self.fail_program = true;
        self
    }

    #[must_use]
    pub const fn erase_count(&self) -> usize {
        self.erases
    }

    #[must_use]
    pub const fn program_count(&self) -> usize {
        self.programs
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Overwrites raw bytes, for staging torn or foreign page contents.
    pub fn poke(&mut self, offset: usize, data: &[u8]) {
        self.bytes[offset..offset + data.len()].copy_from_slice(data);
    }
}

impl<const N: usize> Default for MemoryPage<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> PageFlash for MemoryPage<N> {
    const PAGE_SIZE: usize = N;

    fn read(&mut self, offset: usize, buf: &mut [u8; SLOT_SIZE]) -> Result<(), StoreError> {
        let slot = self
            .bytes
            .get(offset..offset + SLOT_SIZE)
            .ok_or(StoreError::Read)?;
        buf.copy_from_slice(slot);
        Ok(())
    }

    fn program(&mut self, offset: usize, data: &[u8; SLOT_SIZE]) -> Result<(), StoreError> {
        if self.fail_program {
            return Err(StoreError::Write);
        }
        let slot = self
            .bytes
            .get_mut(offset..offset + SLOT_SIZE)
            .ok_or(StoreError::Write)?;
        for (cell, value) in slot.iter_mut().zip(data) {
            *cell &= *value;
        }
        self.programs += 1;
        Ok(())
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        self.bytes = [ERASED; N];
        self.erases += 1;
        Ok(())
    }
}
