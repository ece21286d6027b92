//! Persisted reset record and its 32-bit wire encoding.
//!
//! The record packs a reset counter into the low half of a word and an
//! integrity check into the high half. The check is the bitwise complement of
//! the counter, so erased or uninitialized storage (all zeros, all ones) never
//! decodes as a valid record.

use core::fmt;

/// Word written whenever a detection cycle is explicitly reset.
///
/// Decodes to counter 1 with check `0xFFFE`: the boot that cleared the cycle
/// is the first one observed.
pub const RECORD_BEGIN: u32 = 0xFFFE_0001;

/// Placeholder word used after corruption until a fresh record is derived.
///
/// Stores report never-written media with this word. It carries no prior
/// cycle, so reading it back is not treated as corruption.
pub const RECORD_CLEAR: u32 = 0x0000_0000;

/// All-ones word left by erased flash. Backends return it for a record they
/// found damaged (torn slot, short file); it never passes the check.
pub const RECORD_ERASED: u32 = 0xFFFF_FFFF;

/// Highest counter value an increment may produce.
///
/// `0xFFFF` is left unused so a runaway counter never lands on the all-ones
/// half-word that erased storage produces.
pub const MAX_COUNT: u16 = 0xFFFE;

/// Size of the encoded record in bytes.
pub const RECORD_SIZE: usize = 4;

const COUNT_MASK: u32 = 0x0000_FFFF;
const CHECK_SHIFT: u32 = 16;

/// Decoded view of the persisted reset word.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResetRecord {
    /// Consecutive resets observed within the current cycle.
    pub count: u16,
    /// Integrity half-word stored alongside the counter.
    pub check: u16,
}

impl ResetRecord {
    /// Record written at the start of every cycle.
    pub const BEGIN: Self = Self::from_word(RECORD_BEGIN);
    /// Invalid placeholder record.
    pub const CLEAR: Self = Self::from_word(RECORD_CLEAR);

    /// Builds a valid record carrying `count`.
    #[must_use]
    pub const fn with_count(count: u16) -> Self {
        Self {
            count,
            check: check_for(count),
        }
    }

    /// Splits a raw storage word into counter and check halves.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub const fn from_word(word: u32) -> Self {
        Self {
            count: (word & COUNT_MASK) as u16,
            check: (word >> CHECK_SHIFT) as u16,
        }
    }

    /// Packs the record into its storage word.
    #[must_use]
    pub const fn to_word(self) -> u32 {
        ((self.check as u32) << CHECK_SHIFT) | self.count as u32
    }

    /// Returns `true` when the check half matches the counter.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.check == check_for(self.count)
    }

    /// Returns the next record in the cycle, saturating at [`MAX_COUNT`].
    #[must_use]
    pub const fn incremented(self) -> Self {
        let next = if self.count >= MAX_COUNT {
            MAX_COUNT
        } else {
            self.count + 1
        };
        Self::with_count(next)
    }

    /// Little-endian byte image used by byte-addressed backends.
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; RECORD_SIZE] {
        self.to_word().to_le_bytes()
    }

    /// Decodes a little-endian byte image.
    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; RECORD_SIZE]) -> Self {
        Self::from_word(u32::from_le_bytes(bytes))
    }
}

impl From<u32> for ResetRecord {
    fn from(word: u32) -> Self {
        Self::from_word(word)
    }
}

impl From<ResetRecord> for u32 {
    fn from(record: ResetRecord) -> Self {
        record.to_word()
    }
}

impl fmt::Display for ResetRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "0x{:08X} (count={} check=0x{:04X} {})",
            self.to_word(),
            self.count,
            self.check,
            if self.is_valid() { "valid" } else { "corrupt" }
        )
    }
}

/// Inverted check half for `count`.
#[must_use]
pub const fn check_for(count: u16) -> u16 {
    !count
}
