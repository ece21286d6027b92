//! Reserved flash page backing the record journal.

use defmt::warn;
use detector_core::StoreError;
use detector_core::store::{PageFlash, SLOT_SIZE};
use embassy_stm32::flash::{Blocking, Flash, MAX_ERASE_SIZE};

/// One erase page of on-chip flash, addressed relative to `base`.
///
/// STM32G0 programs in 64-bit double words, which matches the journal slot.
pub struct RecordPage {
    flash: Flash<'static, Blocking>,
    base: u32,
}

impl RecordPage {
    pub fn new(flash: Flash<'static, Blocking>, base: u32) -> Self {
        Self { flash, base }
    }

    fn address(&self, offset: usize) -> Result<u32, StoreError> {
        u32::try_from(offset)
            .ok()
            .and_then(|offset| self.base.checked_add(offset))
            .ok_or(StoreError::Read)
    }
}

impl PageFlash for RecordPage {
    const PAGE_SIZE: usize = MAX_ERASE_SIZE;

    fn read(&mut self, offset: usize, buf: &mut [u8; SLOT_SIZE]) -> Result<(), StoreError> {
        let address = self.address(offset)?;
        self.flash.blocking_read(address, buf).map_err(|err| {
            warn!("record page read at {=u32:#x} failed: {}", address, defmt::Debug2Format(&err));
            StoreError::Read
        })
    }

    fn program(&mut self, offset: usize, data: &[u8; SLOT_SIZE]) -> Result<(), StoreError> {
        let address = self.address(offset).map_err(|_| StoreError::Write)?;
        self.flash.blocking_write(address, data).map_err(|err| {
            warn!("record page program at {=u32:#x} failed: {}", address, defmt::Debug2Format(&err));
            StoreError::Write
        })
    }

    fn erase(&mut self) -> Result<(), StoreError> {
        let end = self.address(Self::PAGE_SIZE).map_err(|_| StoreError::Write)?;
        self.flash.blocking_erase(self.base, end).map_err(|err| {
            warn!("record page erase at {=u32:#x} failed: {}", self.base, defmt::Debug2Format(&err));
            StoreError::Write
        })
    }
}
