use core::marker::PhantomData;
use core::mem::MaybeUninit;
use core::ptr::NonNull;

use detector_core::{PersistentStore, StoreError};

// The startup code zeroes `.bss` but leaves `.uninit` alone, so this word
// keeps its value across a warm reset. Power-on contents are arbitrary.
#[cfg_attr(target_os = "none", unsafe(link_section = ".uninit.mrd"))]
static mut RETAINED_RECORD: MaybeUninit<u32> = MaybeUninit::uninit();

/// Reset record kept in retention RAM.
///
/// RAM needs no commit step: a write is visible to the next boot as soon as
/// it lands.
pub struct RetainedWord<'a> {
    cell: NonNull<u32>,
    _cell: PhantomData<&'a mut u32>,
}

impl RetainedWord<'static> {
    /// Takes the linker-placed retained word.
    ///
    /// # Safety
    ///
    /// Must be called at most once; every instance aliases the same word.
    pub unsafe fn steal() -> Self {
        Self {
            cell: unsafe { NonNull::new_unchecked((&raw mut RETAINED_RECORD).cast::<u32>()) },
            _cell: PhantomData,
        }
    }
}

impl<'a> RetainedWord<'a> {
    /// Uses `cell` as the retained word.
    pub fn over(cell: &'a mut u32) -> Self {
        Self {
            cell: NonNull::from(cell),
            _cell: PhantomData,
        }
    }
}

impl PersistentStore for RetainedWord<'_> {
    fn ready(&self) -> bool {
        true
    }

    fn read(&mut self) -> Result<u32, StoreError> {
        // SAFETY: `cell` is exclusively owned by this value and always aligned.
        Ok(unsafe { self.cell.as_ptr().read_volatile() })
    }

    fn write(&mut self, value: u32) -> Result<(), StoreError> {
        // SAFETY: see `read`.
        unsafe { self.cell.as_ptr().write_volatile(value) };
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
