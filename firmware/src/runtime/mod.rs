use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt::{info, warn};
use defmt_rtt as _;
use detector_core::ResetCycleTracker;
use detector_core::store::SlotJournal;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::flash::Flash;
use embassy_time::Instant;

use crate::config::{self, Backend};
use crate::status;
use crate::storage::BoardStore;
use crate::storage::flash::RecordPage;
use crate::storage::retained::RetainedWord;

mod window;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) type Tracker = ResetCycleTracker<BoardStore<'static>>;

#[embassy_executor::main]
pub async fn main(_spawner: Spawner) {
    let hal::Peripherals { FLASH, .. } = hal::init(hal::Config::default());
    // The time driver runs only once the HAL is up.
    let booted = Instant::now();

    let store = match config::BACKEND {
        Backend::Flash => BoardStore::Flash(SlotJournal::new(RecordPage::new(
            Flash::new_blocking(FLASH),
            config::RECORD_PAGE_OFFSET,
        ))),
        // SAFETY: the only claim of the retained word.
        Backend::Retained => BoardStore::Retained(unsafe { RetainedWord::steal() }),
    };

    let mut tracker: Tracker = ResetCycleTracker::from_config(config::detector(), store);
    if tracker.detect() {
        info!("multi-reset detected, entering configuration mode");
    } else {
        info!(
            "normal boot (count={}, storage={})",
            tracker.record().count,
            tracker.persistence()
        );
    }
    if let Some(fault) = tracker.last_fault() {
        warn!("reset detector fault: {}", fault);
    }
    status::publish(&tracker.status());

    window::watch(&mut tracker, booted).await;

    core::future::pending::<()>().await;
}
