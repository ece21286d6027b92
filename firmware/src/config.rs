#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Board-level detector settings.

use core::time::Duration;

use detector_core::DetectorConfig;

/// Consecutive short-lived boots that count as a multi-reset.
pub const THRESHOLD: u16 = 3;
/// Uptime after which a boot no longer counts toward the threshold.
pub const TIMEOUT: Duration = Duration::from_secs(10);
/// Interval between detection window polls.
pub const POLL_INTERVAL_MS: u64 = 100;
/// Medium holding the reset record.
pub const BACKEND: Backend = Backend::Flash;

/// Flash offset of the page reserved for the record journal: the last page
/// of the device, outside the program image.
#[cfg(target_os = "none")]
#[allow(clippy::cast_possible_truncation)]
pub const RECORD_PAGE_OFFSET: u32 =
    (embassy_stm32::flash::FLASH_SIZE - embassy_stm32::flash::MAX_ERASE_SIZE) as u32;
#[cfg(not(target_os = "none"))]
pub const RECORD_PAGE_OFFSET: u32 = 0;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Backend {
    /// Slot journal on the reserved flash page. Survives power loss.
    Flash,
    /// Word in `.uninit` RAM. Survives warm resets only.
    Retained,
}

pub const fn detector() -> DetectorConfig {
    DetectorConfig::new(THRESHOLD, TIMEOUT).with_address(RECORD_PAGE_OFFSET)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detector_uses_board_constants() {
        let config = detector();
        assert_eq!(config.threshold, THRESHOLD);
        assert_eq!(config.timeout, TIMEOUT);
        assert_eq!(config.address, RECORD_PAGE_OFFSET);
    }
}
