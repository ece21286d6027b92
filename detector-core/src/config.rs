//! Construction-time settings for the reset tracker.

use core::time::Duration;

use crate::record::MAX_COUNT;

/// Resets required within the window when nothing else is configured.
pub const DEFAULT_THRESHOLD: u16 = 3;
/// Waiting window armed after a non-triggering boot.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Storage location handed to backends that need one.
pub const DEFAULT_ADDRESS: u32 = 0;

/// Threshold, timeout, and storage location for a [`ResetCycleTracker`].
///
/// Values are fixed once a tracker is built. `address` is interpreted by the
/// storage backend (byte offset, register index, ...) and ignored by the
/// tracker itself.
///
/// [`ResetCycleTracker`]: crate::tracker::ResetCycleTracker
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DetectorConfig {
    pub threshold: u16,
    pub timeout: Duration,
    pub address: u32,
}

impl DetectorConfig {
    /// Creates a configuration, clamping the threshold into `1..=MAX_COUNT`.
    #[must_use]
    pub const fn new(threshold: u16, timeout: Duration) -> Self {
        Self {
            threshold: clamp_threshold(threshold),
            timeout,
            address: DEFAULT_ADDRESS,
        }
    }

    #[must_use]
    pub const fn with_threshold(mut self, threshold: u16) -> Self {
        self.threshold = clamp_threshold(threshold);
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the window length in whole seconds.
    #[must_use]
    pub const fn with_timeout_secs(self, seconds: u64) -> Self {
        self.with_timeout(Duration::from_secs(seconds))
    }

    #[must_use]
    pub const fn with_address(mut self, address: u32) -> Self {
        self.address = address;
        self
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD, DEFAULT_TIMEOUT)
    }
}

/// Keeps the threshold reachable: counts saturate at [`MAX_COUNT`].
const fn clamp_threshold(threshold: u16) -> u16 {
    if threshold == 0 {
        1
    } else if threshold > MAX_COUNT {
        MAX_COUNT
    } else {
        threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_library_constants() {
        let config = DetectorConfig::default();
        assert_eq!(config.threshold, 3);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.address, 0);
    }

    #[test]
    fn zero_threshold_is_clamped() {
        assert_eq!(DetectorConfig::new(0, DEFAULT_TIMEOUT).threshold, 1);
        assert_eq!(DetectorConfig::default().with_threshold(0).threshold, 1);
    }

    #[test]
    fn unreachable_threshold_is_clamped_to_max_count() {
        assert_eq!(DetectorConfig::new(u16::MAX, DEFAULT_TIMEOUT).threshold, MAX_COUNT);
        assert_eq!(
            DetectorConfig::default().with_threshold(u16::MAX).threshold,
            MAX_COUNT
        );
        assert_eq!(DetectorConfig::new(MAX_COUNT, DEFAULT_TIMEOUT).threshold, MAX_COUNT);
    }

    #[test]
    fn builders_override_fields() {
        let config = DetectorConfig::default()
            .with_threshold(5)
            .with_timeout_secs(30)
            .with_address(256);
        assert_eq!(config.threshold, 5);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.address, 256);
    }
}
