use core::time::Duration;

use defmt::{info, warn};
use embassy_time::{Duration as TickDuration, Instant, Ticker};

use super::Tracker;
use crate::config::POLL_INTERVAL_MS;
use crate::status;

/// Polls the open detection window until it closes.
pub async fn watch(tracker: &mut Tracker, booted: Instant) {
    let mut ticker = Ticker::every(TickDuration::from_millis(POLL_INTERVAL_MS));
    while tracker.is_waiting() {
        ticker.next().await;

        let elapsed = Duration::from_micros(booted.elapsed().as_micros());
        match tracker.poll(elapsed) {
            Ok(true) => info!("reset window closed after {} ms", elapsed.as_millis()),
            Ok(false) => continue,
            Err(fault) => warn!("reset window closed, clear failed: {}", fault),
        }
        status::publish(&tracker.status());
    }
}
