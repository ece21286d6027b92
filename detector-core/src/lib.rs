#![no_std]

// Multi-reset detection shared by the firmware and host tooling.
//
// The crate stays portable by avoiding the Rust standard library: storage
// media, clocks, and log transports are supplied by the embedding crate.

pub mod config;
pub mod record;
pub mod store;
pub mod telemetry;
pub mod tracker;

pub use config::DetectorConfig;
pub use record::{RECORD_BEGIN, RECORD_CLEAR, RECORD_ERASED, ResetRecord};
pub use store::{MemoryStore, PersistentStore, StoreError};
pub use tracker::{Persistence, ResetCycleTracker, TrackerFault, TrackerStatus};
