//! Sizing and dispatch of an ammonia energy-storage asset.
//!
//! A mixed-integer model chooses the storage capacity, the initial inventory
//! and a charge/discharge schedule that maximise operating margin over one
//! price horizon. Costs, levelized figures and operating analytics are
//! computed from the solved ledger afterwards.

pub mod analysis;
pub mod config;
pub mod domain;
pub mod economics;
pub mod error;
pub mod io;
pub mod optimizer;
pub mod process_units;
pub mod report;
pub mod scenario;
pub mod telemetry;

pub use error::{EngineError, EngineResult};
