//! Engine telemetry data models
//!
//! Sensor readings as stored and served, plus the ingest payload that
//! becomes a new reading after validation.

pub mod reading;

pub use reading::*;
