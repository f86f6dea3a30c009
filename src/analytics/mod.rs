//! Analytics module for engine telemetry statistics
//!
//! Provides the pure aggregation engine behind the dashboard: time range
//! resolution, per-metric min/max/avg statistics, a heuristic health score,
//! fuel cost projection and period-over-period comparison.
//!
//! ## Architecture
//!
//! - **Range resolution**: preset names or explicit bounds become a `TimeWindow`
//! - **Aggregation**: readings already filtered by the store become a `StatsResult`
//! - **Extended analytics**: health score, fuel metrics, comparisons
//!
//! Nothing here performs I/O or holds state; every call works only on its
//! arguments, so calls for different requests need no coordination.

mod error;
mod types;


pub use error::AnalyticsError;
pub use types::*;

/// Time range resolution
pub mod range;

pub use range::{parse_instant, parse_window, resolve, ResolvedRange};


/// Calculator module for statistics and fuel metrics
pub mod calculator;


/// Heuristic health scoring
pub mod health;


/// Period-over-period comparison
pub mod comparison;
