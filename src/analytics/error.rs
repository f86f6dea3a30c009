//! Analytics error types

use thiserror::Error;

/// Analytics computation error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalyticsError {
    /// The computation needs at least one reading
    #[error("no readings in the requested window")]
    EmptyReadings,
}
