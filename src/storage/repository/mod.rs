//! Repository layer for database CRUD operations
//!
//! Provides high-level database operations for sensor readings.

mod reading;

pub use super::error::StorageError;
use crate::models::SensorReading;

/// One page of a newest-first listing
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingPage {
    /// Readings on this page
    pub readings: Vec<SensorReading>,
    /// Number of readings in the whole window
    pub total: usize,
}

impl ReadingPage {
    /// Number of pages of size `limit` needed for the whole window
    pub fn total_pages(&self, limit: usize) -> usize {
        if limit == 0 {
            return 0;
        }
        self.total.div_ceil(limit)
    }
}
