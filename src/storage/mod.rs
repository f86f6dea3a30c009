//! Local storage module for EMSys
//!
//! Provides SQLite-based persistence for sensor readings.

mod database;
mod error;
mod repository;

pub use database::Database;
pub use error::StorageError;
pub use repository::ReadingPage;
