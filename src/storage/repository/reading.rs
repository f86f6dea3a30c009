//! Sensor reading persistence
//!
//! Provides insert, windowed query, pagination and delete methods for the
//! Database. Timestamps are stored as epoch milliseconds; every window
//! filter is inclusive at both ends and an absent bound is unconstrained.

use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use super::{ReadingPage, StorageError};
use crate::analytics::TimeWindow;
use crate::models::{NewSensorReading, SensorReading};
use crate::storage::Database;

const SELECT_COLUMNS: &str = "SELECT id, timestamp, rpm, torque, maf, temperature, fuel_consumption, custom_sensor, alert_status
     FROM sensor_data";

const WINDOW_FILTER: &str = "(?1 IS NULL OR timestamp >= ?1) AND (?2 IS NULL OR timestamp <= ?2)";

/// Window bounds as nullable epoch milliseconds
fn bounds(window: &TimeWindow) -> (Option<i64>, Option<i64>) {
    (
        window.start.map(|t| t.timestamp_millis()),
        window.end.map(|t| t.timestamp_millis()),
    )
}

fn row_to_reading(row: &Row<'_>) -> rusqlite::Result<SensorReading> {
    let millis: i64 = row.get(1)?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(1, millis))?;

    Ok(SensorReading {
        id: row.get(0)?,
        timestamp,
        rpm: row.get(2)?,
        torque: row.get(3)?,
        maf: row.get(4)?,
        temperature: row.get(5)?,
        fuel_consumption: row.get(6)?,
        custom_sensor: row.get(7)?,
        alert_status: row.get(8)?,
    })
}

fn insert_row(
    conn: &rusqlite::Connection,
    reading: &NewSensorReading,
    now: DateTime<Utc>,
) -> Result<i64, StorageError> {
    let timestamp = reading.timestamp.unwrap_or(now);
    conn.execute(
        "INSERT INTO sensor_data (timestamp, rpm, torque, maf, temperature, fuel_consumption, custom_sensor, alert_status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            timestamp.timestamp_millis(),
            reading.rpm,
            reading.torque,
            reading.maf,
            reading.temperature,
            reading.fuel_consumption,
            reading.custom_sensor,
            reading.alert_status,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

impl Database {
    /// Persist a validated reading and return it with its assigned id
    ///
    /// A reading without a timestamp is stamped with the insertion time.
    pub fn insert_reading(&self, reading: &NewSensorReading) -> Result<SensorReading, StorageError> {
        let id = insert_row(self.connection(), reading, Utc::now())?;
        self.get_reading(id)
    }

    /// Persist many readings in one transaction
    ///
    /// # Returns
    /// Number of inserted rows
    pub fn insert_readings(&mut self, readings: &[NewSensorReading]) -> Result<usize, StorageError> {
        let now = Utc::now();
        let tx = self.connection_mut().transaction()?;
        for reading in readings {
            insert_row(&tx, reading, now)?;
        }
        tx.commit()?;
        Ok(readings.len())
    }

    /// Get a reading by id
    pub fn get_reading(&self, id: i64) -> Result<SensorReading, StorageError> {
        let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
        let result = self
            .connection()
            .query_row(&sql, params![id], row_to_reading);

        match result {
            Ok(reading) => Ok(reading),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                Err(StorageError::NotFound(format!("reading {}", id)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All readings inside the window, oldest first
    pub fn query_range(&self, window: &TimeWindow) -> Result<Vec<SensorReading>, StorageError> {
        self.query_series(window, None)
    }

    /// Readings inside the window, oldest first, optionally capped at `limit`
    pub fn query_series(
        &self,
        window: &TimeWindow,
        limit: Option<usize>,
    ) -> Result<Vec<SensorReading>, StorageError> {
        let (start, end) = bounds(window);
        // SQLite treats a negative LIMIT as no limit
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let sql = format!(
            "{} WHERE {} ORDER BY timestamp ASC, id ASC LIMIT ?3",
            SELECT_COLUMNS, WINDOW_FILTER
        );

        let mut stmt = self.connection().prepare(&sql)?;
        let readings = stmt
            .query_map(params![start, end, limit], row_to_reading)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(readings)
    }

    /// One page of readings inside the window, newest first
    ///
    /// # Arguments
    /// * `page` - 1-based page number
    /// * `limit` - Page size, at least 1
    pub fn list_readings(
        &self,
        window: &TimeWindow,
        page: usize,
        limit: usize,
    ) -> Result<ReadingPage, StorageError> {
        if page == 0 || limit == 0 {
            return Err(StorageError::InvalidInput(
                "page and limit must be at least 1".to_string(),
            ));
        }

        let total = self.count_readings(window)?;
        let (start, end) = bounds(window);
        let Some(offset) = (page - 1)
            .checked_mul(limit)
            .and_then(|o| i64::try_from(o).ok())
        else {
            return Ok(ReadingPage {
                readings: Vec::new(),
                total,
            });
        };
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!(
            "{} WHERE {} ORDER BY timestamp DESC, id DESC LIMIT ?3 OFFSET ?4",
            SELECT_COLUMNS, WINDOW_FILTER
        );

        let mut stmt = self.connection().prepare(&sql)?;
        let readings = stmt
            .query_map(params![start, end, limit, offset], row_to_reading)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ReadingPage { readings, total })
    }

    /// Most recent reading, if any
    pub fn latest_reading(&self) -> Result<Option<SensorReading>, StorageError> {
        let sql = format!("{} ORDER BY timestamp DESC, id DESC LIMIT 1", SELECT_COLUMNS);
        let result = self.connection().query_row(&sql, [], row_to_reading);

        match result {
            Ok(reading) => Ok(Some(reading)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Number of readings inside the window
    pub fn count_readings(&self, window: &TimeWindow) -> Result<usize, StorageError> {
        let (start, end) = bounds(window);
        let sql = format!("SELECT COUNT(*) FROM sensor_data WHERE {}", WINDOW_FILTER);
        let count: i64 = self
            .connection()
            .query_row(&sql, params![start, end], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete every reading inside the window
    ///
    /// An unbounded window deletes everything.
    ///
    /// # Returns
    /// Number of deleted rows
    pub fn delete_readings(&self, window: &TimeWindow) -> Result<usize, StorageError> {
        let (start, end) = bounds(window);
        let sql = format!("DELETE FROM sensor_data WHERE {}", WINDOW_FILTER);
        let deleted = self.connection().execute(&sql, params![start, end])?;
        Ok(deleted)
    }
}
