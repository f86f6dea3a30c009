//! Sample data generation
//!
//! Fills the store with a week of plausible readings: the last 24 hours
//! every 5 minutes, days 2-3 every 30 minutes and days 4-7 hourly. Engine
//! load is higher during the morning and evening rush hours.

use chrono::{DateTime, Duration, Timelike, Utc};
use rand::Rng;

use crate::analytics::calculator::round_to;
use crate::analytics::TimeWindow;
use crate::models::NewSensorReading;
use crate::storage::{Database, StorageError};

/// Rows per insert transaction
pub const BATCH_SIZE: usize = 100;

/// Readings per generated tier: (count, first offset in minutes, step in minutes)
const TIERS: [(i64, i64, i64); 3] = [(288, 0, 5), (96, 1440, 30), (96, 2880, 60)];

/// Result of a seeding run
#[derive(Debug, Clone, PartialEq)]
pub struct SeedSummary {
    pub inserted: usize,
    pub deleted: usize,
    pub oldest: Option<DateTime<Utc>>,
    pub latest: Option<DateTime<Utc>>,
}

/// Minutes before `now` of every generated reading
pub fn offsets_minutes() -> Vec<i64> {
    TIERS
        .iter()
        .flat_map(|&(count, first, step)| (0..count).map(move |i| first + i * step))
        .collect()
}

fn is_rush_hour(hour: u32) -> bool {
    (7..=9).contains(&hour) || (17..=19).contains(&hour)
}

/// Generate one reading at `timestamp`
///
/// MAF follows RPM and fuel use follows torque and RPM, each with noise.
pub fn generate_reading<R: Rng + ?Sized>(rng: &mut R, timestamp: DateTime<Utc>) -> NewSensorReading {
    let (base_rpm, base_torque, base_temp): (f64, f64, f64) = if is_rush_hour(timestamp.hour()) {
        (3500.0, 220.0, 95.0)
    } else {
        (2800.0, 150.0, 85.0)
    };

    let rpm = (base_rpm + rng.gen_range(-400.0..400.0)).clamp(800.0, 6000.0).round();
    let torque = round_to((base_torque + rng.gen_range(-30.0..30.0)).clamp(50.0, 350.0), 1);
    let temperature = round_to((base_temp + rng.gen_range(-7.5..7.5)).clamp(60.0, 115.0), 1);
    let maf = round_to(rpm * 0.01 + rng.gen::<f64>() * 10.0, 1);
    let fuel = round_to(torque * 0.03 + rpm * 0.001 + rng.gen::<f64>() * 2.0, 2);

    NewSensorReading::new(rpm, torque, maf, temperature, fuel).with_timestamp(timestamp)
}

/// Generate the full sample set relative to `now`, newest first
pub fn generate_readings<R: Rng + ?Sized>(rng: &mut R, now: DateTime<Utc>) -> Vec<NewSensorReading> {
    offsets_minutes()
        .into_iter()
        .map(|offset| generate_reading(rng, now - Duration::minutes(offset)))
        .collect()
}

/// Replace all stored readings with freshly generated sample data
pub fn seed_database(db: &mut Database, now: DateTime<Utc>) -> Result<SeedSummary, StorageError> {
    seed_with_rng(db, &mut rand::thread_rng(), now)
}

pub fn seed_with_rng<R: Rng + ?Sized>(
    db: &mut Database,
    rng: &mut R,
    now: DateTime<Utc>,
) -> Result<SeedSummary, StorageError> {
    let deleted = db.delete_readings(&TimeWindow::all())?;
    tracing::info!(deleted, "cleared existing sensor data");

    let readings = generate_readings(rng, now);
    let batches = readings.len().div_ceil(BATCH_SIZE);
    let mut inserted = 0;
    for (index, batch) in readings.chunks(BATCH_SIZE).enumerate() {
        inserted += db.insert_readings(batch)?;
        tracing::debug!(batch = index + 1, batches, "inserted batch");
    }

    let oldest = db
        .query_series(&TimeWindow::all(), Some(1))?
        .first()
        .map(|r| r.timestamp);
    let latest = db.latest_reading()?.map(|r| r.timestamp);
    tracing::info!(inserted, ?oldest, ?latest, "seed completed");

    Ok(SeedSummary {
        inserted,
        deleted,
        oldest,
        latest,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_schedule_tiers() {
        let offsets = offsets_minutes();

        assert_eq!(offsets.len(), 480);
        assert_eq!(offsets[0], 0);
        assert_eq!(offsets[287], 287 * 5);
        assert_eq!(offsets[288], 1440);
        assert_eq!(offsets[383], 1440 + 95 * 30);
        assert_eq!(offsets[384], 2880);
        assert_eq!(offsets[479], 2880 + 95 * 60);
    }

    #[test]
    fn test_generated_values_stay_in_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let readings = generate_readings(&mut rng, now());

        for r in &readings {
            assert!((800.0..=6000.0).contains(&r.rpm));
            assert_eq!(r.rpm, r.rpm.round());
            assert!((50.0..=350.0).contains(&r.torque));
            assert!((60.0..=115.0).contains(&r.temperature));
            assert!(r.maf >= round_to(r.rpm * 0.01, 1));
            assert!(r.fuel_consumption >= round_to(r.torque * 0.03 + r.rpm * 0.001, 2) - 0.01);
            assert_eq!(r.alert_status, r.rpm >= 5000.0);
        }
    }

    #[test]
    fn test_rush_hour_raises_load() {
        let mut rng = StdRng::seed_from_u64(11);
        let rush = Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap();
        let quiet = Utc.with_ymd_and_hms(2024, 1, 15, 13, 0, 0).unwrap();

        for _ in 0..50 {
            let busy = generate_reading(&mut rng, rush);
            let calm = generate_reading(&mut rng, quiet);
            // Ranges [3100, 3900] and [2400, 3200] overlap only at the edges
            assert!(busy.rpm >= 3100.0);
            assert!(calm.rpm <= 3200.0);
            assert!(busy.torque >= 190.0);
            assert!(calm.torque <= 180.0);
        }
    }

    #[test]
    fn test_seed_database_replaces_existing_data() {
        let mut db = Database::new_in_memory().unwrap();
        db.insert_reading(&NewSensorReading::new(1000.0, 100.0, 10.0, 70.0, 5.0))
            .unwrap();

        let mut rng = StdRng::seed_from_u64(42);
        let summary = seed_with_rng(&mut db, &mut rng, now()).unwrap();

        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.inserted, 480);
        assert_eq!(summary.latest, Some(now()));
        assert_eq!(summary.oldest, Some(now() - Duration::minutes(2880 + 95 * 60)));
        assert_eq!(db.count_readings(&TimeWindow::all()).unwrap(), 480);
    }
}
