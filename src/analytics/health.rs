//! Engine health scoring
//!
//! A threshold heuristic: start from 100 and deduct a fixed amount for every
//! dimension that looks unhealthy. The thresholds are calibration constants,
//! not derived from an engine model.

use crate::models::{Metric, SensorReading};

use super::calculator::{max_of, mean, round_to, variance};
use super::{AnalyticsError, HealthIssue, HealthMetrics, HealthRating, HealthScore, Severity};

/// Score before any deduction
pub const BASE_SCORE: f64 = 100.0;

/// Peak coolant temperature thresholds (°C) and their deductions
pub const TEMP_CRITICAL: f64 = 110.0;
pub const TEMP_WARNING: f64 = 100.0;
pub const TEMP_CRITICAL_PENALTY: f64 = 20.0;
pub const TEMP_WARNING_PENALTY: f64 = 10.0;

/// Peak RPM above which the engine is flagged critical
pub const RPM_CRITICAL: f64 = 6000.0;
/// RPM counted as over-rev
pub const RPM_OVER_REV: f64 = 5000.0;
/// Share of over-rev readings above which RPM is flagged
pub const OVER_REV_FRACTION: f64 = 0.2;
/// Deductions for the RPM findings
pub const RPM_CRITICAL_PENALTY: f64 = 15.0;
pub const RPM_OVER_REV_PENALTY: f64 = 10.0;

/// Torque peak and low-average thresholds (Nm) and their deductions
pub const TORQUE_PEAK: f64 = 300.0;
pub const TORQUE_LOW_AVG: f64 = 100.0;
pub const TORQUE_PEAK_PENALTY: f64 = 5.0;
pub const TORQUE_LOW_PENALTY: f64 = 10.0;

/// Population variance of MAF above which airflow is erratic
pub const MAF_VARIANCE_LIMIT: f64 = 500.0;
pub const MAF_VARIANCE_PENALTY: f64 = 10.0;

/// Average fuel use (L/h) above which consumption is flagged
pub const FUEL_AVG_LIMIT: f64 = 15.0;
pub const FUEL_PENALTY: f64 = 10.0;

/// Variances under which temperature and RPM count as stable
pub const TEMP_STABLE_VARIANCE: f64 = 25.0;
pub const RPM_STABLE_VARIANCE: f64 = 100_000.0;
/// Deduction when either variance is out of range
pub const INSTABILITY_PENALTY: f64 = 10.0;

/// Collects deductions and findings while scoring
struct Assessment {
    score: f64,
    issues: Vec<HealthIssue>,
}

impl Assessment {
    fn new() -> Self {
        Self {
            score: BASE_SCORE,
            issues: Vec::new(),
        }
    }

    fn deduct(&mut self, penalty: f64, severity: Severity, metric: Metric, message: String) {
        self.score -= penalty;
        self.issues.push(HealthIssue {
            severity,
            metric,
            message,
        });
    }
}

/// Scores engine health over a non-empty set of readings
///
/// Dimensions are checked independently:
/// - Temperature peak (critical above 110, warning above 100)
/// - RPM peak above 6000, otherwise the share of readings above 5000
/// - Torque peak above 300 and low average torque below 100
/// - MAF variance above 500
/// - Average fuel consumption above 15
/// - Stability: temperature and RPM variance
///
/// # Returns
/// The clamped, rounded score with rating and findings, or
/// `AnalyticsError::EmptyReadings` for an empty slice
pub fn score(readings: &[SensorReading]) -> Result<HealthScore, AnalyticsError> {
    if readings.is_empty() {
        return Err(AnalyticsError::EmptyReadings);
    }

    let n = readings.len() as f64;
    let mut assessment = Assessment::new();

    // Temperature
    let avg_temp = mean(readings, Metric::Temperature);
    let max_temp = max_of(readings, Metric::Temperature);
    if max_temp > TEMP_CRITICAL {
        assessment.deduct(
            TEMP_CRITICAL_PENALTY,
            Severity::Critical,
            Metric::Temperature,
            format!("Critical temperature detected (peak {:.1}°C)", max_temp),
        );
    } else if max_temp > TEMP_WARNING {
        assessment.deduct(
            TEMP_WARNING_PENALTY,
            Severity::Warning,
            Metric::Temperature,
            format!("High temperature detected (peak {:.1}°C)", max_temp),
        );
    }

    // RPM
    let avg_rpm = mean(readings, Metric::Rpm);
    let max_rpm = max_of(readings, Metric::Rpm);
    let over_rev = readings.iter().filter(|r| r.rpm > RPM_OVER_REV).count() as f64 / n;
    if max_rpm > RPM_CRITICAL {
        assessment.deduct(
            RPM_CRITICAL_PENALTY,
            Severity::Critical,
            Metric::Rpm,
            format!("RPM exceeded redline (peak {:.0})", max_rpm),
        );
    } else if over_rev > OVER_REV_FRACTION {
        assessment.deduct(
            RPM_OVER_REV_PENALTY,
            Severity::Warning,
            Metric::Rpm,
            format!("Frequent over-revving ({:.0}% of readings)", over_rev * 100.0),
        );
    }

    // Torque: both checks may apply
    let avg_torque = mean(readings, Metric::Torque);
    let max_torque = max_of(readings, Metric::Torque);
    if max_torque > TORQUE_PEAK {
        assessment.deduct(
            TORQUE_PEAK_PENALTY,
            Severity::Info,
            Metric::Torque,
            format!("Torque peak above {:.0} Nm", TORQUE_PEAK),
        );
    }
    if avg_torque < TORQUE_LOW_AVG {
        assessment.deduct(
            TORQUE_LOW_PENALTY,
            Severity::Warning,
            Metric::Torque,
            format!("Low average torque ({:.1} Nm)", avg_torque),
        );
    }

    // MAF
    if variance(readings, Metric::Maf) > MAF_VARIANCE_LIMIT {
        assessment.deduct(
            MAF_VARIANCE_PENALTY,
            Severity::Warning,
            Metric::Maf,
            "Unstable mass air flow".to_string(),
        );
    }

    // Fuel
    let avg_fuel = mean(readings, Metric::FuelConsumption);
    if avg_fuel > FUEL_AVG_LIMIT {
        assessment.deduct(
            FUEL_PENALTY,
            Severity::Warning,
            Metric::FuelConsumption,
            format!("High fuel consumption ({:.2} L/h)", avg_fuel),
        );
    }

    // Stability
    let temp_stable = variance(readings, Metric::Temperature) < TEMP_STABLE_VARIANCE;
    let rpm_stable = variance(readings, Metric::Rpm) < RPM_STABLE_VARIANCE;
    if !(temp_stable && rpm_stable) {
        let metric = if temp_stable { Metric::Rpm } else { Metric::Temperature };
        assessment.deduct(
            INSTABILITY_PENALTY,
            Severity::Info,
            metric,
            "Unstable engine performance".to_string(),
        );
    }

    let score = assessment.score.clamp(0.0, BASE_SCORE).round() as u8;
    let rating = HealthRating::from_score(score);

    Ok(HealthScore {
        score,
        rating,
        color: rating.color().to_string(),
        issues: assessment.issues,
        metrics: HealthMetrics {
            avg_temp: round_to(avg_temp, 1),
            max_temp: round_to(max_temp, 1),
            avg_rpm: round_to(avg_rpm, 0),
            avg_fuel: round_to(avg_fuel, 2),
        },
    })
}
