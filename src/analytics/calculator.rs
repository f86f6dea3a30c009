//! Analytics calculation logic
//!
//! Functions for computing window statistics and fuel metrics from readings.
//! Everything here is pure: callers fetch readings from the store first.

use crate::models::{Metric, SensorReading};

use super::{
    AnalyticsError, FuelEfficiency, FuelMetrics, FuelPricing, MetricStats, StatsResult,
    TimeRange, TimeWindow,
};

/// Average consumption at or below which fuel use is rated Excellent
pub const FUEL_EFFICIENT: f64 = 8.0;
/// Average consumption at or below which fuel use is rated Good
pub const FUEL_NORMAL: f64 = 12.0;
/// Average consumption at or below which fuel use is rated Fair
pub const FUEL_WARNING: f64 = 15.0;

/// Divisor turning average RPM into an estimated road speed in km/h
const RPM_PER_KMH: f64 = 100.0;

/// Running min/max/sum of one metric
#[derive(Debug, Clone, Copy)]
struct MetricAccumulator {
    min: f64,
    max: f64,
    sum: f64,
}

impl MetricAccumulator {
    fn new() -> Self {
        Self {
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            sum: 0.0,
        }
    }

    fn push(&mut self, value: f64) {
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.sum += value;
    }
}

/// Rounds a value to a fixed number of decimals (half away from zero)
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Arithmetic mean of a metric; 0 for an empty slice
pub fn mean(readings: &[SensorReading], metric: Metric) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    readings.iter().map(|r| r.value(metric)).sum::<f64>() / readings.len() as f64
}

/// Maximum of a metric; negative infinity for an empty slice
pub fn max_of(readings: &[SensorReading], metric: Metric) -> f64 {
    readings
        .iter()
        .map(|r| r.value(metric))
        .fold(f64::NEG_INFINITY, f64::max)
}

/// Population variance of a metric; 0 for an empty slice
pub fn variance(readings: &[SensorReading], metric: Metric) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    let avg = mean(readings, metric);
    readings
        .iter()
        .map(|r| (r.value(metric) - avg).powi(2))
        .sum::<f64>()
        / readings.len() as f64
}

/// Aggregates readings into per-metric statistics
///
/// Each reading is visited exactly once and the result does not depend on
/// reading order. An empty slice yields the all-zero result with the window
/// echoed back, so consumers never have to null-check an empty range.
///
/// # Arguments
/// * `readings` - Readings already filtered to `window`
/// * `window` - The resolved window, echoed as `period`
/// * `time_range` - The label the window was resolved from
pub fn aggregate(
    readings: &[SensorReading],
    window: TimeWindow,
    time_range: TimeRange,
) -> StatsResult {
    let mut result = StatsResult::empty(window, time_range);
    if readings.is_empty() {
        return result;
    }

    let mut accumulators = [MetricAccumulator::new(); 5];
    for reading in readings {
        for metric in Metric::ALL {
            accumulators[metric.index()].push(reading.value(metric));
        }
    }

    let count = readings.len();
    for metric in Metric::ALL {
        let acc = accumulators[metric.index()];
        let precision = metric.precision();
        *result.metric_mut(metric) = MetricStats {
            min: round_to(acc.min, precision),
            max: round_to(acc.max, precision),
            avg: round_to(acc.sum / count as f64, precision),
        };
    }
    result.count = count;

    result
}

/// Rates average fuel consumption
pub fn fuel_efficiency(avg_consumption: f64) -> FuelEfficiency {
    if avg_consumption > FUEL_WARNING {
        FuelEfficiency::Poor
    } else if avg_consumption > FUEL_NORMAL {
        FuelEfficiency::Fair
    } else if avg_consumption > FUEL_EFFICIENT {
        FuelEfficiency::Good
    } else {
        FuelEfficiency::Excellent
    }
}

/// Projects fuel use, distance and cost over a set of readings
///
/// Road speed is estimated from average RPM and elapsed time from the
/// reading count times the sampling interval. With an estimated speed of
/// zero the per-kilometer figures are reported as zero.
pub fn fuel_metrics(
    readings: &[SensorReading],
    pricing: FuelPricing,
) -> Result<FuelMetrics, AnalyticsError> {
    if readings.is_empty() {
        return Err(AnalyticsError::EmptyReadings);
    }

    let n = readings.len() as f64;
    let total_fuel: f64 = readings.iter().map(|r| r.fuel_consumption).sum();
    let avg_consumption = total_fuel / n;
    let min_consumption = readings
        .iter()
        .map(|r| r.fuel_consumption)
        .fold(f64::INFINITY, f64::min);
    let max_consumption = max_of(readings, Metric::FuelConsumption);

    let estimated_speed = mean(readings, Metric::Rpm) / RPM_PER_KMH;
    let duration_hours = n * pricing.sample_interval_secs as f64 / 3600.0;
    let estimated_distance = estimated_speed * duration_hours;

    let fuel_per_km = if estimated_speed > 0.0 {
        avg_consumption / estimated_speed
    } else {
        0.0
    };
    let total_cost = total_fuel * pricing.price_per_liter / 1000.0;
    let cost_per_km = fuel_per_km * pricing.price_per_liter / 1000.0;

    Ok(FuelMetrics {
        avg_consumption: round_to(avg_consumption, 2),
        min_consumption: round_to(min_consumption, 2),
        max_consumption: round_to(max_consumption, 2),
        total_fuel: round_to(total_fuel, 2),
        fuel_per_km: round_to(fuel_per_km, 3),
        estimated_distance: round_to(estimated_distance, 1),
        total_cost: round_to(total_cost, 0),
        cost_per_km: round_to(cost_per_km, 0),
        efficiency: fuel_efficiency(avg_consumption),
    })
}
