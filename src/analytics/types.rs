//! Analytics type definitions
//!
//! Contains the time window, per-metric statistics, health score,
//! fuel metrics and period comparison structures returned by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Metric;

/// Resolved time range label
///
/// Serialized with the short preset names used in query strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeRange {
    /// Last hour
    #[serde(rename = "1h")]
    Hour1,
    /// Last 24 hours
    #[serde(rename = "24h")]
    Hours24,
    /// Last 7 days
    #[serde(rename = "7d")]
    Days7,
    /// Last 30 days
    #[serde(rename = "30d")]
    Days30,
    /// All time (no filter)
    #[default]
    #[serde(rename = "all")]
    All,
    /// Explicit start and/or end bounds
    #[serde(rename = "custom")]
    Custom,
}

impl TimeRange {
    /// Parse a preset name; `custom` is not a preset and yields `None`
    pub fn from_preset(preset: &str) -> Option<Self> {
        match preset.trim() {
            "1h" => Some(TimeRange::Hour1),
            "24h" => Some(TimeRange::Hours24),
            "7d" => Some(TimeRange::Days7),
            "30d" => Some(TimeRange::Days30),
            "all" => Some(TimeRange::All),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeRange::Hour1 => "1h",
            TimeRange::Hours24 => "24h",
            TimeRange::Days7 => "7d",
            TimeRange::Days30 => "30d",
            TimeRange::All => "all",
            TimeRange::Custom => "custom",
        }
    }

    /// Returns the number of seconds for this time range
    /// Returns None for All and Custom (no relative limit)
    pub fn to_seconds(&self) -> Option<i64> {
        match self {
            TimeRange::Hour1 => Some(60 * 60),
            TimeRange::Hours24 => Some(24 * 60 * 60),
            TimeRange::Days7 => Some(7 * 24 * 60 * 60),
            TimeRange::Days30 => Some(30 * 24 * 60 * 60),
            TimeRange::All | TimeRange::Custom => None,
        }
    }
}

/// A time interval used to filter readings
///
/// A missing bound is open on that side; both missing means all time.
/// Bounds are inclusive. An inverted window simply matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self { start, end }
    }

    /// The unbounded window
    pub fn all() -> Self {
        Self::default()
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Whether an instant falls inside the window
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start.map_or(true, |s| instant >= s) && self.end.map_or(true, |e| instant <= e)
    }
}

/// Min/max/avg of one metric over a window
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Aggregated statistics for all five metrics over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResult {
    pub rpm: MetricStats,
    pub torque: MetricStats,
    pub maf: MetricStats,
    pub temperature: MetricStats,
    pub fuel_consumption: MetricStats,

    /// Number of readings in the window
    pub count: usize,

    /// Resolved preset label, or `custom` for explicit bounds
    pub time_range: TimeRange,

    /// The resolved window echoed back
    pub period: TimeWindow,
}

impl StatsResult {
    /// The all-zero result returned for an empty window
    pub fn empty(window: TimeWindow, time_range: TimeRange) -> Self {
        Self {
            rpm: MetricStats::default(),
            torque: MetricStats::default(),
            maf: MetricStats::default(),
            temperature: MetricStats::default(),
            fuel_consumption: MetricStats::default(),
            count: 0,
            time_range,
            period: window,
        }
    }

    pub fn metric(&self, metric: Metric) -> &MetricStats {
        match metric {
            Metric::Rpm => &self.rpm,
            Metric::Torque => &self.torque,
            Metric::Maf => &self.maf,
            Metric::Temperature => &self.temperature,
            Metric::FuelConsumption => &self.fuel_consumption,
        }
    }

    pub(crate) fn metric_mut(&mut self, metric: Metric) -> &mut MetricStats {
        match metric {
            Metric::Rpm => &mut self.rpm,
            Metric::Torque => &mut self.torque,
            Metric::Maf => &mut self.maf,
            Metric::Temperature => &mut self.temperature,
            Metric::FuelConsumption => &mut self.fuel_consumption,
        }
    }
}

// === Health Score ===

/// Severity of a detected health issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Overall health rating derived from the score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthRating {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl HealthRating {
    /// Map a 0-100 score onto a rating
    pub fn from_score(score: u8) -> Self {
        match score {
            90..=u8::MAX => HealthRating::Excellent,
            75..=89 => HealthRating::Good,
            60..=74 => HealthRating::Fair,
            40..=59 => HealthRating::Poor,
            _ => HealthRating::Critical,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            HealthRating::Excellent => "Excellent",
            HealthRating::Good => "Good",
            HealthRating::Fair => "Fair",
            HealthRating::Poor => "Poor",
            HealthRating::Critical => "Critical",
        }
    }

    /// Presentation color hint
    pub fn color(&self) -> &'static str {
        match self {
            HealthRating::Excellent => "green",
            HealthRating::Good => "blue",
            HealthRating::Fair => "yellow",
            HealthRating::Poor => "orange",
            HealthRating::Critical => "red",
        }
    }
}

/// A single finding produced by the health heuristic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthIssue {
    pub severity: Severity,
    /// Metric the finding is about
    pub metric: Metric,
    pub message: String,
}

/// Summary snapshot shown next to the score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthMetrics {
    pub avg_temp: f64,
    pub max_temp: f64,
    pub avg_rpm: f64,
    pub avg_fuel: f64,
}

/// Heuristic engine health rating
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthScore {
    /// 0-100
    pub score: u8,
    pub rating: HealthRating,
    pub color: String,
    pub issues: Vec<HealthIssue>,
    pub metrics: HealthMetrics,
}

// === Fuel Metrics ===

/// Fuel efficiency class from average consumption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FuelEfficiency {
    Excellent,
    Good,
    Fair,
    Poor,
}

/// Pricing assumptions for fuel cost projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelPricing {
    /// Price per liter of fuel
    pub price_per_liter: f64,
    /// Interval between consecutive readings, in seconds
    pub sample_interval_secs: u64,
}

impl Default for FuelPricing {
    fn default() -> Self {
        Self {
            price_per_liter: 15000.0,
            sample_interval_secs: 300,
        }
    }
}

/// Fuel consumption and cost projection over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuelMetrics {
    pub avg_consumption: f64,
    pub min_consumption: f64,
    pub max_consumption: f64,
    pub total_fuel: f64,
    pub fuel_per_km: f64,
    /// Kilometers
    pub estimated_distance: f64,
    pub total_cost: f64,
    pub cost_per_km: f64,
    pub efficiency: FuelEfficiency,
}

// === Period Comparison ===

/// Direction of change between two periods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

/// Current-period average of a metric and its change against the previous period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricComparison {
    pub value: f64,
    /// Percent change, one decimal
    pub change: f64,
    pub trend: Trend,
}

/// Named pair of periods to compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ComparisonPreset {
    #[default]
    #[serde(rename = "today-yesterday")]
    TodayVsYesterday,
    #[serde(rename = "week-week")]
    WeekVsWeek,
    #[serde(rename = "month-month")]
    MonthVsMonth,
}

impl ComparisonPreset {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "today-yesterday" => Some(ComparisonPreset::TodayVsYesterday),
            "week-week" => Some(ComparisonPreset::WeekVsWeek),
            "month-month" => Some(ComparisonPreset::MonthVsMonth),
            _ => None,
        }
    }
}

/// Per-metric comparison of two periods
///
/// A metric is `None` when either period has no readings or the previous
/// average is zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodComparison {
    pub preset: ComparisonPreset,
    pub current: TimeWindow,
    pub previous: TimeWindow,
    pub rpm: Option<MetricComparison>,
    pub torque: Option<MetricComparison>,
    pub maf: Option<MetricComparison>,
    pub temperature: Option<MetricComparison>,
    pub fuel_consumption: Option<MetricComparison>,
}

impl PeriodComparison {
    pub fn metric(&self, metric: Metric) -> Option<&MetricComparison> {
        match metric {
            Metric::Rpm => self.rpm.as_ref(),
            Metric::Torque => self.torque.as_ref(),
            Metric::Maf => self.maf.as_ref(),
            Metric::Temperature => self.temperature.as_ref(),
            Metric::FuelConsumption => self.fuel_consumption.as_ref(),
        }
    }
}
