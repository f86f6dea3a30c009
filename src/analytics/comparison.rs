//! Period-over-period comparison
//!
//! Resolves a comparison preset into a current and a previous window and
//! compares metric averages between them.

use chrono::{DateTime, Datelike, Duration, Months, NaiveTime, Utc};

use crate::models::{Metric, SensorReading};

use super::calculator::{mean, round_to};
use super::{ComparisonPreset, MetricComparison, PeriodComparison, TimeWindow, Trend};

/// Percent change beyond which a metric is trending up or down
pub const TREND_THRESHOLD_PERCENT: f64 = 5.0;

/// The two windows a comparison preset covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComparisonWindows {
    pub current: TimeWindow,
    pub previous: TimeWindow,
}

/// Resolve the current and previous windows of a preset relative to `now`
///
/// The current window runs from the start of the day, week (Sunday) or month
/// until `now`; the previous window is the same span shifted back one day,
/// seven days or one calendar month.
pub fn comparison_windows(preset: ComparisonPreset, now: DateTime<Utc>) -> ComparisonWindows {
    let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();

    let (current_start, previous_start, previous_end) = match preset {
        ComparisonPreset::TodayVsYesterday => {
            let shift = Duration::days(1);
            (start_of_day, start_of_day - shift, now - shift)
        }
        ComparisonPreset::WeekVsWeek => {
            let days_since_sunday = now.weekday().num_days_from_sunday() as i64;
            let start = start_of_day - Duration::days(days_since_sunday);
            let shift = Duration::days(7);
            (start, start - shift, now - shift)
        }
        ComparisonPreset::MonthVsMonth => {
            let first_of_month = now
                .date_naive()
                .with_day(1)
                .unwrap_or_else(|| now.date_naive())
                .and_time(NaiveTime::MIN)
                .and_utc();
            let month = Months::new(1);
            let previous_start = first_of_month
                .checked_sub_months(month)
                .unwrap_or(first_of_month - Duration::days(30));
            let previous_end = now
                .checked_sub_months(month)
                .unwrap_or(now - Duration::days(30));
            (first_of_month, previous_start, previous_end)
        }
    };

    ComparisonWindows {
        current: TimeWindow::new(Some(current_start), Some(now)),
        previous: TimeWindow::new(Some(previous_start), Some(previous_end)),
    }
}

/// Compare the average of a metric between two reading sets
pub fn compare(
    current: &[SensorReading],
    previous: &[SensorReading],
    metric: Metric,
) -> Option<MetricComparison> {
    if current.is_empty() || previous.is_empty() {
        return None;
    }

    let avg_current = mean(current, metric);
    let avg_previous = mean(previous, metric);
    if avg_previous == 0.0 {
        return None;
    }

    let change = (avg_current - avg_previous) / avg_previous * 100.0;
    let trend = if change > TREND_THRESHOLD_PERCENT {
        Trend::Up
    } else if change < -TREND_THRESHOLD_PERCENT {
        Trend::Down
    } else {
        Trend::Neutral
    };

    Some(MetricComparison {
        value: round_to(avg_current, metric.precision()),
        change: round_to(change, 1),
        trend,
    })
}

/// Compare all five metrics between two periods
pub fn compare_periods(
    preset: ComparisonPreset,
    windows: ComparisonWindows,
    current: &[SensorReading],
    previous: &[SensorReading],
) -> PeriodComparison {
    PeriodComparison {
        preset,
        current: windows.current,
        previous: windows.previous,
        rpm: compare(current, previous, Metric::Rpm),
        torque: compare(current, previous, Metric::Torque),
        maf: compare(current, previous, Metric::Maf),
        temperature: compare(current, previous, Metric::Temperature),
        fuel_consumption: compare(current, previous, Metric::FuelConsumption),
    }
}
