//! Time range resolution
//!
//! Turns a preset name or explicit start/end strings into a concrete
//! `TimeWindow`. Malformed dates are never an error: the bound is dropped
//! and a warning is logged.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use tracing::{debug, warn};

use super::{TimeRange, TimeWindow};

/// Naive date-time layouts accepted besides RFC 3339, interpreted as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// A window together with the label it was resolved from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub window: TimeWindow,
    pub time_range: TimeRange,
}

/// Resolve a time-range request into a window
///
/// Explicit bounds win over the preset and label the range `custom`.
/// Known presets yield `[now - duration, now]`. Anything else, including
/// `all`, an unknown name or no preset at all, yields the unbounded window.
///
/// # Arguments
/// * `preset` - Preset name (`1h`, `24h`, `7d`, `30d`, `all`)
/// * `explicit_start` - Start bound as sent by the caller
/// * `explicit_end` - End bound as sent by the caller
/// * `now` - Reference instant for relative presets
pub fn resolve(
    preset: Option<&str>,
    explicit_start: Option<&str>,
    explicit_end: Option<&str>,
    now: DateTime<Utc>,
) -> ResolvedRange {
    let window = parse_window(explicit_start, explicit_end);
    if !window.is_unbounded() {
        return ResolvedRange {
            window,
            time_range: TimeRange::Custom,
        };
    }

    let range = match preset.filter(|p| !p.trim().is_empty()) {
        Some(name) => TimeRange::from_preset(name).unwrap_or_else(|| {
            debug!(preset = name, "unknown time range preset, using all time");
            TimeRange::All
        }),
        None => TimeRange::All,
    };

    let window = match range.to_seconds() {
        Some(secs) => TimeWindow::new(Some(now - Duration::seconds(secs)), Some(now)),
        None => TimeWindow::all(),
    };

    ResolvedRange {
        window,
        time_range: range,
    }
}

/// Build a window from optional start/end strings, dropping unparseable bounds
pub fn parse_window(start: Option<&str>, end: Option<&str>) -> TimeWindow {
    TimeWindow::new(
        start.and_then(|s| parse_bound("start", s)),
        end.and_then(|s| parse_bound("end", s)),
    )
}

fn parse_bound(bound: &'static str, raw: &str) -> Option<DateTime<Utc>> {
    if raw.trim().is_empty() {
        return None;
    }
    let parsed = parse_instant(raw);
    if parsed.is_none() {
        warn!(bound, value = raw, "ignoring malformed date bound");
    }
    parsed
}

/// Parse an instant from RFC 3339, a naive date-time or a plain date
///
/// Naive values are taken as UTC; a plain date means midnight UTC.
pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
