//! CSV export of sensor readings
//!
//! Three sheets are available: the raw readings (`data`), a per-metric
//! summary with export metadata (`summary`) and a numbered series for
//! plotting (`charts`). Timestamps are written in UTC.

use std::io::Write;

use chrono::{DateTime, Utc};

use crate::analytics::calculator::{mean, round_to};
use crate::models::{Metric, SensorReading};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Column order of the data sheet, following the dashboard table
const DATA_COLUMNS: [Metric; 5] = [
    Metric::Torque,
    Metric::FuelConsumption,
    Metric::Rpm,
    Metric::Temperature,
    Metric::Maf,
];

/// Which sheet to export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExportSheet {
    #[default]
    Data,
    Summary,
    Charts,
}

impl ExportSheet {
    /// Parse a sheet name; unknown names are `None`
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "data" => Some(Self::Data),
            "summary" => Some(Self::Summary),
            "charts" => Some(Self::Charts),
            _ => None,
        }
    }
}

/// Attachment file name for an export made at `now`
pub fn export_filename(now: DateTime<Utc>) -> String {
    format!("EMSysData_{}.csv", now.format("%Y%m%d%H%M%S"))
}

/// Decimals used for a metric in the summary sheet
fn summary_precision(metric: Metric) -> usize {
    match metric {
        Metric::Torque | Metric::FuelConsumption => 2,
        Metric::Rpm => 0,
        Metric::Temperature | Metric::Maf => 1,
    }
}

fn column_header(metric: Metric) -> String {
    if metric.label() == metric.unit() {
        metric.label().to_string()
    } else {
        format!("{} ({})", metric.label(), metric.unit())
    }
}

fn fixed(value: f64, decimals: usize) -> String {
    format!("{:.*}", decimals, value)
}

/// Write one row per reading, in the given order
pub fn write_readings_csv<W: Write>(writer: W, readings: &[SensorReading]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["Timestamp".to_string()];
    header.extend(DATA_COLUMNS.iter().map(|m| column_header(*m)));
    wtr.write_record(&header)?;

    for reading in readings {
        let mut record = vec![reading.timestamp.format(TIMESTAMP_FORMAT).to_string()];
        record.extend(DATA_COLUMNS.iter().map(|m| reading.value(*m).to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Write the summary sheet for readings sorted oldest first
///
/// The "Current" column is the last reading in the slice.
pub fn write_summary_csv<W: Write>(
    writer: W,
    readings: &[SensorReading],
    exported_at: DateTime<Utc>,
) -> Result<(), csv::Error> {
    let mut wtr = csv::WriterBuilder::new().flexible(true).from_writer(writer);

    let duration_minutes = match (readings.first(), readings.last()) {
        (Some(first), Some(last)) => {
            (last.timestamp - first.timestamp).num_milliseconds() as f64 / 60_000.0
        }
        _ => 0.0,
    };

    wtr.write_record(["EMSys - Engine Monitoring System - Data Summary"])?;
    let export_date = exported_at.format(TIMESTAMP_FORMAT).to_string();
    let total = readings.len().to_string();
    let duration = format!("{} minutes", fixed(duration_minutes, 1));
    wtr.write_record(["Export Date", export_date.as_str()])?;
    wtr.write_record(["Total Records", total.as_str()])?;
    wtr.write_record(["Duration", duration.as_str()])?;
    wtr.write_record(["Parameter", "Current", "Average", "Minimum", "Maximum", "Unit"])?;

    if let Some(last) = readings.last() {
        for metric in DATA_COLUMNS {
            let decimals = summary_precision(metric);
            let values = readings.iter().map(|r| r.value(metric));
            let min = values.clone().fold(f64::INFINITY, f64::min);
            let max = values.fold(f64::NEG_INFINITY, f64::max);
            let avg = round_to(mean(readings, metric), decimals as i32);

            wtr.write_record(&[
                metric.label().to_string(),
                fixed(last.value(metric), decimals),
                fixed(avg, decimals),
                fixed(min, decimals),
                fixed(max, decimals),
                metric.unit().to_string(),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

/// Write the readings as a numbered series, starting at 1
pub fn write_chart_csv<W: Write>(writer: W, readings: &[SensorReading]) -> Result<(), csv::Error> {
    let mut wtr = csv::Writer::from_writer(writer);

    let mut header = vec!["Index".to_string()];
    header.extend(DATA_COLUMNS.iter().map(|m| column_header(*m)));
    wtr.write_record(&header)?;

    for (index, reading) in readings.iter().enumerate() {
        let mut record = vec![(index + 1).to_string()];
        record.extend(DATA_COLUMNS.iter().map(|m| reading.value(*m).to_string()));
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render a sheet into an in-memory CSV document
pub fn render(
    sheet: ExportSheet,
    readings: &[SensorReading],
    exported_at: DateTime<Utc>,
) -> Result<Vec<u8>, csv::Error> {
    let mut buf = Vec::new();
    match sheet {
        ExportSheet::Data => write_readings_csv(&mut buf, readings)?,
        ExportSheet::Summary => write_summary_csv(&mut buf, readings, exported_at)?,
        ExportSheet::Charts => write_chart_csv(&mut buf, readings)?,
    }
    Ok(buf)
}
