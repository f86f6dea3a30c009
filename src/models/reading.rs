//! Engine sensor reading models
//!
//! Defines the persisted `SensorReading`, the validated `NewSensorReading`
//! used for inserts, and the lenient `IngestPayload` accepted over HTTP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::analytics::parse_instant;

/// RPM at or above which a reading is flagged when no alert status is supplied
pub const ALERT_RPM_THRESHOLD: f64 = 5000.0;

/// The five required engine metrics carried by every reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Rpm,
    Torque,
    Maf,
    Temperature,
    FuelConsumption,
}

impl Metric {
    /// All metrics in display order
    pub const ALL: [Metric; 5] = [
        Metric::Rpm,
        Metric::Torque,
        Metric::Maf,
        Metric::Temperature,
        Metric::FuelConsumption,
    ];

    /// Position of the metric in `Metric::ALL`
    pub fn index(self) -> usize {
        match self {
            Metric::Rpm => 0,
            Metric::Torque => 1,
            Metric::Maf => 2,
            Metric::Temperature => 3,
            Metric::FuelConsumption => 4,
        }
    }

    /// JSON field name of the metric
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Rpm => "rpm",
            Metric::Torque => "torque",
            Metric::Maf => "maf",
            Metric::Temperature => "temperature",
            Metric::FuelConsumption => "fuelConsumption",
        }
    }

    /// Parse a metric from its JSON field name
    pub fn from_name(name: &str) -> Option<Self> {
        Metric::ALL.into_iter().find(|m| m.as_str() == name)
    }

    /// Human readable label used in exports
    pub fn label(self) -> &'static str {
        match self {
            Metric::Rpm => "RPM",
            Metric::Torque => "Torque",
            Metric::Maf => "MAF",
            Metric::Temperature => "Temperature",
            Metric::FuelConsumption => "Fuel",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            Metric::Rpm => "RPM",
            Metric::Torque => "Nm",
            Metric::Maf => "g/s",
            Metric::Temperature => "°C",
            Metric::FuelConsumption => "L/h",
        }
    }

    /// Number of decimals aggregates of this metric are rounded to
    pub fn precision(self) -> i32 {
        match self {
            Metric::Rpm => 0,
            Metric::Torque => 1,
            Metric::Maf => 1,
            Metric::Temperature => 1,
            Metric::FuelConsumption => 2,
        }
    }
}

/// A persisted engine sensor sample
///
/// Immutable once stored. `id` is assigned by the store in creation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub rpm: f64,
    pub torque: f64,
    pub maf: f64,
    pub temperature: f64,
    pub fuel_consumption: f64,
    pub custom_sensor: Option<f64>,
    pub alert_status: bool,
}

impl SensorReading {
    /// Returns the value of one of the five required metrics
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rpm => self.rpm,
            Metric::Torque => self.torque,
            Metric::Maf => self.maf,
            Metric::Temperature => self.temperature,
            Metric::FuelConsumption => self.fuel_consumption,
        }
    }
}

/// A validated reading ready to be inserted
///
/// `timestamp` of `None` means "use insertion time".
#[derive(Debug, Clone, PartialEq)]
pub struct NewSensorReading {
    pub timestamp: Option<DateTime<Utc>>,
    pub rpm: f64,
    pub torque: f64,
    pub maf: f64,
    pub temperature: f64,
    pub fuel_consumption: f64,
    pub custom_sensor: Option<f64>,
    pub alert_status: bool,
}

impl NewSensorReading {
    /// Create a reading from the required metrics
    ///
    /// The alert status defaults to `rpm >= ALERT_RPM_THRESHOLD`.
    pub fn new(rpm: f64, torque: f64, maf: f64, temperature: f64, fuel_consumption: f64) -> Self {
        Self {
            timestamp: None,
            rpm,
            torque,
            maf,
            temperature,
            fuel_consumption,
            custom_sensor: None,
            alert_status: rpm >= ALERT_RPM_THRESHOLD,
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_custom_sensor(mut self, value: f64) -> Self {
        self.custom_sensor = Some(value);
        self
    }

    pub fn with_alert_status(mut self, alert_status: bool) -> Self {
        self.alert_status = alert_status;
        self
    }
}

/// Ingest validation error
#[derive(Error, Debug, PartialEq)]
pub enum IngestError {
    /// One or more required metrics are missing, non-numeric or non-finite
    #[error("Missing or invalid fields: {}", .0.join(", "))]
    InvalidFields(Vec<&'static str>),

    /// A timestamp was supplied but could not be parsed
    #[error("Invalid timestamp value")]
    InvalidTimestamp,
}

/// Raw ingest body as posted by sensor nodes
///
/// Metrics may arrive as JSON numbers or numeric strings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestPayload {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub rpm: Option<Value>,
    #[serde(default)]
    pub torque: Option<Value>,
    #[serde(default)]
    pub maf: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub fuel_consumption: Option<Value>,
    #[serde(default)]
    pub custom_sensor: Option<Value>,
    #[serde(default)]
    pub alert_status: Option<Value>,
}

impl IngestPayload {
    /// Validate the payload into a `NewSensorReading`
    ///
    /// Every missing or invalid required metric is reported at once.
    /// `alertStatus` is only honoured when it is a JSON boolean.
    pub fn validate(&self) -> Result<NewSensorReading, IngestError> {
        let required = [
            (Metric::Rpm, &self.rpm),
            (Metric::Torque, &self.torque),
            (Metric::Maf, &self.maf),
            (Metric::Temperature, &self.temperature),
            (Metric::FuelConsumption, &self.fuel_consumption),
        ];

        let mut values = [0.0_f64; 5];
        let mut invalid = Vec::new();
        for (metric, raw) in required {
            match raw.as_ref().and_then(parse_numeric) {
                Some(v) => values[metric.index()] = v,
                None => invalid.push(metric.as_str()),
            }
        }

        if !invalid.is_empty() {
            return Err(IngestError::InvalidFields(invalid));
        }

        let timestamp = match &self.timestamp {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(raw) => Some(parse_timestamp(raw).ok_or(IngestError::InvalidTimestamp)?),
        };

        let mut reading = NewSensorReading::new(
            values[Metric::Rpm.index()],
            values[Metric::Torque.index()],
            values[Metric::Maf.index()],
            values[Metric::Temperature.index()],
            values[Metric::FuelConsumption.index()],
        );
        reading.timestamp = timestamp;
        reading.custom_sensor = self.custom_sensor.as_ref().and_then(parse_numeric);
        if let Some(Value::Bool(flag)) = self.alert_status {
            reading.alert_status = flag;
        }

        Ok(reading)
    }
}

/// Parse a finite number from a JSON number or numeric string
fn parse_numeric(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if !s.trim().is_empty() => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

/// Parse a timestamp given as a date string or epoch milliseconds
fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_instant(s),
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    }
}
