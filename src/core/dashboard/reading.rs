//! Reading, sensor status and live snapshot types.
//!
//! Everything that crosses the transport boundary is decoded here. A `RawReading`
//! may have missing or null fields; a `Reading` never does.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

pub const FIELD_TIMESTAMP: &str = "timestamp";
pub const FIELD_TEMPERATURE: &str = "temperature";
pub const FIELD_HUMIDITY: &str = "humidity";
pub const FIELD_LIGHT_LEVEL: &str = "lightLevel";

/// Naive layouts accepted for string timestamps (interpreted as UTC)
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// One timestamped measurement, validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub light_level: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, temperature: f64, humidity: f64, light_level: f64) -> Self {
        Self {
            timestamp,
            temperature,
            humidity,
            light_level,
        }
    }

    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::LightLevel => self.light_level,
        }
    }

    /// All three metrics are finite numbers
    pub fn is_valid(&self) -> bool {
        Metric::ALL.iter().all(|&m| self.value(m).is_finite())
    }
}

/// The three measured quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Temperature,
    Humidity,
    LightLevel,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Temperature, Metric::Humidity, Metric::LightLevel];

    /// Wire key used by the telemetry server
    pub fn key(&self) -> &'static str {
        match self {
            Metric::Temperature => FIELD_TEMPERATURE,
            Metric::Humidity => FIELD_HUMIDITY,
            Metric::LightLevel => FIELD_LIGHT_LEVEL,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Temperature => "Temperature",
            Metric::Humidity => "Humidity",
            Metric::LightLevel => "Light Level",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Metric::Temperature => "°C",
            Metric::Humidity => "%",
            Metric::LightLevel => "",
        }
    }

    /// Sensor that produces this metric
    pub fn sensor(&self) -> &'static str {
        match self {
            Metric::Temperature | Metric::Humidity => SENSOR_DHT22,
            Metric::LightLevel => SENSOR_LDR,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Ok(Metric::Temperature),
            "humidity" | "hum" => Ok(Metric::Humidity),
            "lightlevel" | "light_level" | "light-level" | "light" => Ok(Metric::LightLevel),
            other => Err(format!("unknown metric '{}'", other)),
        }
    }
}

/// How strictly a live reading's metrics are checked before it is accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveReadingPolicy {
    /// Any zero, null or missing metric drops the reading (historic behavior)
    #[default]
    Truthy,
    /// Only missing, null or non-numeric metrics drop the reading; zero is accepted
    Presence,
}

impl FromStr for LiveReadingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "truthy" => Ok(LiveReadingPolicy::Truthy),
            "presence" => Ok(LiveReadingPolicy::Presence),
            other => Err(format!(
                "unknown live reading policy '{}' (expected 'truthy' or 'presence')",
                other
            )),
        }
    }
}

impl fmt::Display for LiveReadingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiveReadingPolicy::Truthy => f.write_str("truthy"),
            LiveReadingPolicy::Presence => f.write_str("presence"),
        }
    }
}

/// A reading as it arrives on the wire. JSON `null` and a missing key both decode to `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RawReading {
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub temperature: Option<Value>,
    #[serde(default)]
    pub humidity: Option<Value>,
    #[serde(default, rename = "lightLevel")]
    pub light_level: Option<Value>,
}

impl RawReading {
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| object.get(key).filter(|v| !v.is_null()).cloned();
        Self {
            timestamp: field(FIELD_TIMESTAMP),
            temperature: field(FIELD_TEMPERATURE),
            humidity: field(FIELD_HUMIDITY),
            light_level: field(FIELD_LIGHT_LEVEL),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        value
            .as_object()
            .map(Self::from_object)
            .ok_or(ValidationError::NotAnObject)
    }

    /// True when at least one metric key carries a value
    pub fn has_any_metric(&self) -> bool {
        self.temperature.is_some() || self.humidity.is_some() || self.light_level.is_some()
    }

    /// Validate into a historical reading: timestamp and all metrics must be present and finite.
    pub fn validate(&self) -> Result<Reading, ValidationError> {
        let timestamp = self
            .timestamp
            .as_ref()
            .ok_or(ValidationError::MissingField(FIELD_TIMESTAMP))
            .and_then(parse_timestamp)?;

        Ok(Reading {
            timestamp,
            temperature: metric_value(FIELD_TEMPERATURE, self.temperature.as_ref())?,
            humidity: metric_value(FIELD_HUMIDITY, self.humidity.as_ref())?,
            light_level: metric_value(FIELD_LIGHT_LEVEL, self.light_level.as_ref())?,
        })
    }

    /// Validate the metric values of a live reading under `policy`.
    pub fn live_metrics(&self, policy: LiveReadingPolicy) -> Result<LiveSnapshot, ValidationError> {
        let check = |field: &'static str, value: Option<&Value>| {
            let number = metric_value(field, value)?;
            if policy == LiveReadingPolicy::Truthy && number == 0.0 {
                return Err(ValidationError::Falsy(field));
            }
            Ok(number)
        };

        Ok(LiveSnapshot {
            temperature: check(FIELD_TEMPERATURE, self.temperature.as_ref())?,
            humidity: check(FIELD_HUMIDITY, self.humidity.as_ref())?,
            light_level: check(FIELD_LIGHT_LEVEL, self.light_level.as_ref())?,
        })
    }
}

fn metric_value(field: &'static str, value: Option<&Value>) -> Result<f64, ValidationError> {
    let value = value.ok_or(ValidationError::MissingField(field))?;
    let number = value.as_f64().ok_or(ValidationError::NotANumber(field))?;
    if !number.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    Ok(number)
}

/// Normalize a wire timestamp to a UTC instant.
///
/// Numbers are milliseconds since the Unix epoch. Strings are RFC 3339, or a naive
/// date-time which is taken as UTC.
pub fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, ValidationError> {
    match value {
        Value::Number(number) => {
            let millis = number
                .as_i64()
                .or_else(|| number.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .ok_or_else(|| ValidationError::InvalidTimestamp(number.to_string()))?;

            DateTime::from_timestamp_millis(millis)
                .ok_or_else(|| ValidationError::InvalidTimestamp(number.to_string()))
        }
        Value::String(text) => parse_timestamp_str(text),
        other => Err(ValidationError::InvalidTimestamp(other.to_string())),
    }
}

pub fn parse_timestamp_str(text: &str) -> Result<DateTime<Utc>, ValidationError> {
    let text = text.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| ValidationError::InvalidTimestamp(text.to_string()))
}

pub const SENSOR_DHT22: &str = "dht22";
pub const SENSOR_LDR: &str = "ldr";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorState {
    Active,
    #[default]
    Inactive,
}

impl SensorState {
    /// Anything other than `"active"` is treated as inactive
    pub fn from_wire(value: &Value) -> Self {
        match value.as_str() {
            Some(s) if s.eq_ignore_ascii_case("active") => SensorState::Active,
            _ => SensorState::Inactive,
        }
    }

    pub fn is_active(&self) -> bool {
        *self == SensorState::Active
    }
}

impl fmt::Display for SensorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorState::Active => f.write_str("active"),
            SensorState::Inactive => f.write_str("inactive"),
        }
    }
}

/// Full status map, replaced wholesale on every status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SensorStatus(BTreeMap<String, SensorState>);

impl SensorStatus {
    pub fn from_wire(object: &Map<String, Value>) -> Self {
        Self(
            object
                .iter()
                .map(|(sensor, state)| (sensor.clone(), SensorState::from_wire(state)))
                .collect(),
        )
    }

    /// State of `sensor`; unknown sensors read as inactive
    pub fn get(&self, sensor: &str) -> SensorState {
        self.0.get(sensor).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, SensorState)> {
        self.0.iter().map(|(name, state)| (name.as_str(), *state))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for SensorStatus {
    fn default() -> Self {
        Self(BTreeMap::from([
            (SENSOR_DHT22.to_string(), SensorState::Inactive),
            (SENSOR_LDR.to_string(), SensorState::Inactive),
        ]))
    }
}

impl<S: Into<String>> FromIterator<(S, SensorState)> for SensorStatus {
    fn from_iter<I: IntoIterator<Item = (S, SensorState)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Metric values of the most recent live reading
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub temperature: f64,
    pub humidity: f64,
    pub light_level: f64,
}

impl LiveSnapshot {
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Temperature => self.temperature,
            Metric::Humidity => self.humidity,
            Metric::LightLevel => self.light_level,
        }
    }
}
