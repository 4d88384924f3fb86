//! Sensor data model.
//!
//! A sensor is a named, typed observable device property with a current
//! value, status and timestamp. Only what the protocol exposes is modelled
//! here: the `sensor-list` description and the `sensor-value` reading.

use crate::error::KatcpError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The declared type of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorType {
    /// Integer with `[min, max]` parameters.
    Integer,
    /// Float with `[min, max]` parameters.
    Float,
    /// Boolean, transmitted as `0` or `1`.
    Boolean,
    /// One of a set of discrete string values.
    Discrete,
    /// Line-replaceable-unit state (`nominal` or `error`).
    Lru,
    /// Free-form string.
    String,
    /// Timestamp in seconds.
    Timestamp,
    /// Network address.
    Address,
}

impl SensorType {
    /// The protocol name of the type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Discrete => "discrete",
            Self::Lru => "lru",
            Self::String => "string",
            Self::Timestamp => "timestamp",
            Self::Address => "address",
        }
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorType {
    type Err = KatcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(Self::Integer),
            "float" => Ok(Self::Float),
            "boolean" => Ok(Self::Boolean),
            "discrete" => Ok(Self::Discrete),
            "lru" => Ok(Self::Lru),
            "string" => Ok(Self::String),
            "timestamp" => Ok(Self::Timestamp),
            "address" => Ok(Self::Address),
            other => Err(KatcpError::InvalidSensorType {
                value: other.to_string(),
            }),
        }
    }
}

/// The status of a sensor reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorStatus {
    /// No reading yet.
    #[default]
    Unknown,
    /// Within normal operating range.
    Nominal,
    /// Outside nominal range, still usable.
    Warn,
    /// Not usable.
    Error,
    /// The sensor itself has failed.
    Failure,
    /// The sensor could not be reached.
    Unreachable,
    /// Not currently in use.
    Inactive,
}

impl SensorStatus {
    /// The protocol name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Nominal => "nominal",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Failure => "failure",
            Self::Unreachable => "unreachable",
            Self::Inactive => "inactive",
        }
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorStatus {
    type Err = KatcpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "nominal" => Ok(Self::Nominal),
            "warn" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            "failure" => Ok(Self::Failure),
            "unreachable" => Ok(Self::Unreachable),
            "inactive" => Ok(Self::Inactive),
            other => Err(KatcpError::InvalidSensorStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// A timestamped sensor reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Seconds since the epoch.
    pub timestamp: f64,
    /// Reading status.
    pub status: SensorStatus,
    /// Value in its protocol string form.
    pub value: String,
}

/// A device sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    /// Declared type.
    pub sensor_type: SensorType,
    /// Dotted sensor name, e.g. `an.int`.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// Units of the value.
    pub units: String,
    /// Type-specific parameters (bounds, discrete values).
    pub params: Vec<String>,
    /// Current reading.
    pub reading: Reading,
}

impl Sensor {
    /// Create a sensor with an unknown reading.
    pub fn new(
        sensor_type: SensorType,
        name: impl Into<String>,
        description: impl Into<String>,
        units: impl Into<String>,
    ) -> Self {
        Self {
            sensor_type,
            name: name.into(),
            description: description.into(),
            units: units.into(),
            params: Vec::new(),
            reading: Reading {
                timestamp: 0.0,
                status: SensorStatus::Unknown,
                value: default_value(sensor_type).to_string(),
            },
        }
    }

    /// Create an integer sensor bounded by `[min, max]`.
    pub fn integer(
        name: impl Into<String>,
        description: impl Into<String>,
        units: impl Into<String>,
        min: i64,
        max: i64,
    ) -> Self {
        Self::new(SensorType::Integer, name, description, units)
            .with_params([min.to_string(), max.to_string()])
    }

    /// Create a float sensor bounded by `[min, max]`.
    pub fn float(
        name: impl Into<String>,
        description: impl Into<String>,
        units: impl Into<String>,
        min: f64,
        max: f64,
    ) -> Self {
        Self::new(SensorType::Float, name, description, units)
            .with_params([min.to_string(), max.to_string()])
    }

    /// Replace the type-specific parameters.
    #[must_use]
    pub fn with_params<I, S>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = params.into_iter().map(Into::into).collect();
        self
    }

    /// Set the initial reading.
    #[must_use]
    pub fn with_reading(mut self, timestamp: f64, status: SensorStatus, value: impl Into<String>) -> Self {
        self.set(timestamp, status, value);
        self
    }

    /// Update the reading.
    pub fn set(&mut self, timestamp: f64, status: SensorStatus, value: impl Into<String>) {
        self.reading = Reading {
            timestamp,
            status,
            value: value.into(),
        };
    }

    /// Arguments of this sensor's `sensor-list` inform:
    /// `name description units type params...`.
    #[must_use]
    pub fn list_arguments(&self) -> Vec<String> {
        let mut arguments = vec![
            self.name.clone(),
            self.description.clone(),
            self.units.clone(),
            self.sensor_type.as_str().to_string(),
        ];
        arguments.extend(self.params.iter().cloned());
        arguments
    }

    /// Arguments of this sensor's `sensor-value` inform:
    /// `timestamp count name status value`.
    #[must_use]
    pub fn value_arguments(&self) -> Vec<String> {
        vec![
            self.reading.timestamp.to_string(),
            "1".to_string(),
            self.name.clone(),
            self.reading.status.as_str().to_string(),
            self.reading.value.clone(),
        ]
    }
}

fn default_value(sensor_type: SensorType) -> &'static str {
    match sensor_type {
        SensorType::Integer | SensorType::Boolean | SensorType::Timestamp => "0",
        SensorType::Float => "0.0",
        SensorType::Lru => "nominal",
        SensorType::Discrete | SensorType::String | SensorType::Address => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_type_and_status_names_roundtrip() {
        for ty in [
            SensorType::Integer,
            SensorType::Float,
            SensorType::Boolean,
            SensorType::Discrete,
            SensorType::Lru,
            SensorType::String,
            SensorType::Timestamp,
            SensorType::Address,
        ] {
            assert_eq!(ty.as_str().parse::<SensorType>().unwrap(), ty);
        }
        assert!("int".parse::<SensorType>().is_err());
        assert_eq!("warn".parse::<SensorStatus>().unwrap(), SensorStatus::Warn);
        assert!("ok".parse::<SensorStatus>().is_err());
    }

    #[test]
    fn test_integer_sensor_arguments() {
        let sensor = Sensor::integer("an.int", "An Integer.", "count", -5, 5).with_reading(
            12345.0,
            SensorStatus::Nominal,
            "3",
        );

        assert_eq!(
            sensor.list_arguments(),
            vec!["an.int", "An Integer.", "count", "integer", "-5", "5"]
        );
        assert_eq!(
            sensor.value_arguments(),
            vec!["12345", "1", "an.int", "nominal", "3"]
        );
    }

    #[test]
    fn test_new_sensor_is_unknown() {
        let sensor = Sensor::new(SensorType::Float, "a.float", "A float.", "V");
        assert_eq!(sensor.reading.status, SensorStatus::Unknown);
        assert_eq!(sensor.reading.value, "0.0");
    }
}
