//! Expected sensor values and setter cases.

use katkit_core::{BoxError, SensorStatus};
use std::fmt;
use std::time::Duration;

/// Decimal places used for float comparisons unless stated otherwise.
pub const DEFAULT_PLACES: u32 = 7;

/// The type a raw sensor value is coerced to before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueType {
    /// Compared as the raw string.
    #[default]
    Str,
    /// Parsed as a base-10 integer.
    Int,
    /// Parsed as a float and compared to a number of decimal places.
    Float,
    /// Parsed as a base-10 integer; nonzero is `true`.
    Bool,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        })
    }
}

/// A typed sensor value.
#[derive(Debug, Clone, PartialEq)]
pub enum SensorValue {
    /// A string value.
    Str(String),
    /// An integer value.
    Int(i64),
    /// A float value.
    Float(f64),
    /// A boolean value.
    Bool(bool),
}

impl SensorValue {
    /// Coerce a raw protocol value.
    ///
    /// Booleans go through integer parsing, so `"true"` is rejected with an
    /// integer parse error.
    pub fn parse(raw: &str, value_type: ValueType) -> Result<Self, BoxError> {
        Ok(match value_type {
            ValueType::Str => Self::Str(raw.to_string()),
            ValueType::Int => Self::Int(raw.parse()?),
            ValueType::Float => Self::Float(raw.parse()?),
            ValueType::Bool => Self::Bool(raw.parse::<i64>()? != 0),
        })
    }

    /// The type of this value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Str(_) => ValueType::Str,
            Self::Int(_) => ValueType::Int,
            Self::Float(_) => ValueType::Float,
            Self::Bool(_) => ValueType::Bool,
        }
    }

    /// Equality, rounding float differences to `places` decimal places.
    #[must_use]
    pub fn almost_equals(&self, other: &Self, places: u32) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => almost_equal(*a, *b, places),
            _ => self == other,
        }
    }

    /// Equality, requiring float differences strictly below `10^-places`.
    #[must_use]
    pub fn within_tolerance(&self, other: &Self, places: u32) -> bool {
        match (self, other) {
            (Self::Float(a), Self::Float(b)) => (a - b).abs() < 10f64.powi(-(places as i32)),
            _ => self == other,
        }
    }

    /// The value as a request parameter.
    #[must_use]
    pub fn to_param(&self) -> String {
        match self {
            Self::Str(s) => s.clone(),
            Self::Int(i) => i.to_string(),
            Self::Float(x) => x.to_string(),
            Self::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        }
    }
}

/// `a` and `b` agree once their difference is rounded to `places` decimal
/// places (ties to even).
#[must_use]
pub fn almost_equal(a: f64, b: f64, places: u32) -> bool {
    if a == b {
        return true;
    }
    ((a - b) * 10f64.powi(places as i32)).round_ties_even() == 0.0
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => write!(f, "'{s}'"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for SensorValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for SensorValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for SensorValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for SensorValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for SensorValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for SensorValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// An expected sensor value with its comparison precision.
///
/// Built from `(name, value)` or `(name, value, places)`; the type comes from
/// the value, a bare string meaning a string comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorValueTuple {
    /// The sensor name.
    pub name: String,
    /// The expected value.
    pub expected: SensorValue,
    /// Decimal places for float comparison. Ignored for other types.
    pub places: u32,
}

impl SensorValueTuple {
    /// Expect `name` to hold `expected`.
    pub fn new(name: impl Into<String>, expected: impl Into<SensorValue>) -> Self {
        Self {
            name: name.into(),
            expected: expected.into(),
            places: DEFAULT_PLACES,
        }
    }

    /// Compare floats to `places` decimal places.
    #[must_use]
    pub const fn places(mut self, places: u32) -> Self {
        self.places = places;
        self
    }

    /// The coercion type.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.expected.value_type()
    }
}

impl<V: Into<SensorValue>> From<(&str, V)> for SensorValueTuple {
    fn from((name, expected): (&str, V)) -> Self {
        Self::new(name, expected)
    }
}

impl<V: Into<SensorValue>> From<(&str, V, u32)> for SensorValueTuple {
    fn from((name, expected, places): (&str, V, u32)) -> Self {
        Self::new(name, expected).places(places)
    }
}

/// Extra expectations for one successful multi-setter call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MultiSetterOptions {
    /// Settle time on top of the client's sensor lag.
    pub delay: Duration,
    /// Sensor statuses to check after the call.
    pub statuses: Vec<(String, SensorStatus)>,
}

/// One successful multi-setter call and the sensor state it should produce.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedMultiSetterCase {
    /// Request parameters.
    pub params: Vec<String>,
    /// Expected sensor values afterwards.
    pub values: Vec<SensorValueTuple>,
    /// Delay and status expectations.
    pub options: MultiSetterOptions,
}

impl ExpectedMultiSetterCase {
    /// A case calling the request with `params`.
    pub fn new<I, S>(params: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            params: params.into_iter().map(Into::into).collect(),
            values: Vec::new(),
            options: MultiSetterOptions::default(),
        }
    }

    /// Expect a sensor value afterwards.
    #[must_use]
    pub fn value(mut self, expected: impl Into<SensorValueTuple>) -> Self {
        self.values.push(expected.into());
        self
    }

    /// Expect a sensor status afterwards.
    #[must_use]
    pub fn status(mut self, name: impl Into<String>, status: SensorStatus) -> Self {
        self.options.statuses.push((name.into(), status));
        self
    }

    /// Wait this much longer before checking.
    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.options.delay = delay;
        self
    }
}
