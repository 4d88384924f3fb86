//! Core types for the katkit device-control protocol toolkit.
//!
//! This crate provides the foundational types shared by clients, servers
//! and the test harness:
//!
//! - **Protocol messages**: [`Message`] with request, reply and inform roles,
//!   correlation ids and the canonical string form
//! - **Sensors**: [`Sensor`], [`SensorType`] and [`SensorStatus`]
//! - **Errors**: [`KatcpError`] with rich diagnostics
//!
//! # Example
//!
//! ```rust
//! use katkit_core::{Message, Sensor, SensorStatus};
//!
//! let sensor = Sensor::integer("an.int", "An Integer.", "count", -5, 5)
//!     .with_reading(12345.0, SensorStatus::Nominal, "3");
//!
//! let inform = Message::inform("sensor-value").args(sensor.value_arguments());
//! assert_eq!(inform.to_string(), "#sensor-value 12345 1 an.int nominal 3");
//! ```

#![deny(missing_docs)]

pub mod error;
pub mod protocol;
pub mod sensor;

pub use error::{BoxError, KatcpError};
pub use protocol::{Message, MessageId, MessageKind};
pub use sensor::{Reading, Sensor, SensorStatus, SensorType};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::error::{KatcpError, Result};
    pub use crate::protocol::{FAIL, INVALID, Message, MessageId, MessageKind, OK};
    pub use crate::sensor::{Sensor, SensorStatus, SensorType};
}
