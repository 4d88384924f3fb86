//! Error types for protocol operations.

use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// A boxed error type for wrapping arbitrary error sources.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced by protocol clients, servers and the types they share.
#[derive(Error, Diagnostic, Debug)]
pub enum KatcpError {
    /// A request was answered with a failure reply.
    #[error("Request '{name}' failed: {message}")]
    #[diagnostic(code(katcp::request::failed))]
    RequestFailed {
        /// The request name.
        name: String,
        /// The error text carried by the reply.
        message: String,
    },

    /// No handler is registered for the request.
    #[error("Unknown request: {name}")]
    #[diagnostic(code(katcp::request::unknown))]
    UnknownRequest {
        /// The request name.
        name: String,
    },

    /// The named sensor does not exist.
    #[error("Unknown sensor: {name}")]
    #[diagnostic(
        code(katcp::sensor::unknown),
        help("Check the device's sensor-list for available sensor names")
    )]
    UnknownSensor {
        /// The sensor name.
        name: String,
    },

    /// A string did not name a sensor type.
    #[error("Invalid sensor type: {value}")]
    #[diagnostic(code(katcp::sensor::invalid_type))]
    InvalidSensorType {
        /// The rejected literal.
        value: String,
    },

    /// A string did not name a sensor status.
    #[error("Invalid sensor status: {value}")]
    #[diagnostic(code(katcp::sensor::invalid_status))]
    InvalidSensorStatus {
        /// The rejected literal.
        value: String,
    },

    /// The connection closed before the operation completed.
    #[error("Connection closed")]
    #[diagnostic(code(katcp::transport::closed))]
    ConnectionClosed,

    /// The operation did not complete in time.
    #[error("{operation} timed out after {duration:?}")]
    #[diagnostic(code(katcp::transport::timeout))]
    Timeout {
        /// What was being waited for.
        operation: String,
        /// How long it waited.
        duration: Duration,
    },

    /// A transport-level failure.
    #[error("Transport error: {message}")]
    #[diagnostic(code(katcp::transport::error))]
    Transport {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if available.
        #[source]
        source: Option<BoxError>,
    },
}

impl KatcpError {
    /// Create a request failure error.
    pub fn request_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Create an unknown sensor error.
    pub fn unknown_sensor(name: impl Into<String>) -> Self {
        Self::UnknownSensor { name: name.into() }
    }

    /// Create a transport error with no source.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            source: None,
        }
    }

    /// Wrap an arbitrary transport error, keeping it as the source.
    pub fn transport_failure<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Transport {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }

    /// Check whether the error means the connection is gone.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::ConnectionClosed | Self::Transport { .. })
    }
}

/// A result type using [`KatcpError`].
pub type Result<T, E = KatcpError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = KatcpError::request_failed("raise-fail", "There was a problem with your request.");
        assert_eq!(
            err.to_string(),
            "Request 'raise-fail' failed: There was a problem with your request."
        );

        let err = KatcpError::Timeout {
            operation: "sensor-value".to_string(),
            duration: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "sensor-value timed out after 250ms");
    }

    #[test]
    fn test_is_disconnect() {
        assert!(KatcpError::ConnectionClosed.is_disconnect());
        assert!(KatcpError::transport("reset").is_disconnect());
        assert!(!KatcpError::unknown_sensor("x").is_disconnect());
    }
}
