//! Harness failures.

use crate::expect::ValueType;
use katkit_core::{BoxError, KatcpError};
use miette::Diagnostic;
use std::time::Duration;
use thiserror::Error;

/// A failed harness check.
///
/// Every assertion helper returns this on the first mismatch. Nothing in the
/// harness aggregates failures.
#[derive(Error, Diagnostic, Debug)]
pub enum HarnessError {
    /// Observed and expected state differ.
    #[error("{message}")]
    #[diagnostic(code(katkit::harness::assertion))]
    Assertion {
        /// Human-readable description of the mismatch.
        message: String,
    },

    /// A bounded wait ran out of time.
    #[error(
        "Timed out after {timeout:?} waiting for sensor '{sensor}' to become {expected}. Last value was {}.",
        .last.as_deref().unwrap_or("<none>")
    )]
    #[diagnostic(code(katkit::harness::timeout))]
    Timeout {
        /// The caller's timeout.
        timeout: Duration,
        /// The polled sensor.
        sensor: String,
        /// The awaited value.
        expected: String,
        /// The last observed value; `None` if no sample was taken.
        last: Option<String>,
    },

    /// A sensor value could not be coerced to the requested type.
    #[error("Could not parse value '{value}' of sensor '{sensor}' as {value_type}: {source}")]
    #[diagnostic(code(katkit::harness::value_parse))]
    ValueParse {
        /// The sensor the value came from.
        sensor: String,
        /// The raw value.
        value: String,
        /// The requested type.
        value_type: ValueType,
        /// The parse failure.
        #[source]
        source: BoxError,
    },

    /// A reply or inform lacked the arguments the harness reads.
    #[error("Malformed '{request}' response: {message}")]
    #[diagnostic(code(katkit::harness::malformed_reply))]
    MalformedReply {
        /// The request name.
        request: String,
        /// What was missing.
        message: String,
    },

    /// An expected-message pattern is not a valid regex.
    #[error("Invalid message pattern: {0}")]
    #[diagnostic(code(katkit::harness::pattern))]
    Pattern(#[from] regex::Error),

    /// The request itself could not be completed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Request(#[from] KatcpError),
}

impl HarnessError {
    /// Create an assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion {
            message: message.into(),
        }
    }

    /// Check whether this is an assertion failure (including timeouts).
    #[must_use]
    pub const fn is_assertion(&self) -> bool {
        matches!(self, Self::Assertion { .. } | Self::Timeout { .. })
    }
}
