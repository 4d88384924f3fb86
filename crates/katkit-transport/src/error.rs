//! Transport error types.

use katkit_core::KatcpError;
use thiserror::Error;

/// Errors that can occur during transport operations.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection was closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Transport is not connected.
    #[error("Not connected")]
    NotConnected,

    /// A message could not be handed to the peer.
    #[error("Send failed: {message}")]
    SendFailed {
        /// Description of the failure.
        message: String,
    },
}

impl From<TransportError> for KatcpError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionClosed => Self::ConnectionClosed,
            other => Self::Transport {
                message: other.to_string(),
                source: Some(Box::new(other)),
            },
        }
    }
}
