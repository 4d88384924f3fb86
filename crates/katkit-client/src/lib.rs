//! Clients for katkit devices.
//!
//! Three client shapes share one handling interface, [`ClientHandler`]:
//!
//! - [`DeviceClient`] sends requests and only logs what comes back.
//! - [`CallbackClient`] completes each request by invoking callbacks.
//! - [`BlockingClient`] suspends the caller until the reply arrives.
//!
//! A client is attached to a transport with [`Connection`], which owns the
//! reader task feeding it inbound messages.

#![deny(missing_docs)]

pub mod blocking;
pub mod callback;
pub mod connection;
pub mod device;
pub mod handler;

pub use blocking::{BlockingClient, BlockingClientBuilder, BlockingRequest, RequestOutcome};
pub use callback::CallbackClient;
pub use connection::Connection;
pub use device::DeviceClient;
pub use handler::{ClientHandler, FromTransport};

use katkit_core::MessageId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of correlation ids, starting at 1.
#[derive(Debug)]
pub(crate) struct MidCounter(AtomicU64);

impl MidCounter {
    pub(crate) fn next_mid(&self) -> MessageId {
        MessageId::new(self.0.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for MidCounter {
    fn default() -> Self {
        Self(AtomicU64::new(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mids_start_at_one() {
        let mids = MidCounter::default();
        assert_eq!(mids.next_mid().get(), 1);
        assert_eq!(mids.next_mid().get(), 2);
    }
}
