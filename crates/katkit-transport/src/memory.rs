//! Channel-backed transport for in-process peers.
//!
//! [`MemoryTransport::pair`] returns two linked ends, so a client and a
//! device can talk without sockets. Each direction delivers in send order,
//! and closing either end closes the link for both.
//!
//! # Example
//!
//! ```rust
//! use katkit_transport::{MemoryTransport, Transport};
//!
//! let (client_end, device_end) = MemoryTransport::pair();
//! assert!(client_end.is_connected() && device_end.is_connected());
//! assert_eq!(client_end.metadata().remote_addr.as_deref(), Some("device"));
//! ```

use crate::error::TransportError;
use crate::traits::{Transport, TransportMetadata};
use async_lock::Mutex as AsyncMutex;
use futures::StreamExt;
use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use katkit_core::Message;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

/// One end of an in-memory link.
pub struct MemoryTransport {
    outbound: UnboundedSender<Message>,
    inbound: AsyncMutex<UnboundedReceiver<Message>>,
    open: Arc<AtomicBool>,
    metadata: TransportMetadata,
}

impl MemoryTransport {
    /// Create a linked `(client, device)` pair.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let (to_device, from_client) = mpsc::unbounded();
        let (to_client, from_device) = mpsc::unbounded();
        let open = Arc::new(AtomicBool::new(true));

        let client = Self::end(to_device, from_device, Arc::clone(&open), "client", "device");
        let device = Self::end(to_client, from_client, open, "device", "client");
        (client, device)
    }

    fn end(
        outbound: UnboundedSender<Message>,
        inbound: UnboundedReceiver<Message>,
        open: Arc<AtomicBool>,
        local: &str,
        remote: &str,
    ) -> Self {
        Self {
            outbound,
            inbound: AsyncMutex::new(inbound),
            open,
            metadata: TransportMetadata::new("memory")
                .local_addr(local)
                .remote_addr(remote)
                .connected_now(),
        }
    }
}

impl Transport for MemoryTransport {
    type Error = TransportError;

    async fn send(&self, msg: Message) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        trace!(local = ?self.metadata.local_addr, %msg, "send");
        self.outbound
            .unbounded_send(msg)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv(&self) -> Result<Option<Message>, TransportError> {
        if !self.is_connected() {
            return Ok(None);
        }
        let next = self.inbound.lock().await.next().await;
        if next.is_none() {
            self.open.store(false, Ordering::SeqCst);
        }
        Ok(next)
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.open.store(false, Ordering::SeqCst);
        self.outbound.close_channel();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn metadata(&self) -> TransportMetadata {
        self.metadata.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pair_metadata() {
        let (client_end, device_end) = MemoryTransport::pair();

        assert_eq!(client_end.metadata().transport_type, "memory");
        assert_eq!(client_end.metadata().local_addr.as_deref(), Some("client"));
        assert_eq!(device_end.metadata().remote_addr.as_deref(), Some("client"));
        assert!(device_end.metadata().connected_at.is_some());
    }

    #[tokio::test]
    async fn test_each_direction_keeps_send_order() {
        let (client_end, device_end) = MemoryTransport::pair();

        client_end.send(Message::request("first")).await.unwrap();
        client_end.send(Message::request("second")).await.unwrap();
        assert_eq!(device_end.recv().await.unwrap().unwrap().name, "first");
        assert_eq!(device_end.recv().await.unwrap().unwrap().name, "second");

        device_end
            .send(Message::reply("first").arg("ok"))
            .await
            .unwrap();
        assert!(client_end.recv().await.unwrap().unwrap().reply_ok());
    }

    #[tokio::test]
    async fn test_closing_one_end_closes_both() {
        let (client_end, device_end) = MemoryTransport::pair();
        client_end.close().await.unwrap();

        assert!(!device_end.is_connected());
        assert!(matches!(
            client_end.send(Message::request("watchdog")).await,
            Err(TransportError::NotConnected)
        ));
        assert!(device_end.recv().await.unwrap().is_none());
    }
}
