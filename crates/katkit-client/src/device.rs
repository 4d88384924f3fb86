//! The passive client.

use crate::handler::{ClientHandler, FromTransport};
use crate::MidCounter;
use katkit_core::{KatcpError, Message, MessageId};
use katkit_transport::Transport;
use std::sync::Arc;
use tracing::debug;

/// A client that sends requests and only logs what comes back.
pub struct DeviceClient<T> {
    transport: Arc<T>,
    mids: MidCounter,
}

impl<T: Transport> DeviceClient<T> {
    /// Create a client over `transport`.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            mids: MidCounter::default(),
        }
    }

    /// Send a request, assigning a correlation id if it has none.
    ///
    /// Returns the correlation id the reply will carry.
    pub async fn request(&self, mut msg: Message) -> Result<MessageId, KatcpError> {
        let mid = *msg.mid.get_or_insert_with(|| self.mids.next_mid());
        debug!(%msg, "sending request");
        self.send_message(msg).await?;
        Ok(mid)
    }

    /// Send a message exactly as given.
    pub async fn send_message(&self, msg: Message) -> Result<(), KatcpError> {
        self.transport
            .send(msg)
            .await
            .map_err(KatcpError::transport_failure)
    }

    /// Close the transport.
    pub async fn close(&self) -> Result<(), KatcpError> {
        self.transport
            .close()
            .await
            .map_err(KatcpError::transport_failure)
    }

    /// Check if the transport is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }
}

impl<T: Transport> ClientHandler for DeviceClient<T> {
    fn handle_reply(&self, msg: &Message) {
        debug!(%msg, "reply");
    }

    fn handle_inform(&self, msg: &Message) {
        debug!(%msg, "inform");
    }
}

impl<T: Transport> FromTransport<T> for DeviceClient<T> {
    fn from_transport(transport: Arc<T>) -> Self {
        Self::new(transport)
    }
}
