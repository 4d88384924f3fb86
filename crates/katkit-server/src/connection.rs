//! Per-client connection handles.

use katkit_core::Message;
use tokio::sync::mpsc;
use tracing::trace;

/// A handle for sending messages to one connected client.
///
/// Messages are queued on an outbox drained in order by the connection's
/// writer task, so informs sent while handling a request always precede
/// that request's reply on the wire.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    id: u64,
    outbox: mpsc::UnboundedSender<Message>,
}

impl ClientConnection {
    /// Create a connection handle and the receiving end of its outbox.
    #[must_use]
    pub fn new(id: u64) -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (outbox, rx) = mpsc::unbounded_channel();
        (Self { id, outbox }, rx)
    }

    /// The connection id.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Queue a message for the client.
    ///
    /// Returns `false` if the connection has already gone away.
    pub fn send(&self, msg: Message) -> bool {
        trace!(connection = self.id, %msg, "queueing outbound message");
        self.outbox.send(msg).is_ok()
    }

    /// Check if the writer side is still alive.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.outbox.is_closed()
    }
}
