//! The client handling capability.
//!
//! Every client shape implements [`ClientHandler`]. The connection reader
//! task owns an `Arc` of the handler and calls
//! [`handle_message`](ClientHandler::handle_message) once per inbound
//! message, in delivery order, never concurrently.
//!
//! Keeping this interface small is what lets wrappers (such as a message
//! recorder) be layered over any client by delegation.

use katkit_core::Message;
use std::sync::Arc;
use tracing::warn;

/// Handling of inbound messages.
pub trait ClientHandler: Send + Sync {
    /// Handle a reply.
    fn handle_reply(&self, _msg: &Message) {}

    /// Handle an inform.
    fn handle_inform(&self, _msg: &Message) {}

    /// Handle a request sent by the device.
    fn handle_request(&self, msg: &Message) {
        warn!(%msg, "ignoring request sent by device");
    }

    /// Called once when the connection ends.
    fn on_disconnected(&self) {}

    /// Route a message to the handler for its kind.
    fn handle_message(&self, msg: &Message) {
        if msg.is_reply() {
            self.handle_reply(msg);
        } else if msg.is_inform() {
            self.handle_inform(msg);
        } else {
            self.handle_request(msg);
        }
    }
}

/// Construction of a client over a shared transport.
pub trait FromTransport<T>: Sized {
    /// Create the client.
    fn from_transport(transport: Arc<T>) -> Self;
}
