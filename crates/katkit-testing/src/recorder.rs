//! Message recording for any client shape.
//!
//! [`Recorder`] wraps a client and logs every reply and inform it receives
//! before handing the message on unchanged. It works with any type that
//! implements [`ClientHandler`], so the passive, callback and blocking
//! clients all gain the same observation methods:
//!
//! ```rust,no_run
//! use katkit_client::Connection;
//! use katkit_testing::DeviceTestClient;
//! use katkit_transport::MemoryTransport;
//!
//! # async fn example() {
//! let (transport, _device_end) = MemoryTransport::pair();
//! let client = Connection::<DeviceTestClient<_>>::start(transport);
//!
//! let (replies, informs) = client.replies_and_informs();
//! assert!(replies.is_empty() && informs.is_empty());
//! # }
//! ```

use katkit_client::{
    BlockingClient, BlockingRequest, CallbackClient, ClientHandler, DeviceClient, FromTransport,
    RequestOutcome,
};
use katkit_core::{KatcpError, Message};
use std::future::Future;
use std::ops::Deref;
use std::sync::{Arc, RwLock};
use tracing::trace;

#[derive(Debug, Default)]
struct MessageLog {
    replies: Vec<Message>,
    informs: Vec<Message>,
    all: Vec<Message>,
}

/// A client wrapper recording inbound replies and informs.
#[derive(Debug)]
pub struct Recorder<C> {
    inner: C,
    log: RwLock<MessageLog>,
}

impl<C> Recorder<C> {
    /// Wrap `inner` with empty logs.
    pub fn new(inner: C) -> Self {
        Self {
            inner,
            log: RwLock::new(MessageLog::default()),
        }
    }

    /// All recorded messages in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.log
            .read()
            .map(|log| log.all.clone())
            .unwrap_or_default()
    }

    /// Recorded replies and informs, each in arrival order.
    #[must_use]
    pub fn replies_and_informs(&self) -> (Vec<Message>, Vec<Message>) {
        self.log
            .read()
            .map(|log| (log.replies.clone(), log.informs.clone()))
            .unwrap_or_default()
    }

    /// Empty all logs at once.
    pub fn clear_messages(&self) {
        if let Ok(mut log) = self.log.write() {
            *log = MessageLog::default();
        }
    }

    /// The wrapped client.
    pub const fn inner(&self) -> &C {
        &self.inner
    }

    /// Unwrap the client, discarding the logs.
    pub fn into_inner(self) -> C {
        self.inner
    }

    fn record(&self, msg: &Message) {
        trace!(%msg, "recording");
        if let Ok(mut log) = self.log.write() {
            if msg.is_reply() {
                log.replies.push(msg.clone());
            } else {
                log.informs.push(msg.clone());
            }
            log.all.push(msg.clone());
        }
    }
}

impl<C: ClientHandler> ClientHandler for Recorder<C> {
    fn handle_reply(&self, msg: &Message) {
        self.record(msg);
        self.inner.handle_reply(msg);
    }

    fn handle_inform(&self, msg: &Message) {
        self.record(msg);
        self.inner.handle_inform(msg);
    }

    fn handle_request(&self, msg: &Message) {
        self.inner.handle_request(msg);
    }

    fn on_disconnected(&self) {
        self.inner.on_disconnected();
    }
}

impl<T, C: FromTransport<T>> FromTransport<T> for Recorder<C> {
    fn from_transport(transport: Arc<T>) -> Self {
        Self::new(C::from_transport(transport))
    }
}

impl<C: BlockingRequest> BlockingRequest for Recorder<C> {
    fn blocking_request(
        &self,
        request: Message,
    ) -> impl Future<Output = Result<RequestOutcome, KatcpError>> + Send {
        BlockingRequest::blocking_request(&self.inner, request)
    }
}

impl<C> Deref for Recorder<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

/// A recording passive client.
pub type DeviceTestClient<T> = Recorder<DeviceClient<T>>;

/// A recording callback client.
pub type CallbackTestClient<T> = Recorder<CallbackClient<T>>;

/// A recording blocking client, the base of
/// [`BlockingTestClient`](crate::BlockingTestClient).
pub type BlockingTestClientCore<T> = Recorder<BlockingClient<T>>;
