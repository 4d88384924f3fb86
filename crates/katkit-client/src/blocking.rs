//! The blocking client.
//!
//! [`BlockingClient::blocking_request`] suspends the caller until the
//! correlated reply arrives, and returns it together with every inform the
//! device sent for that request before replying.
//!
//! # Example
//!
//! ```rust,no_run
//! use katkit_client::{BlockingClient, BlockingRequest, Connection};
//! use katkit_core::Message;
//! use katkit_transport::MemoryTransport;
//!
//! # async fn example() -> Result<(), katkit_core::KatcpError> {
//! let (transport, _device_end) = MemoryTransport::pair();
//! let client = Connection::<BlockingClient<_>>::start(transport);
//!
//! let (reply, informs) = client
//!     .blocking_request(Message::request("sensor-value"))
//!     .await?;
//! println!("{reply} after {} informs", informs.len());
//! # Ok(())
//! # }
//! ```

use crate::connection::Connection;
use crate::handler::{ClientHandler, FromTransport};
use crate::MidCounter;
use futures::channel::oneshot;
use katkit_core::{KatcpError, Message, MessageId};
use katkit_transport::Transport;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// A reply and the informs that preceded it.
pub type RequestOutcome = (Message, Vec<Message>);

/// The blocking request primitive.
pub trait BlockingRequest: Send + Sync {
    /// Send `request` and wait for its reply and informs.
    fn blocking_request(
        &self,
        request: Message,
    ) -> impl Future<Output = Result<RequestOutcome, KatcpError>> + Send;
}

impl<H: BlockingRequest> BlockingRequest for Connection<H> {
    fn blocking_request(
        &self,
        request: Message,
    ) -> impl Future<Output = Result<RequestOutcome, KatcpError>> + Send {
        self.handler().blocking_request(request)
    }
}

struct PendingRequest {
    name: String,
    informs: Vec<Message>,
    done: oneshot::Sender<Result<RequestOutcome, KatcpError>>,
}

/// Builder for [`BlockingClient`].
#[derive(Debug, Clone, Default)]
pub struct BlockingClientBuilder {
    timeout: Option<Duration>,
}

impl BlockingClientBuilder {
    /// Fail requests that get no reply within `timeout`.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client over `transport`.
    pub fn build<T: Transport>(self, transport: Arc<T>) -> BlockingClient<T> {
        BlockingClient {
            transport,
            mids: MidCounter::default(),
            timeout: self.timeout,
            pending: Mutex::new(HashMap::new()),
        }
    }
}

/// A client whose requests wait for their replies.
pub struct BlockingClient<T> {
    transport: Arc<T>,
    mids: MidCounter,
    timeout: Option<Duration>,
    pending: Mutex<HashMap<MessageId, PendingRequest>>,
}

impl BlockingClient<()> {
    /// Start building a client.
    #[must_use]
    pub fn builder() -> BlockingClientBuilder {
        BlockingClientBuilder::default()
    }
}

impl<T: Transport> BlockingClient<T> {
    /// The per-request timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Number of requests awaiting replies.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    /// Send `request` and wait for its reply and informs.
    ///
    /// A correlation id is assigned if the request has none.
    pub async fn blocking_request(&self, mut request: Message) -> Result<RequestOutcome, KatcpError> {
        let mid = *request.mid.get_or_insert_with(|| self.mids.next_mid());
        let name = request.name.clone();
        let (done, completion) = oneshot::channel();
        self.register(
            mid,
            PendingRequest {
                name: name.clone(),
                informs: Vec::new(),
                done,
            },
        );

        debug!(%request, "sending blocking request");
        if let Err(e) = self.transport.send(request).await {
            self.take(mid);
            return Err(KatcpError::transport_failure(e));
        }

        let wait = async {
            match completion.await {
                Ok(outcome) => outcome,
                Err(_) => Err(KatcpError::ConnectionClosed),
            }
        };
        match self.timeout {
            None => wait.await,
            Some(duration) => match tokio::time::timeout(duration, wait).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    self.take(mid);
                    Err(KatcpError::Timeout {
                        operation: name,
                        duration,
                    })
                }
            },
        }
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

    fn register(&self, mid: MessageId, pending: PendingRequest) {
        if let Ok(mut map) = self.pending.lock() {
            map.insert(mid, pending);
        }
    }

    fn take(&self, mid: MessageId) -> Option<PendingRequest> {
        self.pending.lock().ok()?.remove(&mid)
    }

    /// Correlation id of the request `msg` belongs to.
    ///
    /// Messages without an id go to the oldest pending request of the same
    /// name, which holds the lowest id.
    fn correlate(map: &HashMap<MessageId, PendingRequest>, msg: &Message) -> Option<MessageId> {
        match msg.mid {
            Some(mid) => map.contains_key(&mid).then_some(mid),
            None => map
                .iter()
                .filter(|(_, pending)| pending.name == msg.name)
                .map(|(mid, _)| *mid)
                .min(),
        }
    }
}

impl<T: Transport> BlockingRequest for BlockingClient<T> {
    fn blocking_request(
        &self,
        request: Message,
    ) -> impl Future<Output = Result<RequestOutcome, KatcpError>> + Send {
        Self::blocking_request(self, request)
    }
}

impl<T: Transport> ClientHandler for BlockingClient<T> {
    fn handle_reply(&self, msg: &Message) {
        let pending = self.pending.lock().ok().and_then(|mut map| {
            let mid = Self::correlate(&map, msg)?;
            map.remove(&mid)
        });
        match pending {
            Some(pending) => {
                trace!(%msg, informs = pending.informs.len(), "completing request");
                if pending.done.send(Ok((msg.clone(), pending.informs))).is_err() {
                    debug!(%msg, "requester stopped waiting");
                }
            }
            None => warn!(%msg, "reply matches no pending request"),
        }
    }

    fn handle_inform(&self, msg: &Message) {
        let Ok(mut map) = self.pending.lock() else {
            return;
        };
        match Self::correlate(&map, msg).and_then(|mid| map.get_mut(&mid)) {
            Some(pending) => pending.informs.push(msg.clone()),
            None => trace!(%msg, "inform not tied to a pending request"),
        }
    }

    fn on_disconnected(&self) {
        let pending: Vec<_> = self
            .pending
            .lock()
            .map(|mut map| map.drain().map(|(_, p)| p).collect())
            .unwrap_or_default();
        for request in pending {
            debug!(request = %request.name, "failing pending request on disconnect");
            let _ = request.done.send(Err(KatcpError::ConnectionClosed));
        }
    }
}

impl<T: Transport> FromTransport<T> for BlockingClient<T> {
    fn from_transport(transport: Arc<T>) -> Self {
        BlockingClient::builder().build(transport)
    }
}
