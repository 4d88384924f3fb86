//! The callback-driven client.

use crate::handler::{ClientHandler, FromTransport};
use crate::MidCounter;
use katkit_core::protocol::FAIL;
use katkit_core::{KatcpError, Message, MessageId};
use katkit_transport::Transport;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

type ReplyCallback = Box<dyn FnOnce(Message) + Send>;
type InformCallback = Arc<dyn Fn(Message) + Send + Sync>;

struct Callbacks {
    name: String,
    on_reply: ReplyCallback,
    on_inform: Option<InformCallback>,
}

/// A client that completes each request by invoking callbacks.
///
/// Callbacks run on the connection reader task. If the connection ends
/// first, every outstanding reply callback receives a synthesized
/// `fail` reply.
pub struct CallbackClient<T> {
    transport: Arc<T>,
    mids: MidCounter,
    callbacks: Mutex<HashMap<MessageId, Callbacks>>,
}

impl<T: Transport> CallbackClient<T> {
    /// Create a client over `transport`.
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            mids: MidCounter::default(),
            callbacks: Mutex::new(HashMap::new()),
        }
    }

    /// Send a request and call `on_reply` with its reply.
    pub async fn callback_request<R>(&self, msg: Message, on_reply: R) -> Result<MessageId, KatcpError>
    where
        R: FnOnce(Message) + Send + 'static,
    {
        self.send_with(msg, Box::new(on_reply), None).await
    }

    /// Send a request, calling `on_inform` for each of its informs and
    /// `on_reply` with its reply.
    pub async fn callback_request_with_informs<R, I>(
        &self,
        msg: Message,
        on_reply: R,
        on_inform: I,
    ) -> Result<MessageId, KatcpError>
    where
        R: FnOnce(Message) + Send + 'static,
        I: Fn(Message) + Send + Sync + 'static,
    {
        self.send_with(msg, Box::new(on_reply), Some(Arc::new(on_inform)))
            .await
    }

    /// Number of requests still awaiting a reply.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.callbacks.lock().map(|c| c.len()).unwrap_or(0)
    }

    async fn send_with(
        &self,
        mut msg: Message,
        on_reply: ReplyCallback,
        on_inform: Option<InformCallback>,
    ) -> Result<MessageId, KatcpError> {
        let mid = *msg.mid.get_or_insert_with(|| self.mids.next_mid());
        self.register(
            mid,
            Callbacks {
                name: msg.name.clone(),
                on_reply,
                on_inform,
            },
        );
        debug!(%msg, "sending callback request");
        if let Err(e) = self.transport.send(msg).await {
            self.take(mid);
            return Err(KatcpError::transport_failure(e));
        }
        Ok(mid)
    }

    fn register(&self, mid: MessageId, callbacks: Callbacks) {
        if let Ok(mut map) = self.callbacks.lock() {
            map.insert(mid, callbacks);
        }
    }

    fn take(&self, mid: MessageId) -> Option<Callbacks> {
        self.callbacks.lock().ok()?.remove(&mid)
    }

    fn inform_callback(&self, mid: MessageId) -> Option<InformCallback> {
        self.callbacks
            .lock()
            .ok()?
            .get(&mid)
            .and_then(|c| c.on_inform.clone())
    }
}

impl<T: Transport> ClientHandler for CallbackClient<T> {
    fn handle_reply(&self, msg: &Message) {
        match msg.mid.and_then(|mid| self.take(mid)) {
            Some(callbacks) => (callbacks.on_reply)(msg.clone()),
            None => warn!(%msg, "reply matches no outstanding request"),
        }
    }

    fn handle_inform(&self, msg: &Message) {
        match msg.mid.and_then(|mid| self.inform_callback(mid)) {
            Some(on_inform) => on_inform(msg.clone()),
            None => debug!(%msg, "unsolicited inform"),
        }
    }

    fn on_disconnected(&self) {
        let outstanding: Vec<_> = self
            .callbacks
            .lock()
            .map(|mut map| map.drain().collect())
            .unwrap_or_default();
        for (mid, callbacks) in outstanding {
            let reply = Message::reply(callbacks.name)
                .with_mid(mid)
                .args([FAIL, "Connection closed before reply was received."]);
            (callbacks.on_reply)(reply);
        }
    }
}

impl<T: Transport> FromTransport<T> for CallbackClient<T> {
    fn from_transport(transport: Arc<T>) -> Self {
        Self::new(transport)
    }
}
