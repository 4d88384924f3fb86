//! Request handler types and device capabilities.
//!
//! A request handler is a function of `(context, request)` that either
//! returns its reply or fails:
//!
//! - [`HandlerError::Fail`] is a *signaled* failure. The dispatch layer turns
//!   it into `!name fail <message>`.
//! - [`HandlerError::Unhandled`] is any other error. Every
//!   `std::error::Error` converts into it, so a handler can simply use `?`.
//!   The dispatch layer logs it and still answers with a failure reply.
//!
//! Handlers never build failure replies themselves.

use crate::connection::ClientConnection;
use crate::server::DeviceServer;
use katkit_core::{BoxError, Message};
use std::fmt;
use std::sync::Arc;

/// Failure of a request handler.
#[derive(Debug)]
pub enum HandlerError {
    /// A deliberate failure reported to the client with this message.
    Fail(String),
    /// Any other error raised while handling the request.
    Unhandled(BoxError),
}

impl HandlerError {
    /// Create a signaled failure.
    pub fn fail(message: impl Into<String>) -> Self {
        Self::Fail(message.into())
    }

    /// The text carried by the failure reply.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Fail(message) => message.clone(),
            Self::Unhandled(source) => source.to_string(),
        }
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail(message) => write!(f, "request failed: {message}"),
            Self::Unhandled(source) => write!(f, "unhandled error: {source}"),
        }
    }
}

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Self::Unhandled(Box::new(err))
    }
}

/// Result of a request handler.
pub type HandlerResult = Result<Message, HandlerError>;

/// The function type of a request handler.
pub type RequestHandlerFn = dyn Fn(&RequestContext<'_>, &Message) -> HandlerResult + Send + Sync;

/// Everything a handler may touch while handling one request.
pub struct RequestContext<'a> {
    /// The device the request was sent to.
    pub server: &'a DeviceServer,
    /// The requesting connection.
    pub connection: &'a ClientConnection,
    informer: &'a dyn Informable,
}

impl<'a> RequestContext<'a> {
    /// Create a context routing informs through `informer`.
    pub fn new(
        server: &'a DeviceServer,
        connection: &'a ClientConnection,
        informer: &'a dyn Informable,
    ) -> Self {
        Self {
            server,
            connection,
            informer,
        }
    }

    /// Send an inform to the requesting client.
    pub fn inform(&self, msg: Message) {
        self.informer.inform(self.connection, msg);
    }

    /// Send an inform tied to `request` to the requesting client.
    pub fn reply_inform(&self, msg: Message, request: &Message) {
        self.informer.reply_inform(self.connection, msg, request);
    }

    /// Send an inform to every connected client.
    pub fn mass_inform(&self, msg: Message) {
        self.informer.mass_inform(msg);
    }
}

impl fmt::Debug for RequestContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("server", &self.server.name())
            .field("connection", &self.connection.id())
            .finish_non_exhaustive()
    }
}

/// A named request handler with help text.
#[derive(Clone)]
pub struct RequestHandler {
    name: String,
    description: String,
    handler: Arc<RequestHandlerFn>,
}

impl RequestHandler {
    /// Create a request handler.
    pub fn new<F>(name: impl Into<String>, description: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&RequestContext<'_>, &Message) -> HandlerResult + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            handler: Arc::new(handler),
        }
    }

    /// The request name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The help text.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Invoke the handler.
    pub fn call(&self, ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
        (self.handler)(ctx, msg)
    }
}

impl fmt::Debug for RequestHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestHandler")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("handler", &"<fn>")
            .finish()
    }
}

/// The capability of sending informs.
///
/// Handlers only send informs through this trait, which lets an adapter
/// capture them instead of delivering them.
pub trait Informable: Send + Sync {
    /// Send an inform to one client.
    fn inform(&self, connection: &ClientConnection, msg: Message);

    /// Send an inform tied to `request`, stamped with its correlation id.
    fn reply_inform(&self, connection: &ClientConnection, mut msg: Message, request: &Message) {
        msg.mid = request.mid;
        self.inform(connection, msg);
    }

    /// Send an inform to every connected client.
    fn mass_inform(&self, msg: Message);
}

/// The capability of dispatching inbound messages.
pub trait Dispatch: Send + Sync {
    /// Handle one inbound message, sending any informs through `informer`.
    ///
    /// Returns the reply for a request and `None` for anything else.
    fn dispatch(
        &self,
        informer: &dyn Informable,
        connection: &ClientConnection,
        msg: &Message,
    ) -> Option<Message>;

    /// Called when a client connects.
    fn connected(&self, _connection: &ClientConnection) {}

    /// Called when a client disconnects.
    fn disconnected(&self, _connection_id: u64) {}
}
