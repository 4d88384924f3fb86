//! The device server.
//!
//! A [`DeviceServer`] owns a table of request handlers and a sensor
//! registry. It implements [`Dispatch`], turning each inbound request into
//! exactly one reply, and [`Informable`], delivering informs to the
//! connected clients.

use crate::builtins;
use crate::connection::ClientConnection;
use crate::handler::{
    Dispatch, HandlerError, HandlerResult, Informable, RequestContext, RequestHandler,
};
use crate::restart::RestartSender;
use crate::sensors::SensorRegistry;
use katkit_core::protocol::{FAIL, INVALID};
use katkit_core::{Message, MessageKind, Sensor};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::panic::{self, AssertUnwindSafe};
use std::sync::RwLock;
use tracing::{debug, error, warn};

/// Builder for [`DeviceServer`].
#[derive(Debug)]
pub struct DeviceServerBuilder {
    name: String,
    version: String,
    handlers: BTreeMap<String, RequestHandler>,
    sensors: Vec<Sensor>,
    restart: Option<RestartSender>,
}

impl DeviceServerBuilder {
    fn new(name: impl Into<String>) -> Self {
        let handlers = builtins::handlers()
            .into_iter()
            .map(|handler| (handler.name().to_string(), handler))
            .collect();
        Self {
            name: name.into(),
            version: "0.1".to_string(),
            handlers,
            sensors: Vec::new(),
            restart: None,
        }
    }

    /// Set the device version.
    #[must_use]
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Register a request handler, replacing any handler of the same name.
    #[must_use]
    pub fn request<F>(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        handler: F,
    ) -> Self
    where
        F: Fn(&RequestContext<'_>, &Message) -> HandlerResult + Send + Sync + 'static,
    {
        let handler = RequestHandler::new(name, description, handler);
        self.handlers.insert(handler.name().to_string(), handler);
        self
    }

    /// Add a sensor.
    #[must_use]
    pub fn sensor(mut self, sensor: Sensor) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Attach a restart queue.
    #[must_use]
    pub fn restart_queue(mut self, sender: RestartSender) -> Self {
        self.restart = Some(sender);
        self
    }

    /// Build the server.
    #[must_use]
    pub fn build(self) -> DeviceServer {
        let sensors = SensorRegistry::new();
        for sensor in self.sensors {
            sensors.add(sensor);
        }
        DeviceServer {
            name: self.name,
            version: self.version,
            handlers: self.handlers,
            sensors,
            restart: self.restart,
            connections: RwLock::new(HashMap::new()),
        }
    }
}

/// A KATCP device server.
#[derive(Debug)]
pub struct DeviceServer {
    name: String,
    version: String,
    handlers: BTreeMap<String, RequestHandler>,
    sensors: SensorRegistry,
    restart: Option<RestartSender>,
    connections: RwLock<HashMap<u64, ClientConnection>>,
}

impl DeviceServer {
    /// Start building a server.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> DeviceServerBuilder {
        DeviceServerBuilder::new(name)
    }

    /// The device name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The device version.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }

    /// The sensor table.
    #[must_use]
    pub const fn sensors(&self) -> &SensorRegistry {
        &self.sensors
    }

    /// Look up a request handler.
    #[must_use]
    pub fn handler(&self, name: &str) -> Option<&RequestHandler> {
        self.handlers.get(name)
    }

    /// All request handlers in name order.
    pub fn handlers(&self) -> impl Iterator<Item = &RequestHandler> {
        self.handlers.values()
    }

    /// The attached restart queue, if any.
    #[must_use]
    pub const fn restart_sender(&self) -> Option<&RestartSender> {
        self.restart.as_ref()
    }

    /// Number of connected clients.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Run the handler for `msg` and produce its reply.
    ///
    /// Failures of any kind, panics included, become a `fail` reply. The
    /// reply always carries the request's correlation id.
    pub fn handle_request(
        &self,
        informer: &dyn Informable,
        connection: &ClientConnection,
        msg: &Message,
    ) -> Message {
        let Some(handler) = self.handlers.get(&msg.name) else {
            warn!(device = %self.name, request = %msg.name, "unknown request");
            return Message::reply_to(msg)
                .args([INVALID.to_string(), format!("Unknown request {}.", msg.name)]);
        };

        let ctx = RequestContext::new(self, connection, informer);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.call(&ctx, msg)));

        let mut reply = match outcome {
            Ok(Ok(reply)) => reply,
            Ok(Err(HandlerError::Fail(message))) => {
                debug!(request = %msg.name, %message, "request failed");
                Message::reply_to(msg).args([FAIL.to_string(), message])
            }
            Ok(Err(HandlerError::Unhandled(source))) => {
                error!(request = %msg.name, error = %source, "unhandled error in request handler");
                Message::reply_to(msg).args([FAIL.to_string(), source.to_string()])
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(request = %msg.name, %message, "request handler panicked");
                Message::reply_to(msg).args([FAIL.to_string(), message])
            }
        };
        reply.mid = msg.mid;
        reply
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "request handler panicked".to_string())
}

impl Dispatch for DeviceServer {
    fn dispatch(
        &self,
        informer: &dyn Informable,
        connection: &ClientConnection,
        msg: &Message,
    ) -> Option<Message> {
        match msg.kind {
            MessageKind::Request => Some(self.handle_request(informer, connection, msg)),
            MessageKind::Reply | MessageKind::Inform => {
                debug!(device = %self.name, %msg, "ignoring non-request message");
                None
            }
        }
    }

    fn connected(&self, connection: &ClientConnection) {
        if let Ok(mut connections) = self.connections.write() {
            connections.insert(connection.id(), connection.clone());
        }
    }

    fn disconnected(&self, connection_id: u64) {
        if let Ok(mut connections) = self.connections.write() {
            connections.remove(&connection_id);
        }
    }
}

impl Informable for DeviceServer {
    fn inform(&self, connection: &ClientConnection, msg: Message) {
        if !connection.send(msg) {
            debug!(connection = connection.id(), "dropping inform for closed connection");
        }
    }

    fn mass_inform(&self, msg: Message) {
        let Ok(connections) = self.connections.read() else {
            return;
        };
        for connection in connections.values() {
            connection.send(msg.clone());
        }
    }
}
