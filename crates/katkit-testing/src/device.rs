//! A device double for exercising clients and the dispatch layer.
//!
//! [`DeviceTestServer`] answers four fixed requests:
//!
//! | Request | Behaviour |
//! |---|---|
//! | `new-command` | replies `ok param1 param2` |
//! | `raise-exception` | fails with an unsignaled error |
//! | `raise-fail` | fails with a signaled failure |
//! | `slow-command <seconds>` | sleeps, then replies `ok` |
//!
//! plus the standard device requests, and carries one integer sensor,
//! `an.int`. Every inbound message is logged before it is dispatched.
//!
//! [`InformCapture`] wraps any device and records the informs its handlers
//! send instead of delivering them.

use katkit_core::protocol::OK;
use katkit_core::{Message, Sensor, SensorStatus};
use katkit_server::{
    ClientConnection, DeviceServer, Dispatch, HandlerError, HandlerResult, Informable,
    RequestContext, RestartQueue,
};
use std::ops::Deref;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;

/// Failure message of `raise-fail`.
pub const RAISE_FAIL_MESSAGE: &str = "There was a problem with your request.";

/// Errors the device raises without signaling them.
#[derive(Debug, Error)]
pub enum DeviceFault {
    /// Raised by `raise-exception`.
    #[error("An exception occurred!")]
    Injected,
    /// `slow-command` was called without a duration.
    #[error("slow-command requires a duration in seconds")]
    MissingDuration,
}

/// The sensor every test device carries.
#[must_use]
pub fn sample_sensor() -> Sensor {
    Sensor::integer("an.int", "An Integer.", "count", -5, 5).with_reading(
        12345.0,
        SensorStatus::Nominal,
        "3",
    )
}

fn new_command(_ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
    Ok(Message::reply_to(msg).args([OK, "param1", "param2"]))
}

fn raise_exception(_ctx: &RequestContext<'_>, _msg: &Message) -> HandlerResult {
    Err(DeviceFault::Injected.into())
}

fn raise_fail(_ctx: &RequestContext<'_>, _msg: &Message) -> HandlerResult {
    Err(HandlerError::fail(RAISE_FAIL_MESSAGE))
}

fn slow_command(_ctx: &RequestContext<'_>, msg: &Message) -> HandlerResult {
    let seconds: f64 = msg
        .argument(0)
        .ok_or(DeviceFault::MissingDuration)?
        .parse()?;
    std::thread::sleep(Duration::try_from_secs_f64(seconds)?);
    Ok(Message::reply_to(msg).arg(OK))
}

/// A device with fault-injecting handlers and a message log.
#[derive(Debug)]
pub struct DeviceTestServer {
    server: DeviceServer,
    messages: RwLock<Vec<Message>>,
    restart_queue: RestartQueue,
}

impl DeviceTestServer {
    /// Create the device with its restart queue attached.
    #[must_use]
    pub fn new() -> Self {
        let restart_queue = RestartQueue::new();
        let server = DeviceServer::builder("device-test-server")
            .version("0.1")
            .sensor(sample_sensor())
            .request("new-command", "A new command.", new_command)
            .request(
                "raise-exception",
                "A handler which fails with an unexpected error.",
                raise_exception,
            )
            .request(
                "raise-fail",
                "A handler which signals a failure.",
                raise_fail,
            )
            .request(
                "slow-command",
                "A slow command, sleeps for the given number of seconds.",
                slow_command,
            )
            .restart_queue(restart_queue.sender())
            .build();
        Self {
            server,
            messages: RwLock::new(Vec::new()),
            restart_queue,
        }
    }

    /// Every message received, in arrival order.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.messages
            .read()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    /// Empty the message log.
    pub fn clear_messages(&self) {
        if let Ok(mut messages) = self.messages.write() {
            messages.clear();
        }
    }

    /// The queue `restart` requests are pushed onto.
    #[must_use]
    pub const fn restart_queue(&self) -> &RestartQueue {
        &self.restart_queue
    }
}

impl Default for DeviceTestServer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for DeviceTestServer {
    type Target = DeviceServer;

    fn deref(&self) -> &DeviceServer {
        &self.server
    }
}

impl Dispatch for DeviceTestServer {
    fn dispatch(
        &self,
        informer: &dyn Informable,
        connection: &ClientConnection,
        msg: &Message,
    ) -> Option<Message> {
        if let Ok(mut messages) = self.messages.write() {
            messages.push(msg.clone());
        }
        self.server.dispatch(informer, connection, msg)
    }

    fn connected(&self, connection: &ClientConnection) {
        self.server.connected(connection);
    }

    fn disconnected(&self, connection_id: u64) {
        self.server.disconnected(connection_id);
    }
}

impl Informable for DeviceTestServer {
    fn inform(&self, connection: &ClientConnection, msg: Message) {
        self.server.inform(connection, msg);
    }

    fn mass_inform(&self, msg: Message) {
        self.server.mass_inform(msg);
    }
}

/// A device wrapper that records informs instead of sending them.
#[derive(Debug)]
pub struct InformCapture<D> {
    device: D,
    informs: RwLock<Vec<Message>>,
}

impl<D> InformCapture<D> {
    /// Wrap `device`.
    pub fn new(device: D) -> Self {
        Self {
            device,
            informs: RwLock::new(Vec::new()),
        }
    }

    /// Informs captured so far, in order.
    #[must_use]
    pub fn informs(&self) -> Vec<Message> {
        self.informs
            .read()
            .map(|i| i.clone())
            .unwrap_or_default()
    }

    /// Forget captured informs.
    pub fn clear_informs(&self) {
        if let Ok(mut informs) = self.informs.write() {
            informs.clear();
        }
    }

    /// The wrapped device.
    pub const fn inner(&self) -> &D {
        &self.device
    }
}

impl<D: Dispatch> InformCapture<D> {
    /// Dispatch `msg`, capturing any informs it produces.
    pub fn handle(&self, connection: &ClientConnection, msg: &Message) -> Option<Message> {
        self.dispatch(self, connection, msg)
    }
}

impl<D: Send + Sync> Informable for InformCapture<D> {
    fn inform(&self, _connection: &ClientConnection, msg: Message) {
        if let Ok(mut informs) = self.informs.write() {
            informs.push(msg);
        }
    }

    fn mass_inform(&self, msg: Message) {
        if let Ok(mut informs) = self.informs.write() {
            informs.push(msg);
        }
    }
}

impl<D: Dispatch> Dispatch for InformCapture<D> {
    fn dispatch(
        &self,
        _informer: &dyn Informable,
        connection: &ClientConnection,
        msg: &Message,
    ) -> Option<Message> {
        self.device.dispatch(self, connection, msg)
    }

    fn connected(&self, connection: &ClientConnection) {
        self.device.connected(connection);
    }

    fn disconnected(&self, connection_id: u64) {
        self.device.disconnected(connection_id);
    }
}

impl<D> Deref for InformCapture<D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.device
    }
}
