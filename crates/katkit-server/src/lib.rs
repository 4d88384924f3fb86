//! Device server support for katkit.
//!
//! A device is a [`DeviceServer`] holding request handlers and sensors.
//! [`serve`] connects it to a client over any
//! [`Transport`](katkit_transport::Transport).
//!
//! # Example
//!
//! ```rust
//! use katkit_core::Message;
//! use katkit_server::{DeviceServer, HandlerError};
//!
//! let device = DeviceServer::builder("my-device")
//!     .version("1.0")
//!     .request("double", "Double a number.", |_ctx, msg| {
//!         let value: i64 = msg
//!             .argument(0)
//!             .ok_or_else(|| HandlerError::fail("missing value"))?
//!             .parse()?;
//!         Ok(Message::reply_to(msg).args(["ok".to_string(), (value * 2).to_string()]))
//!     })
//!     .build();
//!
//! assert!(device.handler("double").is_some());
//! assert!(device.handler("sensor-value").is_some());
//! ```

#![deny(missing_docs)]

mod builtins;
pub mod connection;
pub mod handler;
pub mod restart;
pub mod sensors;
pub mod serve;
pub mod server;

pub use connection::ClientConnection;
pub use handler::{
    Dispatch, HandlerError, HandlerResult, Informable, RequestContext, RequestHandler,
};
pub use restart::{RestartQueue, RestartRequest, RestartSender};
pub use sensors::SensorRegistry;
pub use serve::serve;
pub use server::{DeviceServer, DeviceServerBuilder};
