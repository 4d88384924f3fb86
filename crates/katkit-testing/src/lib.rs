//! Test harness for katkit clients and devices.
//!
//! - [`Recorder`] adds inbound message logs to any client shape
//! - [`BlockingTestClient`] asserts on sensors and requests, and polls
//!   sensors with a deadline
//! - [`DeviceTestServer`] is a device double with fault-injecting handlers
//! - [`InformCapture`] records the informs a device's handlers send
//! - [`assertions`] compares message sequences exactly, by pattern or by
//!   prefix and suffix
//! - [`logging`] installs and captures `tracing` output
//!
//! # Example
//!
//! ```rust
//! use katkit_testing::prelude::*;
//! use katkit_transport::MemoryTransport;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), HarnessError> {
//! let (client_end, device_end) = MemoryTransport::pair();
//! tokio::spawn(katkit_server::serve(Arc::new(DeviceTestServer::new()), device_end));
//!
//! let client = BlockingTestClient::connect(client_end);
//! client.assert_request_succeeds("new-command", &[]).await?;
//! assert_msgs_equal!(client.messages(), ["!new-command[1] ok param1 param2"]);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

pub mod assertions;
pub mod client;
pub mod device;
pub mod error;
pub mod expect;
pub mod logging;
pub mod normalize;
pub mod recorder;

pub use client::{
    BlockingTestClient, BlockingTestConnection, DEFAULT_POLL_INTERVAL, VALUE_PLACEHOLDER,
};
pub use device::{DeviceFault, DeviceTestServer, InformCapture};
pub use error::HarnessError;
pub use expect::{
    DEFAULT_PLACES, ExpectedMultiSetterCase, MultiSetterOptions, SensorValue, SensorValueTuple,
    ValueType,
};
pub use logging::{LogCapture, init_test_tracing};
pub use recorder::{BlockingTestClientCore, CallbackTestClient, DeviceTestClient, Recorder};

/// Prelude for harness-based tests.
pub mod prelude {
    pub use crate::client::{BlockingTestClient, DEFAULT_POLL_INTERVAL};
    pub use crate::device::{DeviceTestServer, InformCapture};
    pub use crate::error::HarnessError;
    pub use crate::expect::{DEFAULT_PLACES, ExpectedMultiSetterCase, SensorValue, ValueType};
    pub use crate::recorder::Recorder;
    pub use crate::{assert_msgs_equal, assert_msgs_like, assert_msgs_match};
    pub use katkit_core::{Message, SensorStatus};
}
