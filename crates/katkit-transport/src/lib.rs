//! Transport layer for katkit.
//!
//! This crate defines the [`Transport`] abstraction used by clients and
//! devices, and an in-memory [`MemoryTransport`] pair for tests.

#![deny(missing_docs)]

pub mod error;
pub mod memory;
pub mod traits;

pub use error::TransportError;
pub use memory::MemoryTransport;
pub use traits::{Transport, TransportMetadata};
