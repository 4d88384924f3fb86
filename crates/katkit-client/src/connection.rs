//! The connection reader task.

use crate::handler::{ClientHandler, FromTransport};
use katkit_transport::Transport;
use std::ops::Deref;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// A client attached to a running connection.
///
/// Owns the reader task that feeds inbound messages to the handler. The
/// task is aborted when the `Connection` is dropped. Dereferences to the
/// handler, so the client's own methods are available directly.
///
/// Must be created inside a tokio runtime.
pub struct Connection<H> {
    handler: Arc<H>,
    reader: JoinHandle<()>,
}

impl<H: ClientHandler + 'static> Connection<H> {
    /// Build the client from `transport` and start reading.
    pub fn start<T>(transport: T) -> Self
    where
        T: Transport + 'static,
        H: FromTransport<T>,
    {
        let transport = Arc::new(transport);
        let handler = H::from_transport(Arc::clone(&transport));
        Self::new(transport, handler)
    }

    /// Start reading from `transport` into an already built client.
    pub fn new<T>(transport: Arc<T>, handler: H) -> Self
    where
        T: Transport + 'static,
    {
        let handler = Arc::new(handler);
        let reader = tokio::spawn(read_loop(transport, Arc::clone(&handler)));
        Self { handler, reader }
    }
}

impl<H> Connection<H> {
    /// The shared client.
    #[must_use]
    pub const fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Check whether the reader task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.reader.is_finished()
    }
}

impl<H> Deref for Connection<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.handler
    }
}

impl<H> Drop for Connection<H> {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl<H> std::fmt::Debug for Connection<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

async fn read_loop<T, H>(transport: Arc<T>, handler: Arc<H>)
where
    T: Transport,
    H: ClientHandler,
{
    debug!("starting client reader");
    loop {
        match transport.recv().await {
            Ok(Some(msg)) => handler.handle_message(&msg),
            Ok(None) => {
                info!("connection closed by device");
                break;
            }
            Err(e) => {
                error!(error = %e, "transport error in client reader");
                break;
            }
        }
    }
    handler.on_disconnected();
    debug!("client reader stopped");
}
