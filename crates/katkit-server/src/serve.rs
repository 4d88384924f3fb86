//! Serving a device over a transport.

use crate::connection::ClientConnection;
use crate::handler::{Dispatch, Informable};
use katkit_core::KatcpError;
use katkit_transport::Transport;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info, warn};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Serve `device` to the single client at the other end of `transport`.
///
/// Inbound messages are handled one at a time in arrival order. Handlers
/// run on the blocking thread pool and may block freely. Informs and
/// replies share one ordered outbox, drained by a writer task.
///
/// Returns once the client disconnects.
///
/// # Errors
///
/// Returns an error if receiving from the transport fails.
pub async fn serve<D, T>(device: Arc<D>, transport: T) -> Result<(), KatcpError>
where
    D: Dispatch + Informable + 'static,
    T: Transport + 'static,
{
    let transport = Arc::new(transport);
    let (connection, mut outbox) =
        ClientConnection::new(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed));
    let connection_id = connection.id();
    device.connected(&connection);
    info!(connection = connection_id, "client connected");

    let writer_transport = Arc::clone(&transport);
    let writer = tokio::spawn(async move {
        while let Some(msg) = outbox.recv().await {
            if let Err(e) = writer_transport.send(msg).await {
                warn!(connection = connection_id, error = %e, "failed to send message");
                break;
            }
        }
    });

    let result = loop {
        match transport.recv().await {
            Ok(Some(msg)) => {
                debug!(connection = connection_id, %msg, "received");
                let worker_device = Arc::clone(&device);
                let worker_connection = connection.clone();
                let reply = tokio::task::spawn_blocking(move || {
                    worker_device.dispatch(worker_device.as_ref(), &worker_connection, &msg)
                })
                .await;
                match reply {
                    Ok(Some(reply)) => {
                        connection.send(reply);
                    }
                    Ok(None) => {}
                    Err(e) => error!(connection = connection_id, error = %e, "dispatch task failed"),
                }
            }
            Ok(None) => break Ok(()),
            Err(e) => break Err(KatcpError::transport_failure(e)),
        }
    };

    device.disconnected(connection_id);
    drop(connection);
    if let Err(e) = writer.await {
        warn!(connection = connection_id, error = %e, "writer task failed");
    }
    info!(connection = connection_id, "client disconnected");
    result
}
