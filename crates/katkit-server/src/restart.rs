//! Restart signaling.
//!
//! The `restart` request does not restart anything itself. It pushes a
//! [`RestartRequest`] onto a FIFO queue attached to the device, and whoever
//! owns the device (an application loop, or a test) decides what to do.

use tokio::sync::Mutex;
use tokio::sync::mpsc;

/// A pending restart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestartRequest {
    /// Connection that asked for the restart.
    pub connection_id: u64,
}

/// Sending side of a restart queue, held by the device.
pub type RestartSender = mpsc::UnboundedSender<RestartRequest>;

/// FIFO of restart requests.
#[derive(Debug)]
pub struct RestartQueue {
    sender: RestartSender,
    receiver: Mutex<mpsc::UnboundedReceiver<RestartRequest>>,
}

impl RestartQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// A sender to attach to a device.
    #[must_use]
    pub fn sender(&self) -> RestartSender {
        self.sender.clone()
    }

    /// Take the oldest pending restart without waiting.
    pub fn try_pop(&self) -> Option<RestartRequest> {
        self.receiver.try_lock().ok()?.try_recv().ok()
    }

    /// Wait for the next restart.
    pub async fn pop(&self) -> Option<RestartRequest> {
        self.receiver.lock().await.recv().await
    }
}

impl Default for RestartQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let queue = RestartQueue::new();
        assert!(queue.try_pop().is_none());

        let sender = queue.sender();
        sender.send(RestartRequest { connection_id: 1 }).unwrap();
        sender.send(RestartRequest { connection_id: 2 }).unwrap();

        assert_eq!(queue.try_pop().unwrap().connection_id, 1);
        assert_eq!(queue.pop().await.unwrap().connection_id, 2);
        assert!(queue.try_pop().is_none());
    }
}
