//! Client shapes against a live device over the memory transport.

use katkit_client::{
    BlockingClient, BlockingRequest, CallbackClient, Connection, DeviceClient,
};
use katkit_core::{KatcpError, Message, Sensor, SensorStatus};
use katkit_server::{DeviceServer, HandlerError, serve};
use katkit_transport::{MemoryTransport, Transport};
use pretty_assertions::assert_eq;
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn device() -> Arc<DeviceServer> {
    Arc::new(
        DeviceServer::builder("client-tests")
            .sensor(
                Sensor::integer("an.int", "An Integer.", "count", -5, 5).with_reading(
                    12345.0,
                    SensorStatus::Nominal,
                    "3",
                ),
            )
            .request("refuse", "Always fails.", |_ctx, _msg| {
                Err(HandlerError::fail("no"))
            })
            .request("nap", "Sleeps for a while.", |_ctx, msg| {
                std::thread::sleep(Duration::from_millis(200));
                Ok(Message::reply_to(msg).arg("ok"))
            })
            .build(),
    )
}

fn connect<H>() -> Connection<H>
where
    H: katkit_client::ClientHandler + katkit_client::FromTransport<MemoryTransport> + 'static,
{
    let (client_end, device_end) = MemoryTransport::pair();
    tokio::spawn(serve(device(), device_end));
    Connection::start(client_end)
}

#[tokio::test]
async fn test_blocking_request_collects_informs() {
    let client = connect::<BlockingClient<_>>();

    let (reply, informs) = client
        .blocking_request(Message::request("sensor-value").arg("an.int"))
        .await
        .unwrap();

    assert!(reply.reply_ok());
    assert_eq!(reply.mid.map(|m| m.get()), Some(1));
    assert_eq!(informs.len(), 1);
    assert_eq!(informs[0].argument(4), Some("3"));
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_blocking_request_reports_failure_reply() {
    let client = connect::<BlockingClient<_>>();

    let (reply, informs) = client
        .blocking_request(Message::request("refuse"))
        .await
        .unwrap();

    assert!(!reply.reply_ok());
    assert_eq!(reply.error_text(), Some("no"));
    assert!(informs.is_empty());
}

#[tokio::test]
async fn test_blocking_request_timeout() {
    let (client_end, device_end) = MemoryTransport::pair();
    tokio::spawn(serve(device(), device_end));
    let client_end = Arc::new(client_end);
    let client = Connection::new(
        Arc::clone(&client_end),
        BlockingClient::builder()
            .timeout(Duration::from_millis(20))
            .build(client_end),
    );

    let err = client
        .blocking_request(Message::request("nap"))
        .await
        .unwrap_err();
    assert!(matches!(err, KatcpError::Timeout { .. }));
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_disconnect_fails_pending_requests() {
    let (client_end, device_end) = MemoryTransport::pair();
    let client = Connection::<BlockingClient<_>>::start(client_end);

    let closer = tokio::spawn(async move {
        let request = device_end.recv().await.unwrap().unwrap();
        assert_eq!(request.name, "watchdog");
        device_end.close().await.unwrap();
    });

    let err = client
        .blocking_request(Message::request("watchdog"))
        .await
        .unwrap_err();
    assert!(err.is_disconnect());
    closer.await.unwrap();
}

#[tokio::test]
async fn test_unnumbered_replies_complete_oldest_request_first() {
    let (client_end, device_end) = MemoryTransport::pair();
    let client = Connection::<BlockingClient<_>>::start(client_end);

    let device = tokio::spawn(async move {
        for _ in 0..2 {
            device_end.recv().await.unwrap().unwrap();
        }
        for text in ["first", "second"] {
            device_end
                .send(Message::reply("watchdog").args(["ok", text]))
                .await
                .unwrap();
        }
    });

    let (newer, older) = tokio::join!(
        client.blocking_request(Message::request("watchdog").with_mid(7u64)),
        client.blocking_request(Message::request("watchdog").with_mid(3u64)),
    );
    device.await.unwrap();

    assert_eq!(older.unwrap().0.argument(1), Some("first"));
    assert_eq!(newer.unwrap().0.argument(1), Some("second"));
    assert_eq!(client.pending_count(), 0);
}

#[tokio::test]
async fn test_callback_client_invokes_callbacks() {
    let client = connect::<CallbackClient<_>>();
    let informs = Arc::new(Mutex::new(Vec::new()));
    let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();

    let seen = Arc::clone(&informs);
    client
        .callback_request_with_informs(
            Message::request("sensor-list"),
            move |reply| {
                let _ = reply_tx.send(reply);
            },
            move |inform| seen.lock().unwrap().push(inform.to_string()),
        )
        .await
        .unwrap();

    let reply = reply_rx.await.unwrap();
    assert!(reply.reply_ok());
    assert_eq!(
        *informs.lock().unwrap(),
        ["#sensor-list[1] an.int An\\_Integer. count integer -5 5"]
    );
    assert_eq!(client.outstanding(), 0);
}

#[tokio::test]
async fn test_device_client_sends_verbatim() {
    let (client_end, device_end) = MemoryTransport::pair();
    let client = Connection::<DeviceClient<_>>::start(client_end);

    client
        .send_message(Message::request("watchdog").with_mid(42u64))
        .await
        .unwrap();
    let mid = client.request(Message::request("help")).await.unwrap();

    assert_eq!(
        device_end.recv().await.unwrap().unwrap().to_string(),
        "?watchdog[42]"
    );
    assert_eq!(
        device_end.recv().await.unwrap().unwrap().mid,
        Some(mid)
    );
}
