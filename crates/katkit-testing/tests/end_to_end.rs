//! The harness against a served test device over the memory transport.

use katkit_client::{BlockingClient, Connection};
use katkit_core::{KatcpError, Message, SensorStatus};
use katkit_server::{Dispatch, Informable, serve};
use katkit_testing::prelude::*;
use katkit_testing::{
    BlockingTestConnection, CallbackTestClient, DeviceTestClient, HarnessError, init_test_tracing,
};
use katkit_transport::MemoryTransport;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Client = BlockingTestClient<BlockingTestConnection<MemoryTransport>>;

fn start<D>(device: Arc<D>) -> Client
where
    D: Dispatch + Informable + 'static,
{
    init_test_tracing();
    let (client_end, device_end) = MemoryTransport::pair();
    tokio::spawn(serve(device, device_end));
    BlockingTestClient::connect(client_end)
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within one second");
}

#[tokio::test]
async fn test_sample_sensor() -> Result<(), HarnessError> {
    let client = start(Arc::new(DeviceTestServer::new()));

    client
        .assert_sensor_equals("an.int", 3, None, DEFAULT_PLACES)
        .await?;
    client
        .assert_sensor_equals("an.int", "3", None, DEFAULT_PLACES)
        .await?;
    client
        .assert_sensor_not_equal("an.int", 4, None, DEFAULT_PLACES)
        .await?;
    client
        .assert_sensor_status_equals("an.int", SensorStatus::Nominal, None)
        .await?;
    assert_eq!(
        client.get_sensor_value("an.int", ValueType::Bool).await?,
        SensorValue::Bool(true)
    );
    client
        .wait_until_sensor_equals(
            Duration::from_secs(1),
            "an.int",
            3,
            DEFAULT_PLACES,
            DEFAULT_POLL_INTERVAL,
        )
        .await?;
    client
        .test_sensor_list(
            &[&["an.int", "An Integer.", "count", "integer", "-5", "5"]],
            false,
        )
        .await?;
    Ok(())
}

#[tokio::test]
async fn test_unknown_sensor() {
    let client = start(Arc::new(DeviceTestServer::new()));
    let err = client
        .get_sensor_value("no.such", ValueType::Str)
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not retrieve sensor 'no.such': Unknown sensor name: no.such."
    );
}

#[tokio::test]
async fn test_fault_injection() -> Result<(), HarnessError> {
    let client = start(Arc::new(DeviceTestServer::new()));

    let (reply, informs) = client.assert_request_succeeds("new-command", &[]).await?;
    assert_eq!(reply.arguments, ["ok", "param1", "param2"]);
    assert!(informs.is_empty());

    let (reply, _) = client.assert_request_fails("raise-fail", &[]).await?;
    assert_eq!(
        reply.error_text(),
        Some("There was a problem with your request.")
    );

    let (reply, _) = client.assert_request_fails("raise-exception", &[]).await?;
    assert_eq!(reply.error_text(), Some("An exception occurred!"));

    let (reply, _) = client.assert_request_fails("no-such-request", &[]).await?;
    assert_eq!(reply.argument(0), Some("invalid"));

    // The device survives every failure.
    client.assert_request_succeeds("watchdog", &[]).await?;

    assert_msgs_like!(
        client.messages(),
        [
            ("!new-command[1]", "param2"),
            ("!raise-fail[2] fail", ""),
            ("!raise-exception[3] fail", ""),
            ("!no-such-request[4] invalid", ""),
            ("!watchdog[5]", "ok"),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_recorded_traffic() -> Result<(), HarnessError> {
    let device = Arc::new(DeviceTestServer::new());
    let client = start(Arc::clone(&device));

    client.get_sensor_value("an.int", ValueType::Int).await?;

    let (replies, informs) = client.replies_and_informs();
    assert_msgs_equal!(replies, ["!sensor-value[1] ok 1"]);
    assert_msgs_match!(informs, [r"#sensor-value\[1\] 12345 1 an\.int nominal 3$"]);
    assert_msgs_equal!(
        client.messages(),
        ["#sensor-value[1] 12345 1 an.int nominal 3", "!sensor-value[1] ok 1"]
    );
    assert_msgs_equal!(device.messages(), ["?sensor-value[1] an.int"]);

    client.clear_messages();
    device.clear_messages();
    assert!(client.messages().is_empty());
    assert!(device.messages().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_slow_command() -> Result<(), HarnessError> {
    let client = start(Arc::new(DeviceTestServer::new()));
    client.assert_request_succeeds("slow-command", &["0.05"]).await?;
    client.assert_request_fails("slow-command", &["soon"]).await?;
    assert_msgs_like!(
        client.messages(),
        [("!slow-command[1]", "ok"), ("!slow-command[2] fail", "")]
    );
    Ok(())
}

#[tokio::test]
async fn test_slow_command_against_client_timeout() {
    let (client_end, device_end) = MemoryTransport::pair();
    tokio::spawn(serve(Arc::new(DeviceTestServer::new()), device_end));
    let client = BlockingTestClient::connect_with(
        client_end,
        BlockingClient::builder().timeout(Duration::from_millis(50)),
    );

    let err = client
        .assert_request_succeeds("slow-command", &["0.5"])
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        HarnessError::Request(KatcpError::Timeout { .. })
    ));
}

#[tokio::test]
async fn test_restart_queue() -> Result<(), HarnessError> {
    let device = Arc::new(DeviceTestServer::new());
    let client = start(Arc::clone(&device));

    client.assert_request_succeeds("restart", &[]).await?;
    assert!(device.restart_queue().pop().await.is_some());
    assert!(device.restart_queue().try_pop().is_none());
    Ok(())
}

#[tokio::test]
async fn test_inform_capture_swallows_informs() {
    let device = Arc::new(InformCapture::new(DeviceTestServer::new()));
    let client = start(Arc::clone(&device));

    let err = client
        .get_sensor_value("an.int", ValueType::Int)
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::MalformedReply { .. }));

    assert_msgs_equal!(
        device.informs(),
        ["#sensor-value[1] 12345 1 an.int nominal 3"]
    );
    assert_msgs_equal!(client.messages(), ["!sensor-value[1] ok 1"]);
    assert_msgs_equal!(device.inner().messages(), ["?sensor-value[1] an.int"]);
}

#[tokio::test]
async fn test_passive_client_records() {
    let (client_end, device_end) = MemoryTransport::pair();
    tokio::spawn(serve(Arc::new(DeviceTestServer::new()), device_end));
    let client = Connection::<DeviceTestClient<_>>::start(client_end);

    client.request(Message::request("help").arg("new-command")).await.unwrap();
    eventually(|| client.messages().len() == 2).await;

    assert_msgs_equal!(
        client.messages(),
        ["#help[1] new-command A\\_new\\_command.", "!help[1] ok 1"]
    );
}

#[tokio::test]
async fn test_callback_client_records() {
    let (client_end, device_end) = MemoryTransport::pair();
    tokio::spawn(serve(Arc::new(DeviceTestServer::new()), device_end));
    let client = Connection::<CallbackTestClient<_>>::start(client_end);

    let replies = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&replies);
    client
        .callback_request(Message::request("new-command"), move |reply| {
            sink.lock().unwrap().push(reply);
        })
        .await
        .unwrap();
    eventually(|| !replies.lock().unwrap().is_empty()).await;

    assert_msgs_equal!(client.messages(), ["!new-command[1] ok param1 param2"]);
    assert_msgs_equal!(*replies.lock().unwrap(), ["!new-command[1] ok param1 param2"]);
}
