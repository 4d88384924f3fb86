//! The blocking protocol test client.
//!
//! [`BlockingTestClient`] turns a blocking request primitive into sensor and
//! request assertions. Every helper returns `Err` on the first mismatch, so
//! tests read as a chain of `?`:
//!
//! ```rust,no_run
//! use katkit_testing::{BlockingTestClient, DeviceTestServer, DEFAULT_PLACES};
//! use katkit_transport::MemoryTransport;
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), katkit_testing::HarnessError> {
//! let (client_end, device_end) = MemoryTransport::pair();
//! tokio::spawn(katkit_server::serve(Arc::new(DeviceTestServer::new()), device_end));
//!
//! let client = BlockingTestClient::connect(client_end);
//! client.assert_sensor_equals("an.int", 3, None, DEFAULT_PLACES).await?;
//! client.assert_request_fails("raise-fail", &[]).await?;
//! # Ok(())
//! # }
//! ```

use crate::error::HarnessError;
use crate::expect::{ExpectedMultiSetterCase, SensorValue, SensorValueTuple, ValueType};
use crate::normalize::sensor_list_entry;
use crate::recorder::BlockingTestClientCore;
use katkit_client::{BlockingClientBuilder, BlockingRequest, Connection, RequestOutcome};
use katkit_core::{Message, SensorStatus};
use katkit_transport::Transport;
use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Placeholder in custom assertion messages replaced by the observed value.
pub const VALUE_PLACEHOLDER: &str = "{value}";

/// Poll interval of [`BlockingTestClient::wait_until_sensor_equals`] when
/// the caller has no better one.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

const SENSOR_VALUE: &str = "sensor-value";
const SENSOR_LIST: &str = "sensor-list";

// Positions in `#sensor-value timestamp count name status value`.
const STATUS_FIELD: usize = 3;
const VALUE_FIELD: usize = 4;

/// A recording blocking client over a running connection.
pub type BlockingTestConnection<T> = Connection<BlockingTestClientCore<T>>;

/// Sensor and request assertions over any blocking request primitive.
#[derive(Debug)]
pub struct BlockingTestClient<C> {
    client: C,
    sensor_lag: Duration,
}

impl<C> BlockingTestClient<C> {
    /// Wrap `client`.
    pub const fn new(client: C) -> Self {
        Self {
            client,
            sensor_lag: Duration::ZERO,
        }
    }

    /// Wait this long after a setter succeeds before checking its sensor.
    #[must_use]
    pub const fn sensor_lag(mut self, lag: Duration) -> Self {
        self.sensor_lag = lag;
        self
    }

    /// The wrapped client.
    pub const fn inner(&self) -> &C {
        &self.client
    }
}

impl<T: Transport + 'static> BlockingTestClient<BlockingTestConnection<T>> {
    /// Start a recording blocking client over `transport`.
    ///
    /// Requests never time out; see [`connect_with`](Self::connect_with).
    pub fn connect(transport: T) -> Self {
        Self::new(Connection::start(transport))
    }

    /// Start a recording blocking client configured by `builder`.
    pub fn connect_with(transport: T, builder: BlockingClientBuilder) -> Self {
        let transport = Arc::new(transport);
        let core = BlockingTestClientCore::new(builder.build(Arc::clone(&transport)));
        Self::new(Connection::new(transport, core))
    }
}

impl<C: BlockingRequest> BlockingTestClient<C> {
    async fn request(&self, name: &str, params: &[&str]) -> Result<RequestOutcome, HarnessError> {
        let request = Message::request(name).args(params.iter().copied());
        debug!(%request, "test request");
        Ok(self.client.blocking_request(request).await?)
    }

    async fn sensor_field(&self, name: &str, field: usize) -> Result<String, HarnessError> {
        let (reply, informs) = self.request(SENSOR_VALUE, &[name]).await?;
        if !reply.reply_ok() {
            return Err(HarnessError::assertion(format!(
                "Could not retrieve sensor '{name}': {}",
                reply.error_text().unwrap_or("no error text")
            )));
        }
        let inform = informs.first().ok_or_else(|| HarnessError::MalformedReply {
            request: SENSOR_VALUE.to_string(),
            message: format!("no inform received for sensor '{name}'"),
        })?;
        inform
            .argument(field)
            .map(str::to_string)
            .ok_or_else(|| HarnessError::MalformedReply {
                request: SENSOR_VALUE.to_string(),
                message: format!("inform '{inform}' has no argument {field}"),
            })
    }

    /// Fetch a sensor value and coerce it to `value_type`.
    pub async fn get_sensor_value(
        &self,
        name: &str,
        value_type: ValueType,
    ) -> Result<SensorValue, HarnessError> {
        let raw = self.sensor_field(name, VALUE_FIELD).await?;
        SensorValue::parse(&raw, value_type).map_err(|source| HarnessError::ValueParse {
            sensor: name.to_string(),
            value: raw,
            value_type,
            source,
        })
    }

    /// Fetch a sensor status.
    pub async fn get_sensor_status(&self, name: &str) -> Result<SensorStatus, HarnessError> {
        Ok(self.sensor_field(name, STATUS_FIELD).await?.parse()?)
    }

    /// Assert a sensor holds `expected`.
    ///
    /// Floats are compared to `places` decimal places. A custom `message`
    /// may contain [`VALUE_PLACEHOLDER`], which is replaced once by the
    /// observed value.
    pub async fn assert_sensor_equals(
        &self,
        name: &str,
        expected: impl Into<SensorValue>,
        message: Option<&str>,
        places: u32,
    ) -> Result<(), HarnessError> {
        let expected = expected.into();
        let got = self.get_sensor_value(name, expected.value_type()).await?;
        if got.almost_equals(&expected, places) {
            return Ok(());
        }
        Err(HarnessError::assertion(failure_message(message, &got, || {
            format!(
                "Value of sensor '{name}' is {got}. Expected {expected}{}.",
                precision(&expected, places)
            )
        })))
    }

    /// Assert a sensor does not hold `expected`.
    pub async fn assert_sensor_not_equal(
        &self,
        name: &str,
        expected: impl Into<SensorValue>,
        message: Option<&str>,
        places: u32,
    ) -> Result<(), HarnessError> {
        let expected = expected.into();
        let got = self.get_sensor_value(name, expected.value_type()).await?;
        if !got.almost_equals(&expected, places) {
            return Ok(());
        }
        Err(HarnessError::assertion(failure_message(message, &got, || {
            format!(
                "Value of sensor '{name}' is {got}. Expected a different value{}.",
                precision(&expected, places)
            )
        })))
    }

    /// Assert a sensor has `expected` status.
    pub async fn assert_sensor_status_equals(
        &self,
        name: &str,
        expected: SensorStatus,
        message: Option<&str>,
    ) -> Result<(), HarnessError> {
        let got = self.get_sensor_status(name).await?;
        if got == expected {
            return Ok(());
        }
        Err(HarnessError::assertion(match message {
            Some(message) => message.replacen(VALUE_PLACEHOLDER, got.as_str(), 1),
            None => format!("Status of sensor '{name}' is {got}. Expected {expected}."),
        }))
    }

    /// Assert every sensor holds its value, stopping at the first mismatch.
    pub async fn assert_sensors_equal<I>(&self, expected: I) -> Result<(), HarnessError>
    where
        I: IntoIterator,
        I::Item: Into<SensorValueTuple>,
    {
        let expected: Vec<SensorValueTuple> = expected.into_iter().map(Into::into).collect();
        for tuple in expected {
            self.assert_sensor_equals(&tuple.name, tuple.expected, None, tuple.places)
                .await?;
        }
        Ok(())
    }

    /// Assert no sensor holds its value, stopping at the first match.
    pub async fn assert_sensors_not_equal<I>(&self, expected: I) -> Result<(), HarnessError>
    where
        I: IntoIterator,
        I::Item: Into<SensorValueTuple>,
    {
        let expected: Vec<SensorValueTuple> = expected.into_iter().map(Into::into).collect();
        for tuple in expected {
            self.assert_sensor_not_equal(&tuple.name, tuple.expected, None, tuple.places)
                .await?;
        }
        Ok(())
    }

    /// Poll a sensor until it holds `value` or `timeout` passes.
    ///
    /// The deadline is fixed on entry. A sample is taken at every poll and
    /// the last sleep is shortened so that one lands on the deadline; a
    /// float matches when it is strictly within `10^-places`. When the
    /// deadline has already passed no sample is taken and the error reports
    /// no last value. A timeout past the end of the clock, such as
    /// `Duration::MAX`, waits without a deadline.
    pub async fn wait_until_sensor_equals(
        &self,
        timeout: Duration,
        name: &str,
        value: impl Into<SensorValue>,
        places: u32,
        poll_interval: Duration,
    ) -> Result<(), HarnessError> {
        let expected = value.into();
        // A timeout too large to represent never expires.
        let deadline = Instant::now().checked_add(timeout);
        let mut last = None;

        if deadline.is_none_or(|deadline| Instant::now() < deadline) {
            loop {
                let got = self.get_sensor_value(name, expected.value_type()).await?;
                if got.within_tolerance(&expected, places) {
                    return Ok(());
                }
                last = Some(got);

                let pause = match deadline {
                    Some(deadline) => {
                        let now = Instant::now();
                        if now >= deadline {
                            break;
                        }
                        poll_interval.min(deadline - now)
                    }
                    None => poll_interval,
                };
                tokio::time::sleep(pause).await;
            }
        }

        Err(HarnessError::Timeout {
            timeout,
            sensor: name.to_string(),
            expected: expected.to_string(),
            last: last.map(|v| v.to_string()),
        })
    }

    /// Assert the device describes exactly `expected` sensors.
    ///
    /// Each entry is `name description units type params...`. Float
    /// parameters compare by value, order is irrelevant, and descriptions
    /// are skipped when `ignore_descriptions` is set.
    pub async fn test_sensor_list(
        &self,
        expected: &[&[&str]],
        ignore_descriptions: bool,
    ) -> Result<(), HarnessError> {
        let (reply, informs) = self.request(SENSOR_LIST, &[]).await?;
        if !reply.reply_ok() {
            return Err(HarnessError::assertion(format!(
                "Could not list sensors: {}",
                reply.error_text().unwrap_or("no error text")
            )));
        }

        let actual = informs
            .iter()
            .map(|inform| sensor_list_entry(&inform.arguments, ignore_descriptions))
            .collect::<Result<BTreeSet<_>, _>>()?;
        let expected = expected
            .iter()
            .map(|fields| sensor_list_entry(fields, ignore_descriptions))
            .collect::<Result<BTreeSet<_>, _>>()?;
        if actual == expected {
            return Ok(());
        }

        let missing: Vec<String> = expected.difference(&actual).map(|e| e.join(" ")).collect();
        let unexpected: Vec<String> = actual.difference(&expected).map(|e| e.join(" ")).collect();
        Err(HarnessError::assertion(format!(
            "Sensor list differs. Missing: [{}]. Unexpected: [{}].",
            missing.join("; "),
            unexpected.join("; ")
        )))
    }

    /// Assert a request succeeds, returning its reply and informs.
    pub async fn assert_request_succeeds(
        &self,
        name: &str,
        params: &[&str],
    ) -> Result<RequestOutcome, HarnessError> {
        let (reply, informs) = self.request(name, params).await?;
        if reply.reply_ok() {
            return Ok((reply, informs));
        }
        Err(HarnessError::assertion(format!(
            "Expected request '{}' to succeed, but it failed: {}",
            describe(name, params),
            reply.error_text().unwrap_or("no error text")
        )))
    }

    /// Assert a request fails, returning its reply and informs.
    pub async fn assert_request_fails(
        &self,
        name: &str,
        params: &[&str],
    ) -> Result<RequestOutcome, HarnessError> {
        let (reply, informs) = self.request(name, params).await?;
        if !reply.reply_ok() {
            return Ok((reply, informs));
        }
        Err(HarnessError::assertion(format!(
            "Expected request '{}' to fail, but it succeeded.",
            describe(name, params)
        )))
    }

    /// Check a request that sets one sensor.
    ///
    /// Each good value must be accepted and show up on `sensor` once the
    /// sensor lag has passed; each bad value must be refused.
    pub async fn test_setter_request<I>(
        &self,
        request: &str,
        sensor: &str,
        good: I,
        bad: &[&str],
        places: u32,
    ) -> Result<(), HarnessError>
    where
        I: IntoIterator,
        I::Item: Into<SensorValue>,
    {
        let good: Vec<SensorValue> = good.into_iter().map(Into::into).collect();
        for value in good {
            let param = value.to_param();
            self.assert_request_succeeds(request, &[param.as_str()]).await?;
            self.settle(Duration::ZERO).await;
            let called = invocation(request, &[param.as_str()]);
            let message = format!(
                "After request '{called}' sensor '{sensor}' should be {value}, got {VALUE_PLACEHOLDER}."
            );
            self.assert_sensor_equals(sensor, value, Some(&message), places)
                .await?;
        }
        for value in bad {
            self.assert_request_fails(request, &[value]).await?;
        }
        Ok(())
    }

    /// Check a request that may set several sensor values and statuses.
    pub async fn test_multi_setter_request(
        &self,
        request: &str,
        good: &[ExpectedMultiSetterCase],
        bad: &[&[&str]],
    ) -> Result<(), HarnessError> {
        for case in good {
            let params: Vec<&str> = case.params.iter().map(String::as_str).collect();
            self.assert_request_succeeds(request, &params).await?;
            self.settle(case.options.delay).await;

            let called = invocation(request, &params);
            for tuple in &case.values {
                let message = format!(
                    "After request '{called}' sensor '{}' should be {}, got {VALUE_PLACEHOLDER}.",
                    tuple.name, tuple.expected
                );
                self.assert_sensor_equals(
                    &tuple.name,
                    tuple.expected.clone(),
                    Some(&message),
                    tuple.places,
                )
                .await?;
            }
            for (name, status) in &case.options.statuses {
                let message = format!(
                    "After request '{called}' sensor '{name}' status should be {status}, got {VALUE_PLACEHOLDER}."
                );
                self.assert_sensor_status_equals(name, *status, Some(&message))
                    .await?;
            }
        }
        for params in bad {
            self.assert_request_fails(request, params).await?;
        }
        Ok(())
    }

    async fn settle(&self, extra: Duration) {
        let delay = self.sensor_lag + extra;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl<C> Deref for BlockingTestClient<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.client
    }
}

fn failure_message(
    custom: Option<&str>,
    got: &SensorValue,
    default: impl FnOnce() -> String,
) -> String {
    match custom {
        Some(message) => message.replacen(VALUE_PLACEHOLDER, &got.to_string(), 1),
        None => default(),
    }
}

fn invocation(request: &str, params: &[&str]) -> String {
    std::iter::once(request)
        .chain(params.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

fn precision(expected: &SensorValue, places: u32) -> String {
    match expected {
        SensorValue::Float(_) => format!(" (within {places} decimal places)"),
        _ => String::new(),
    }
}

fn describe(name: &str, params: &[&str]) -> String {
    std::iter::once(name)
        .chain(params.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
