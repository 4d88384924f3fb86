//! The device's sensor table.

use katkit_core::{KatcpError, Sensor, SensorStatus};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Thread-safe sensor table, iterated in name order.
#[derive(Debug, Default)]
pub struct SensorRegistry {
    sensors: RwLock<BTreeMap<String, Sensor>>,
}

impl SensorRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a sensor.
    pub fn add(&self, sensor: Sensor) {
        if let Ok(mut sensors) = self.sensors.write() {
            sensors.insert(sensor.name.clone(), sensor);
        }
    }

    /// Snapshot one sensor.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Sensor> {
        self.sensors
            .read()
            .ok()
            .and_then(|sensors| sensors.get(name).cloned())
    }

    /// Update a sensor's reading.
    ///
    /// # Errors
    ///
    /// Returns [`KatcpError::UnknownSensor`] if no such sensor exists.
    pub fn set_reading(
        &self,
        name: &str,
        timestamp: f64,
        status: SensorStatus,
        value: impl Into<String>,
    ) -> Result<(), KatcpError> {
        let mut sensors = self
            .sensors
            .write()
            .map_err(|_| KatcpError::unknown_sensor(name))?;
        let sensor = sensors
            .get_mut(name)
            .ok_or_else(|| KatcpError::unknown_sensor(name))?;
        sensor.set(timestamp, status, value);
        Ok(())
    }

    /// Snapshot all sensors in name order.
    #[must_use]
    pub fn list(&self) -> Vec<Sensor> {
        self.sensors
            .read()
            .map(|sensors| sensors.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of sensors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Check if there are no sensors.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
