use std::time::Duration;

use chrono::Utc;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::{Sensor, SensorSuite};
use crate::snapshot::{Reading, SnapshotWriter};

/// Edge-triggered periodic sampler.
///
/// Idle until `interval` has elapsed since the previous cycle (or since
/// construction), then reads every sensor once and returns to idle in the
/// same call. The timer restarts from the moment the cycle ran, so a stalled
/// loop produces one late cycle, never a burst.
pub struct SamplingScheduler {
    sensors: SensorSuite,
    snapshot: SnapshotWriter,
    interval: Duration,
    last: Instant,
    cycles: u64,
}

impl SamplingScheduler {
    pub fn new(sensors: SensorSuite, snapshot: SnapshotWriter, interval: Duration) -> Self {
        Self::starting_at(sensors, snapshot, interval, Instant::now())
    }

    pub fn starting_at(
        sensors: SensorSuite,
        snapshot: SnapshotWriter,
        interval: Duration,
        start: Instant,
    ) -> Self {
        Self {
            sensors,
            snapshot,
            interval,
            last: start,
            cycles: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sampling cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub async fn poll(&mut self) -> bool {
        self.poll_at(Instant::now()).await
    }

    /// Runs one sampling cycle if the interval has elapsed at `now`.
    /// Returns whether a cycle ran.
    pub async fn poll_at(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) < self.interval {
            return false;
        }
        self.last = now;
        self.sample().await;
        true
    }

    /// Reads every sensor and overwrites the snapshot. A failed read becomes
    /// NaN for that field only; there are no retries within a cycle.
    pub async fn sample(&mut self) -> Reading {
        let reading = Reading {
            temperature: read_or_nan(&mut *self.sensors.temperature),
            humidity: read_or_nan(&mut *self.sensors.humidity),
            pressure: self.sensors.pressure.as_mut().map(|p| read_or_nan(&mut **p)),
            sampled_at: Some(Utc::now()),
        };
        self.cycles += 1;

        debug!(
            temperature = reading.temperature,
            humidity = reading.humidity,
            pressure = ?reading.pressure,
            cycle = self.cycles,
            "Sensors sampled"
        );

        self.snapshot.update(reading).await;
        reading
    }
}

fn read_or_nan(sensor: &mut dyn Sensor) -> f64 {
    match sensor.read() {
        Ok(v) if v.is_finite() => v,
        Ok(v) => {
            warn!(sensor = sensor.name(), value = v, "Sensor returned a non-finite value");
            f64::NAN
        }
        Err(e) => {
            warn!(sensor = sensor.name(), error = %e, "Sensor read failed");
            f64::NAN
        }
    }
}
