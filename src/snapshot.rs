use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

/// Latest environmental readings.
///
/// A field holds the last measured value or NaN when the most recent read of
/// that sensor failed (or no sample has been taken yet). `pressure` is `None`
/// on nodes built without a barometer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Degrees Celsius
    pub temperature: f64,
    /// Relative humidity percentage
    pub humidity: f64,
    /// Hectopascals
    pub pressure: Option<f64>,
    /// When the sampling cycle that produced this reading ran.
    pub sampled_at: Option<DateTime<Utc>>,
}

impl Reading {
    /// A reading with every present field marked as not-a-number.
    pub fn unsampled(with_pressure: bool) -> Self {
        Self {
            temperature: f64::NAN,
            humidity: f64::NAN,
            pressure: with_pressure.then_some(f64::NAN),
            sampled_at: None,
        }
    }

    /// True when no present field is NaN.
    pub fn is_complete(&self) -> bool {
        !self.temperature.is_nan()
            && !self.humidity.is_nan()
            && !self.pressure.is_some_and(f64::is_nan)
    }
}

/// Read side of the shared snapshot. Cheap to clone; handed to HTTP handlers.
#[derive(Debug, Clone)]
pub struct SensorSnapshot {
    inner: Arc<RwLock<Reading>>,
}

/// Write side of the shared snapshot. Not `Clone`: the sampling scheduler is
/// the only writer.
#[derive(Debug)]
pub struct SnapshotWriter {
    inner: Arc<RwLock<Reading>>,
}

impl SnapshotWriter {
    pub fn new(with_pressure: bool) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Reading::unsampled(with_pressure))),
        }
    }

    pub fn reader(&self) -> SensorSnapshot {
        SensorSnapshot {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Overwrite the snapshot in place.
    pub async fn update(&self, reading: Reading) {
        *self.inner.write().await = reading;
    }
}

impl SensorSnapshot {
    pub async fn latest(&self) -> Reading {
        *self.inner.read().await
    }
}
