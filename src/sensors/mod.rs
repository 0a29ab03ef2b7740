pub mod drivers;
pub mod service;

use thiserror::Error;

pub use drivers::{FileSensor, SimulatedSensor};
pub use service::SamplingScheduler;

#[derive(Debug, Error)]
pub enum SensorError {
    /// A required sensor is absent or unusable. Fatal at startup.
    #[error("sensor {sensor} failed to initialise: {reason}")]
    Init { sensor: String, reason: String },

    /// A single read failed. The next sampling cycle retries implicitly.
    #[error("sensor {sensor} read failed: {reason}")]
    Read { sensor: String, reason: String },
}

/// One physical quantity from one transducer.
///
/// `read` is synchronous and bounded by the driver's own I/O timeout.
pub trait Sensor: Send {
    fn name(&self) -> &str;

    /// Probe the device once at boot.
    fn init(&mut self) -> Result<(), SensorError> {
        Ok(())
    }

    fn read(&mut self) -> Result<f64, SensorError>;
}

/// The set of sensors a node is built with. `pressure` is `None` on nodes
/// without a barometer.
pub struct SensorSuite {
    pub temperature: Box<dyn Sensor>,
    pub humidity: Box<dyn Sensor>,
    pub pressure: Option<Box<dyn Sensor>>,
}

impl SensorSuite {
    pub fn has_pressure(&self) -> bool {
        self.pressure.is_some()
    }

    /// Initialise every sensor, stopping at the first failure.
    pub fn init(&mut self) -> Result<(), SensorError> {
        self.temperature.init()?;
        self.humidity.init()?;
        if let Some(p) = self.pressure.as_mut() {
            p.init()?;
        }
        Ok(())
    }
}
