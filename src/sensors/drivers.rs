//! Host-side sensor collaborators.
//!
//! `SimulatedSensor` produces a slow deterministic wave around a base value
//! for bench setups; `FileSensor` reads a numeric value from a file, which
//! covers Linux hwmon/IIO attributes such as
//! `/sys/bus/iio/devices/iio:device0/in_temp_input`.

use std::{f64::consts::TAU, fs, path::PathBuf};

use super::{Sensor, SensorError};
use crate::config::SensorSpec;

/// Number of samples in one simulated wave period.
const SIM_PERIOD: u64 = 60;
/// Peak deviation from the base value.
const SIM_AMPLITUDE: f64 = 0.5;

#[derive(Debug, Clone)]
pub struct SimulatedSensor {
    name: String,
    base: f64,
    step: u64,
}

impl SimulatedSensor {
    pub fn new(name: impl Into<String>, base: f64) -> Self {
        Self {
            name: name.into(),
            base,
            step: 0,
        }
    }
}

impl Sensor for SimulatedSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        let phase = (self.step % SIM_PERIOD) as f64 / SIM_PERIOD as f64;
        self.step += 1;
        Ok(self.base + SIM_AMPLITUDE * (TAU * phase).sin())
    }
}

/// Reads `<value> / divisor` from a text file on every sample.
#[derive(Debug, Clone)]
pub struct FileSensor {
    name: String,
    path: PathBuf,
    divisor: f64,
}

impl FileSensor {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, divisor: f64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            divisor,
        }
    }

    fn read_raw(&self) -> Result<f64, String> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| format!("{}: {e}", self.path.display()))?;
        let raw: f64 = text
            .trim()
            .parse()
            .map_err(|e| format!("{}: {e} in {:?}", self.path.display(), text.trim()))?;
        Ok(raw / self.divisor)
    }
}

impl Sensor for FileSensor {
    fn name(&self) -> &str {
        &self.name
    }

    fn init(&mut self) -> Result<(), SensorError> {
        self.read_raw().map(drop).map_err(|reason| SensorError::Init {
            sensor: self.name.clone(),
            reason,
        })
    }

    fn read(&mut self) -> Result<f64, SensorError> {
        self.read_raw().map_err(|reason| SensorError::Read {
            sensor: self.name.clone(),
            reason,
        })
    }
}

/// Builds the collaborator described by `spec`; `None` for [`SensorSpec::Absent`].
pub fn from_spec(name: &str, spec: &SensorSpec) -> Option<Box<dyn Sensor>> {
    match spec {
        SensorSpec::Simulated { base } => Some(Box::new(SimulatedSensor::new(name, *base))),
        SensorSpec::File { path, divisor } => {
            Some(Box::new(FileSensor::new(name, path.clone(), *divisor)))
        }
        SensorSpec::Absent => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_file(contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("sensor-{}", uuid::Uuid::new_v4()));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn simulated_stays_near_base() {
        let mut s = SimulatedSensor::new("temperature", 21.5);
        for _ in 0..(2 * SIM_PERIOD) {
            let v = s.read().unwrap();
            assert!((v - 21.5).abs() <= SIM_AMPLITUDE + f64::EPSILON);
        }
    }

    #[test]
    fn simulated_first_sample_is_base() {
        let mut s = SimulatedSensor::new("humidity", 48.0);
        assert_eq!(s.read().unwrap(), 48.0);
    }

    #[test]
    fn file_sensor_scales_value() {
        let path = temp_file("21500\n");
        let mut s = FileSensor::new("temperature", &path, 1000.0);
        s.init().unwrap();
        assert_eq!(s.read().unwrap(), 21.5);
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn file_sensor_garbage_is_a_read_error() {
        let path = temp_file("--\n");
        let mut s = FileSensor::new("pressure", &path, 1.0);
        assert!(matches!(s.read(), Err(SensorError::Read { .. })));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn file_sensor_missing_file_fails_init() {
        let mut s = FileSensor::new("temperature", "/nonexistent/in_temp_input", 1000.0);
        let err = s.init().unwrap_err();
        assert!(matches!(err, SensorError::Init { ref sensor, .. } if sensor == "temperature"));
    }

    #[test]
    fn from_spec_builds_each_kind() {
        assert!(from_spec("p", &SensorSpec::Absent).is_none());
        let sim = from_spec("t", &SensorSpec::Simulated { base: 20.0 }).unwrap();
        assert_eq!(sim.name(), "t");
        let file = from_spec(
            "h",
            &SensorSpec::File {
                path: "/tmp/x".into(),
                divisor: 1.0,
            },
        )
        .unwrap();
        assert_eq!(file.name(), "h");
    }
}
