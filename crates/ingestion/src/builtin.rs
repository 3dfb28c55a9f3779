//! Built-in value sources and demo devices
//!
//! Enough to run a feed without any hardware attached, plus a generic file
//! reader for Linux sysfs/IIO style inputs.

use std::fs;
use std::path::{Path, PathBuf};

use contracts::{ContractError, PeriodBounds, SensorDescriptor, SensorError, SensorId};

use crate::{MultiSensorDevice, PeriodicSensor, ValueSource};

/// Default location of the kernel load average
pub const PROC_LOADAVG: &str = "/proc/loadavg";

/// Lower-case a display name into an id (`"Norwegian Blue"` -> `norwegian_blue`)
pub fn id_from_name(name: &str) -> SensorId {
    let id: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    SensorId::from(id)
}

/// Always returns the same value
#[derive(Debug, Clone, Copy)]
pub struct Constant(pub f64);

impl ValueSource for Constant {
    fn read_value(&mut self) -> Result<f64, SensorError> {
        Ok(self.0)
    }
}

/// Constant sensor named `name`
pub fn constant_sensor(value: f64, name: &str) -> PeriodicSensor<Constant> {
    PeriodicSensor::new(
        SensorDescriptor::new(name, id_from_name(name), "1"),
        Constant(value),
    )
}

/// The "Ones" sensor: always 1.0
pub fn dummy_sensor() -> PeriodicSensor<Constant> {
    PeriodicSensor::new(SensorDescriptor::new("Ones", "dummy", "1"), Constant(1.0))
}

/// Triangle wave walking between `min` and `max` in `step` increments
#[derive(Debug, Clone)]
pub struct RiseAndFall {
    min: f64,
    max: f64,
    step: f64,
    current: f64,
    rising: bool,
}

impl RiseAndFall {
    /// # Errors
    /// Rejects `min >= max` and a non-positive or non-finite `step`.
    pub fn new(min: f64, max: f64, step: f64) -> Result<Self, ContractError> {
        if !(min < max) {
            return Err(ContractError::config_validation(
                "rise_and_fall.params",
                format!("min ({min}) must be below max ({max})"),
            ));
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(ContractError::config_validation(
                "rise_and_fall.params.step",
                format!("step must be positive, got {step}"),
            ));
        }
        Ok(Self {
            min,
            max,
            step,
            current: min,
            rising: true,
        })
    }
}

impl Default for RiseAndFall {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 10.0,
            step: 1.0,
            current: 0.0,
            rising: true,
        }
    }
}

impl ValueSource for RiseAndFall {
    fn read_value(&mut self) -> Result<f64, SensorError> {
        let value = self.current;
        if self.rising {
            self.current = (self.current + self.step).min(self.max);
            if self.current >= self.max {
                self.rising = false;
            }
        } else {
            self.current = (self.current - self.step).max(self.min);
            if self.current <= self.min {
                self.rising = true;
            }
        }
        Ok(value)
    }
}

pub fn rise_and_fall_sensor(source: RiseAndFall) -> PeriodicSensor<RiseAndFall> {
    PeriodicSensor::new(
        SensorDescriptor::new("Rise and fall", "rise_and_fall", "1"),
        source,
    )
}

/// Parses a number out of a text file on every read
///
/// Covers `/sys/bus/iio/devices/iio:deviceN/in_voltageN_raw` style ADC
/// channels as well as any other single-value pseudo file.
#[derive(Debug, Clone)]
pub struct FileValue {
    sensor: SensorId,
    path: PathBuf,
    field: usize,
    scale: f64,
}

impl FileValue {
    pub fn new(sensor: impl Into<SensorId>, path: impl Into<PathBuf>) -> Self {
        Self {
            sensor: sensor.into(),
            path: path.into(),
            field: 0,
            scale: 1.0,
        }
    }

    /// Use the `field`th whitespace separated token
    pub fn with_field(mut self, field: usize) -> Self {
        self.field = field;
        self
    }

    /// Multiply every raw value by `scale`
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ValueSource for FileValue {
    fn read_value(&mut self) -> Result<f64, SensorError> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            SensorError::read_failed(&self.sensor, format!("{}: {e}", self.path.display()))
        })?;
        let token = text.split_whitespace().nth(self.field).ok_or_else(|| {
            SensorError::read_failed(
                &self.sensor,
                format!("{}: no field {}", self.path.display(), self.field),
            )
        })?;
        let raw: f64 = token.parse().map_err(|_| {
            SensorError::read_failed(
                &self.sensor,
                format!("{}: '{token}' is not a number", self.path.display()),
            )
        })?;
        Ok(raw * self.scale)
    }
}

/// Generic file-backed sensor
pub fn file_value_sensor(
    descriptor: SensorDescriptor,
    path: impl Into<PathBuf>,
) -> PeriodicSensor<FileValue> {
    let source = FileValue::new(&descriptor.id, path);
    PeriodicSensor::new(descriptor, source)
}

/// One-minute load average read from `path` (normally `/proc/loadavg`)
pub fn cpu_load_average_sensor(path: impl Into<PathBuf>) -> PeriodicSensor<FileValue> {
    file_value_sensor(
        SensorDescriptor::new("CPU load average", "cpu_load_average", "load"),
        path,
    )
}

/// Demo device with children `a` (mm) and `b` (%) reading `[1.2, 5.4]`
pub fn dummy_multi_device() -> MultiSensorDevice {
    MultiSensorDevice::new(
        "dummy",
        "dummy_multi",
        vec![
            SensorDescriptor::new("a", "a", "mm"),
            SensorDescriptor::new("b", "b", "%"),
        ],
        PeriodBounds::UNBOUNDED,
        || Ok::<_, SensorError>(vec![1.2, 5.4]),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{reading_queue, Sensor};
    use std::io::Write;
    use std::thread;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    #[test]
    fn test_id_from_name() {
        assert_eq!(id_from_name("Norwegian Blue"), "norwegian_blue");
        assert_eq!(id_from_name("constant"), "constant");
    }

    #[test]
    fn test_constant_sensor() {
        let sensor = constant_sensor(5.0, "Norwegian Blue");
        assert_eq!(sensor.descriptor().name, "Norwegian Blue");
        assert_eq!(sensor.sample().unwrap(), 5.0);
        assert_eq!(dummy_sensor().sample().unwrap(), 1.0);
    }

    #[test]
    fn test_rise_and_fall_walks_both_ways() {
        let mut wave = RiseAndFall::new(0.0, 2.0, 1.0).unwrap();
        let values: Vec<f64> = (0..7).map(|_| wave.read_value().unwrap()).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 1.0, 0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_rise_and_fall_rejects_bad_params() {
        assert!(RiseAndFall::new(1.0, 1.0, 1.0).is_err());
        assert!(RiseAndFall::new(0.0, 1.0, 0.0).is_err());
        assert!(RiseAndFall::new(0.0, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_cpu_load_average_parses_first_field() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "0.52 0.58 0.59 1/389 12345").unwrap();

        let sensor = cpu_load_average_sensor(file.path());
        assert_eq!(sensor.sample().unwrap(), 0.52);
    }

    #[test]
    fn test_file_value_scale_and_errors() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "2048").unwrap();

        let mut source = FileValue::new("adc0", file.path()).with_scale(0.5);
        assert_eq!(source.read_value().unwrap(), 1024.0);

        let mut missing = FileValue::new("adc1", "/nonexistent/in_voltage1_raw");
        assert!(matches!(
            missing.read_value(),
            Err(SensorError::ReadFailed { .. })
        ));

        let mut garbage = NamedTempFile::new().unwrap();
        writeln!(garbage, "n/a").unwrap();
        let mut source = FileValue::new("adc2", garbage.path());
        assert!(matches!(
            source.read_value(),
            Err(SensorError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_dummy_multi_device_children() {
        let device = dummy_multi_device();
        let children = device.sensors();
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].descriptor().unit, "mm");
        assert_eq!(children[1].descriptor().unit, "%");

        let (tx, rx) = reading_queue();
        children[1].start(tx, Duration::from_millis(20)).unwrap();
        thread::sleep(Duration::from_millis(50));
        children[1].stop(true).unwrap();
        assert!(!rx.is_empty());
        assert!(rx.drain().all(|r| r.value == 5.4));
    }
}
