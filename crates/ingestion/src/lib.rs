//! # Ingestion
//!
//! Sensor sampling.
//!
//! Responsibilities:
//! - Drift-correcting tick schedule with overrun detection
//! - One sampling worker thread per running sensor
//! - `PeriodicSensor`: a sensor built from a blocking `ValueSource`
//! - `MultiSensorDevice`: one physical poll shared by several child sensors
//! - Built-in value sources and demo devices
//!
//! ## Usage Example
//!
//! ```no_run
//! use std::time::Duration;
//! use contracts::{reading_queue, Sensor};
//! use ingestion::builtin;
//!
//! let sensor = builtin::constant_sensor(5.0, "Norwegian Blue");
//! let (tx, rx) = reading_queue();
//! sensor.start(tx, Duration::from_secs(1)).unwrap();
//! // ... later
//! sensor.stop(true).unwrap();
//! for reading in rx.drain() {
//!     println!("{} {}", reading.timestamp, reading.value);
//! }
//! ```

pub mod builtin;
mod device;
mod periodic;
mod schedule;
mod worker;

pub use device::{ChildSensor, DeviceReader, MultiSensorDevice};
pub use periodic::{PeriodicSensor, ValueSource};
pub use schedule::TickSchedule;
pub use worker::{SamplingWorker, StopFlag};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a worker panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
