//! # Contracts
//!
//! Shared interface contracts for the sensor feed: readings, sensor and sink
//! capabilities, the per-sensor queue, errors and the feed configuration
//! blueprint. Every other crate in the workspace depends on this one and
//! never the other way around.
//!
//! ## Time Model
//! - A reading is stamped with the wall-clock UTC time of its *scheduled* tick
//! - Periods are `std::time::Duration`

mod blueprint;
mod error;
mod queue;
mod reading;
mod sensor;
mod sensor_id;
mod sink;

pub use blueprint::*;
pub use error::*;
pub use queue::{reading_queue, ReadingReceiver, ReadingSender};
pub use reading::{Reading, Timestamp};
pub use sensor::{PeriodBounds, Sensor, SensorDescriptor, ValueType};
pub use sensor_id::SensorId;
pub use sink::Sink;
