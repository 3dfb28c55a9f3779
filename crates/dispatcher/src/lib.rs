//! # Dispatcher
//!
//! Feed controller.
//!
//! Responsibilities:
//! - Own one inbound queue per sensor
//! - Periodically drain every queue into every sink, in order
//! - Sensor and sink lifecycle (start, stop, finalise)
//! - Built-in sinks (log, printing, buffered CSV)

pub mod controller;
pub mod error;
pub mod metrics;
pub mod sinks;

pub use contracts::{Sensor, Sink};
pub use controller::{FeedController, DEFAULT_POLL_WAIT};
pub use error::{FeedError, Result};
pub use metrics::{MetricsSnapshot, SinkMetrics};
pub use sinks::{BufferWriter, BufferedSink, CsvSink, CsvWriter, LogSink, PrintingSink, Resolution};
