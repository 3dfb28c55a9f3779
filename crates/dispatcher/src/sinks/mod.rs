//! Sink implementations
//!
//! Contains LogSink, PrintingSink and the buffered CSV sink.

mod buffered;
mod log;
mod printing;

pub use self::buffered::{BufferWriter, BufferedSink, CsvSink, CsvWriter, Resolution};
pub use self::log::LogSink;
pub use self::printing::PrintingSink;
