//! LogSink - emits every reading via tracing

use contracts::{Sink, SinkError, Timestamp};
use tracing::{info, instrument};

/// Sink that logs every reading as a structured event
pub struct LogSink {
    name: String,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Sink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_value(
        &mut self,
        param_name: &str,
        timestamp: Timestamp,
        value: f64,
    ) -> Result<(), SinkError> {
        info!(
            sink = %self.name,
            param = %param_name,
            timestamp = %timestamp,
            value,
            "reading"
        );
        Ok(())
    }

    #[instrument(name = "log_sink_finalise", skip(self))]
    fn finalise(&mut self) -> Result<(), SinkError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}
