//! Sink capability - feed controller output interface

use crate::{SinkError, Timestamp};

/// Reading consumer
///
/// Sinks run synchronously on the dispatch loop, one after another, in
/// registration order. Any buffering is private to the sink and flushed on
/// `finalise`.
pub trait Sink: Send {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Handle a single datapoint
    ///
    /// # Errors
    /// Returns a processing error (should include context). The controller
    /// logs it and carries on with the next sink.
    fn process_value(
        &mut self,
        param_name: &str,
        timestamp: Timestamp,
        value: f64,
    ) -> Result<(), SinkError>;

    /// Tidy up and flush any buffered state
    ///
    /// Called exactly once, after sensors have stopped.
    fn finalise(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}
