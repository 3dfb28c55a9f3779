//! Feed metric descriptions and the end-of-run summary

use std::fmt;

use dispatcher::{FeedController, MetricsSnapshot};
use metrics::{describe_counter, describe_gauge, Unit};

/// Attach help text to the metrics the feed records
///
/// Must run after a recorder is installed to have any effect.
pub fn describe_feed_metrics() {
    describe_counter!(
        "sensor_feed_readings_dispatched_total",
        Unit::Count,
        "Readings drained from sensor queues and handed to sinks"
    );
    describe_counter!(
        "sensor_feed_sink_failures_total",
        Unit::Count,
        "Readings a sink failed to process"
    );
    describe_gauge!(
        "sensor_feed_queue_drained",
        Unit::Count,
        "Readings drained by the latest dispatch iteration"
    );
    describe_counter!(
        "sensor_feed_sampling_overruns_total",
        Unit::Count,
        "Sampling workers stopped because a read outlasted its period"
    );
    describe_counter!(
        "sensor_feed_read_failures_total",
        Unit::Count,
        "Hardware reads that failed and skipped a tick"
    );
    describe_counter!(
        "sensor_feed_actuations_total",
        Unit::Count,
        "Plant controller actions started"
    );
}

/// Per-sink line of a `FeedSummary`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSummary {
    pub name: String,
    pub metrics: MetricsSnapshot,
}

/// What a feed run did, printed when the CLI exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSummary {
    pub sensors: usize,
    pub dispatched: u64,
    pub sinks: Vec<SinkSummary>,
}

impl FeedSummary {
    pub fn from_controller(controller: &FeedController) -> Self {
        Self {
            sensors: controller.sensor_count(),
            dispatched: controller.dispatched(),
            sinks: controller
                .sink_metrics()
                .into_iter()
                .map(|(name, metrics)| SinkSummary { name, metrics })
                .collect(),
        }
    }

    /// Total per-reading sink failures
    pub fn sink_failures(&self) -> u64 {
        self.sinks.iter().map(|s| s.metrics.failure_count).sum()
    }
}

impl fmt::Display for FeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Feed Summary ===")?;
        writeln!(f, "Sensors: {}", self.sensors)?;
        writeln!(f, "Readings dispatched: {}", self.dispatched)?;
        for sink in &self.sinks {
            writeln!(
                f,
                "  {}: processed={} failed={} finalise_failures={}",
                sink.name,
                sink.metrics.processed_count,
                sink.metrics.failure_count,
                sink.metrics.finalise_failures
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_display() {
        let summary = FeedSummary {
            sensors: 3,
            dispatched: 12,
            sinks: vec![SinkSummary {
                name: "log".to_string(),
                metrics: MetricsSnapshot {
                    processed_count: 11,
                    failure_count: 1,
                    finalise_failures: 0,
                },
            }],
        };

        let output = summary.to_string();
        assert!(output.contains("Readings dispatched: 12"));
        assert!(output.contains("log: processed=11 failed=1"));
        assert_eq!(summary.sink_failures(), 1);
    }

    #[test]
    fn test_summary_from_idle_controller() {
        let controller = FeedController::new(Vec::new(), Vec::new(), std::time::Duration::from_secs(1));
        let summary = FeedSummary::from_controller(&controller);
        assert_eq!(summary, FeedSummary::default());
    }

    #[test]
    fn test_describe_without_recorder() {
        // no recorder installed: descriptions are dropped silently
        describe_feed_metrics();
    }
}
