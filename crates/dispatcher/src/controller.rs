//! FeedController - owns sensor queues and drains them into sinks

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use contracts::{reading_queue, ReadingReceiver, Sensor, SensorError, SensorId, Sink};
use metrics::{counter, gauge};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{FeedError, Result};
use crate::metrics::{MetricsSnapshot, SinkMetrics};

/// Wait between two dispatch iterations unless configured otherwise
pub const DEFAULT_POLL_WAIT: Duration = Duration::from_secs(5);

struct SensorInput {
    sensor: Arc<dyn Sensor>,
    param_name: String,
    queue: Option<ReadingReceiver>,
}

struct SinkSlot {
    sink: Box<dyn Sink>,
    metrics: Arc<SinkMetrics>,
}

/// Orchestrates a set of sensors and sinks
///
/// Sinks are called synchronously and sequentially on the dispatch loop, so
/// a slow sink delays the others but per-sensor order is always preserved.
pub struct FeedController {
    inputs: Vec<SensorInput>,
    sinks: Vec<SinkSlot>,
    sensor_period: Duration,
    poll_wait: Duration,
    finalised: bool,
    dispatched: u64,
}

impl FeedController {
    /// Create a controller; sensors start in the order given
    pub fn new(
        sensors: Vec<Arc<dyn Sensor>>,
        sinks: Vec<Box<dyn Sink>>,
        sensor_period: Duration,
    ) -> Self {
        let inputs = sensors
            .into_iter()
            .map(|sensor| SensorInput {
                param_name: sensor.descriptor().name.clone(),
                sensor,
                queue: None,
            })
            .collect();
        let sinks = sinks
            .into_iter()
            .map(|sink| SinkSlot {
                sink,
                metrics: Arc::new(SinkMetrics::new()),
            })
            .collect();

        Self {
            inputs,
            sinks,
            sensor_period,
            poll_wait: DEFAULT_POLL_WAIT,
            finalised: false,
            dispatched: 0,
        }
    }

    /// Override the wait between dispatch iterations
    pub fn with_poll_wait(mut self, poll_wait: Duration) -> Self {
        self.poll_wait = poll_wait;
        self
    }

    pub fn sensor_period(&self) -> Duration {
        self.sensor_period
    }

    pub fn poll_wait(&self) -> Duration {
        self.poll_wait
    }

    pub fn sensor_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Total readings drained since construction
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    /// Get metrics for all sinks
    pub fn sink_metrics(&self) -> Vec<(String, MetricsSnapshot)> {
        self.sinks
            .iter()
            .map(|slot| (slot.sink.name().to_string(), slot.metrics.snapshot()))
            .collect()
    }

    /// Create one queue per sensor and start them in order
    ///
    /// # Errors
    /// The first start failure aborts the remaining starts and is returned.
    /// Sensors already started stay running; `stop_sensors` stops them.
    #[instrument(name = "feed_start_sensors", skip(self), fields(sensors = self.inputs.len()))]
    pub fn start_sensors(&mut self) -> Result<()> {
        info!(period = ?self.sensor_period, "starting sensors");
        let period = self.sensor_period;

        for input in &mut self.inputs {
            let (tx, rx) = reading_queue();
            if let Err(source) = input.sensor.start(tx, period) {
                let sensor = input.sensor.descriptor().id.clone();
                error!(sensor = %sensor, error = %source, "sensor failed to start");
                return Err(FeedError::SensorStart { sensor, source });
            }
            info!(sensor = %input.sensor.descriptor().id, param = %input.param_name, "sensor started");
            input.queue = Some(rx);
        }
        Ok(())
    }

    /// Drain every queue once and hand each reading to every sink
    ///
    /// Returns the number of readings drained.
    pub fn poll_once(&mut self) -> usize {
        let mut drained = 0;

        for input in &self.inputs {
            let Some(queue) = &input.queue else {
                continue;
            };
            for reading in queue.drain() {
                drained += 1;
                for slot in &mut self.sinks {
                    match slot
                        .sink
                        .process_value(&input.param_name, reading.timestamp, reading.value)
                    {
                        Ok(()) => slot.metrics.inc_processed_count(),
                        Err(e) => {
                            slot.metrics.inc_failure_count();
                            counter!(
                                "sensor_feed_sink_failures_total",
                                "sink" => slot.sink.name().to_string()
                            )
                            .increment(1);
                            error!(
                                sink = %slot.sink.name(),
                                param = %input.param_name,
                                error = %e,
                                "sink failed to process reading"
                            );
                        }
                    }
                }
            }
        }

        self.dispatched += drained as u64;
        counter!("sensor_feed_readings_dispatched_total").increment(drained as u64);
        gauge!("sensor_feed_queue_drained").set(drained as f64);
        debug!(drained, "dispatch iteration");
        drained
    }

    /// Dispatch forever, waiting `poll_wait` between iterations
    #[instrument(name = "feed_run", skip(self), fields(poll_wait = ?self.poll_wait))]
    pub async fn run(&mut self) {
        loop {
            self.poll_once();
            tokio::time::sleep(self.poll_wait).await;
        }
    }

    /// Stop every started sensor, joining its worker
    ///
    /// Failures are logged and returned; they never prevent the remaining
    /// stops. Readings still queued are dispatched before the queues retire.
    #[instrument(name = "feed_stop_sensors", skip(self))]
    pub async fn stop_sensors(&mut self) -> Vec<SensorError> {
        info!("shutting down sensors");
        let started: Vec<Arc<dyn Sensor>> = self
            .inputs
            .iter()
            .filter(|input| input.queue.is_some())
            .map(|input| Arc::clone(&input.sensor))
            .collect();

        // Joining blocks for up to one tick per sensor
        let outcome = tokio::task::spawn_blocking(move || {
            started
                .iter()
                .map(|sensor| (sensor.descriptor().id.clone(), sensor.stop(true)))
                .collect::<Vec<(SensorId, std::result::Result<(), SensorError>)>>()
        })
        .await;

        let mut failures = Vec::new();
        match outcome {
            Ok(results) => {
                for (sensor, result) in results {
                    match result {
                        Ok(()) => debug!(sensor = %sensor, "sensor stopped"),
                        Err(e) => {
                            error!(sensor = %sensor, error = %e, "sensor stop reported error");
                            failures.push(e);
                        }
                    }
                }
            }
            Err(e) => error!(error = %e, "sensor stop task failed"),
        }

        let tail = self.poll_once();
        if tail > 0 {
            debug!(readings = tail, "dispatched readings queued before stop");
        }
        for input in &mut self.inputs {
            input.queue = None;
        }
        info!(failures = failures.len(), "sensors stopped");
        failures
    }

    /// Finalise every sink exactly once, in order
    ///
    /// Failures are logged and counted. A second call does nothing.
    #[instrument(name = "feed_finalise_sinks", skip(self))]
    pub fn finalise_sinks(&mut self) {
        if self.finalised {
            debug!("sinks already finalised");
            return;
        }
        self.finalised = true;

        info!(sinks = self.sinks.len(), "finalising sinks");
        for slot in &mut self.sinks {
            if let Err(e) = slot.sink.finalise() {
                slot.metrics.inc_finalise_failures();
                error!(sink = %slot.sink.name(), error = %e, "sink failed to finalise");
            }
        }
    }

    /// Start sensors, dispatch until `shutdown` resolves, then tear down
    ///
    /// Teardown (stop sensors, finalise sinks) always runs, including when
    /// startup fails.
    ///
    /// # Errors
    /// Returns the startup failure, if any.
    #[instrument(name = "feed_serve", skip(self, shutdown))]
    pub async fn serve<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.start_sensors() {
            warn!("startup failed, tearing down");
            self.stop_sensors().await;
            self.finalise_sinks();
            return Err(e);
        }

        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => info!("shutdown requested"),
        }

        self.stop_sensors().await;
        self.finalise_sinks();
        info!(dispatched = self.dispatched, "feed stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{ReadingSender, SensorDescriptor, SinkError, Timestamp};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<(String, String, f64)>>>;

    /// Pushes a fixed batch on start
    struct Scripted {
        descriptor: SensorDescriptor,
        values: Vec<f64>,
        fail: bool,
        started: AtomicBool,
        stops: AtomicUsize,
    }

    impl Scripted {
        fn new(name: &str, values: Vec<f64>) -> Arc<Self> {
            Arc::new(Self {
                descriptor: SensorDescriptor::new(name, name, "1"),
                values,
                fail: false,
                started: AtomicBool::new(false),
                stops: AtomicUsize::new(0),
            })
        }

        fn failing(name: &str) -> Arc<Self> {
            Arc::new(Self {
                descriptor: SensorDescriptor::new(name, name, "1"),
                values: Vec::new(),
                fail: true,
                started: AtomicBool::new(false),
                stops: AtomicUsize::new(0),
            })
        }
    }

    impl Sensor for Scripted {
        fn descriptor(&self) -> &SensorDescriptor {
            &self.descriptor
        }

        fn start(&self, queue: ReadingSender, period: Duration) -> std::result::Result<(), SensorError> {
            if self.fail {
                return Err(SensorError::period_too_short(
                    &self.descriptor.id,
                    period,
                    Duration::from_secs(3600),
                ));
            }
            self.started.store(true, Ordering::SeqCst);
            let t0 = chrono::Utc::now();
            for (i, value) in self.values.iter().enumerate() {
                let ts = t0 + chrono::TimeDelta::seconds(i as i64);
                queue.push(contracts::Reading::new(ts, *value));
            }
            Ok(())
        }

        fn stop(&self, _join: bool) -> std::result::Result<(), SensorError> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.started.store(false, Ordering::SeqCst);
            Ok(())
        }

        fn is_running(&self) -> bool {
            self.started.load(Ordering::SeqCst)
        }
    }

    struct Recording {
        name: String,
        log: Log,
        finalised: Arc<AtomicUsize>,
        fail_on: Option<String>,
    }

    impl Recording {
        fn new(name: &str, log: Log) -> Self {
            Self {
                name: name.to_string(),
                log,
                finalised: Arc::new(AtomicUsize::new(0)),
                fail_on: None,
            }
        }
    }

    impl Sink for Recording {
        fn name(&self) -> &str {
            &self.name
        }

        fn process_value(
            &mut self,
            param_name: &str,
            _timestamp: Timestamp,
            value: f64,
        ) -> std::result::Result<(), SinkError> {
            if self.fail_on.as_deref() == Some(param_name) {
                return Err(SinkError::process(&self.name, param_name, "refused"));
            }
            self.log
                .lock()
                .unwrap()
                .push((self.name.clone(), param_name.to_string(), value));
            Ok(())
        }

        fn finalise(&mut self) -> std::result::Result<(), SinkError> {
            self.finalised.fetch_add(1, Ordering::SeqCst);
            if self.fail_on.is_some() {
                return Err(SinkError::finalise(&self.name, "disk full"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_poll_once_fans_out_in_order() {
        let log: Log = Arc::default();
        let sensors: Vec<Arc<dyn Sensor>> = vec![
            Scripted::new("x", vec![1.0, 2.0, 3.0]),
            Scripted::new("y", vec![10.0]),
        ];
        let sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(Recording::new("first", Arc::clone(&log))),
            Box::new(Recording::new("second", Arc::clone(&log))),
        ];
        let mut feed = FeedController::new(sensors, sinks, Duration::from_secs(1));

        feed.start_sensors().unwrap();
        assert_eq!(feed.poll_once(), 4);
        assert_eq!(feed.poll_once(), 0);

        let log = log.lock().unwrap();
        let first: Vec<(&str, f64)> = log
            .iter()
            .filter(|(sink, _, _)| sink == "first")
            .map(|(_, param, value)| (param.as_str(), *value))
            .collect();
        assert_eq!(first, vec![("x", 1.0), ("x", 2.0), ("x", 3.0), ("y", 10.0)]);
        // each reading reaches the sinks in registration order
        assert_eq!(log[0].0, "first");
        assert_eq!(log[1].0, "second");
        assert_eq!(log.len(), 8);
    }

    #[test]
    fn test_start_failure_aborts_remaining() {
        let tail = Scripted::new("tail", vec![1.0]);
        let sensors: Vec<Arc<dyn Sensor>> = vec![
            Scripted::new("head", vec![1.0]),
            Scripted::failing("broken"),
            Arc::clone(&tail) as Arc<dyn Sensor>,
        ];
        let mut feed = FeedController::new(sensors, Vec::new(), Duration::from_secs(1));

        let err = feed.start_sensors().unwrap_err();
        assert!(matches!(err, FeedError::SensorStart { ref sensor, .. } if sensor == "broken"));
        assert!(!tail.is_running());
    }

    #[test]
    fn test_sink_failure_isolated() {
        let log: Log = Arc::default();
        let mut picky = Recording::new("picky", Arc::clone(&log));
        picky.fail_on = Some("x".to_string());
        let sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(picky),
            Box::new(Recording::new("steady", Arc::clone(&log))),
        ];
        let mut feed = FeedController::new(
            vec![Scripted::new("x", vec![1.0, 2.0])],
            sinks,
            Duration::from_secs(1),
        );

        feed.start_sensors().unwrap();
        assert_eq!(feed.poll_once(), 2);

        let metrics = feed.sink_metrics();
        assert_eq!(metrics[0].1.failure_count, 2);
        assert_eq!(metrics[1].1.processed_count, 2);
        assert_eq!(log.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_finalise_exactly_once() {
        let log: Log = Arc::default();
        let mut failing = Recording::new("failing", Arc::clone(&log));
        failing.fail_on = Some("never".to_string());
        let failing_count = Arc::clone(&failing.finalised);
        let ok = Recording::new("ok", Arc::clone(&log));
        let ok_count = Arc::clone(&ok.finalised);

        let sinks: Vec<Box<dyn Sink>> = vec![Box::new(failing), Box::new(ok)];
        let mut feed = FeedController::new(Vec::new(), sinks, Duration::from_secs(1));

        feed.finalise_sinks();
        feed.finalise_sinks();
        assert_eq!(failing_count.load(Ordering::SeqCst), 1);
        assert_eq!(ok_count.load(Ordering::SeqCst), 1);
        assert_eq!(feed.sink_metrics()[0].1.finalise_failures, 1);
    }

    #[tokio::test]
    async fn test_stop_sensors_dispatches_tail_and_retires_queues() {
        let log: Log = Arc::default();
        let sensor = Scripted::new("x", vec![1.0, 2.0]);
        let mut feed = FeedController::new(
            vec![Arc::clone(&sensor) as Arc<dyn Sensor>],
            vec![Box::new(Recording::new("rec", Arc::clone(&log)))],
            Duration::from_secs(1),
        );

        feed.start_sensors().unwrap();
        let failures = feed.stop_sensors().await;
        assert!(failures.is_empty());
        assert_eq!(sensor.stops.load(Ordering::SeqCst), 1);
        assert_eq!(log.lock().unwrap().len(), 2);
        assert_eq!(feed.poll_once(), 0);
    }

    #[tokio::test]
    async fn test_serve_until_shutdown() {
        let log: Log = Arc::default();
        let rec = Recording::new("rec", Arc::clone(&log));
        let finalised = Arc::clone(&rec.finalised);
        let sensor = Scripted::new("x", vec![4.0, 5.0, 6.0]);
        let mut feed = FeedController::new(
            vec![Arc::clone(&sensor) as Arc<dyn Sensor>],
            vec![Box::new(rec)],
            Duration::from_secs(1),
        )
        .with_poll_wait(Duration::from_millis(10));

        feed.serve(tokio::time::sleep(Duration::from_millis(50)))
            .await
            .unwrap();

        let values: Vec<f64> = log.lock().unwrap().iter().map(|(_, _, v)| *v).collect();
        assert_eq!(values, vec![4.0, 5.0, 6.0]);
        assert_eq!(sensor.stops.load(Ordering::SeqCst), 1);
        assert_eq!(finalised.load(Ordering::SeqCst), 1);
        assert_eq!(feed.dispatched(), 3);
    }

    #[tokio::test]
    async fn test_serve_startup_failure_tears_down() {
        let rec = Recording::new("rec", Arc::default());
        let finalised = Arc::clone(&rec.finalised);
        let head = Scripted::new("head", Vec::new());
        let mut feed = FeedController::new(
            vec![
                Arc::clone(&head) as Arc<dyn Sensor>,
                Scripted::failing("broken"),
            ],
            vec![Box::new(rec)],
            Duration::from_secs(1),
        );

        let err = feed.serve(std::future::pending()).await.unwrap_err();
        assert!(matches!(err, FeedError::SensorStart { .. }));
        assert_eq!(head.stops.load(Ordering::SeqCst), 1);
        assert!(!head.is_running());
        assert_eq!(finalised.load(Ordering::SeqCst), 1);
    }
}
