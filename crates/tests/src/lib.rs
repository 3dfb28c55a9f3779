//! # Integration Tests
//!
//! End-to-end tests across the workspace crates.
//!
//! Covers:
//! - Config file to live feed round trip
//! - Per-sensor ordering through the controller
//! - Isolation of a sensor that cannot keep up
//! - Serve lifecycle (startup failure, shutdown, finalise once)
//! - Plant control driven by a trigger sensor

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use contracts::{Sink, SinkError, Timestamp};

    pub type Log = Arc<Mutex<Vec<(String, Timestamp, f64)>>>;

    /// Records every reading and counts finalise calls
    #[derive(Clone, Default)]
    pub struct Recorder {
        pub log: Log,
        pub finalised: Arc<AtomicUsize>,
    }

    impl Recorder {
        pub fn sink(&self) -> Box<dyn Sink> {
            Box::new(self.clone())
        }

        pub fn values(&self, param: &str) -> Vec<(Timestamp, f64)> {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|(name, _, _)| name == param)
                .map(|(_, ts, value)| (*ts, *value))
                .collect()
        }

        pub fn len(&self) -> usize {
            self.log.lock().unwrap().len()
        }

        pub fn finalise_count(&self) -> usize {
            self.finalised.load(Ordering::SeqCst)
        }
    }

    impl Sink for Recorder {
        fn name(&self) -> &str {
            "recorder"
        }

        fn process_value(
            &mut self,
            param_name: &str,
            timestamp: Timestamp,
            value: f64,
        ) -> Result<(), SinkError> {
            self.log
                .lock()
                .unwrap()
                .push((param_name.to_string(), timestamp, value));
            Ok(())
        }

        fn finalise(&mut self) -> Result<(), SinkError> {
            self.finalised.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }
}

#[cfg(test)]
mod contract_tests {
    use std::time::Duration;

    use contracts::{reading_queue, Sensor};

    #[test]
    fn test_builtin_config_is_current_version() {
        let blueprint = config_loader::defaults();
        assert_eq!(blueprint.version, contracts::ConfigVersion::default());
        assert_eq!(blueprint.version, contracts::ConfigVersion::V1);
        assert!(config_loader::ConfigLoader::validate(&blueprint).is_ok());
    }

    #[test]
    fn test_sensor_rejects_out_of_bounds_period() {
        let pin = actuator::MemoryPin::new("valve");
        let control = actuator::PlantControl::new(actuator::PlantSettings::default(), Box::new(pin));
        let sensor = control.sensor();
        let (tx, _rx) = reading_queue();

        // default plant reporting period is at least 22s
        assert!(sensor.start(tx, Duration::from_secs(1)).is_err());
        assert!(!sensor.is_running());
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use actuator::{MemoryPin, PlantControl, PlantSettings, Threshold};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{Sensor, SensorDescriptor, SensorError};
    use dispatcher::{FeedController, FeedError};
    use factory::ComponentRegistry;
    use ingestion::{builtin, PeriodicSensor};
    use tempfile::tempdir;

    use crate::support::Recorder;

    const PERIOD: Duration = Duration::from_millis(50);

    fn controller(sensors: Vec<Arc<dyn Sensor>>, recorder: &Recorder) -> FeedController {
        FeedController::new(sensors, vec![recorder.sink()], PERIOD)
            .with_poll_wait(Duration::from_millis(20))
    }

    /// Config file -> registry -> controller -> sinks, including CSV output
    #[tokio::test]
    async fn test_config_round_trip() {
        let out = tempdir().unwrap();
        let toml = format!(
            r#"
            [feed]
            sensor_period_secs = 0.05
            poll_wait_secs = 0.02

            [[sensors]]
            kind = "constant"
            [sensors.params]
            value = "5"
            name = "Norwegian Blue"

            [[sensors]]
            kind = "dummy_multi"

            [[sinks]]
            kind = "csv"
            [sinks.params]
            dir = "{}"
            resolution = "second"
            "#,
            out.path().display()
        );
        let blueprint = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let registry = ComponentRegistry::default();
        let resolved = registry.resolve(&blueprint).unwrap();
        assert_eq!(resolved.sensor_names(), vec!["Norwegian Blue", "a", "b"]);

        let recorder = Recorder::default();
        let mut sinks = resolved.sinks;
        sinks.push(recorder.sink());
        let mut feed = FeedController::new(resolved.sensors, sinks, resolved.sensor_period)
            .with_poll_wait(resolved.poll_wait);

        feed.serve(tokio::time::sleep(Duration::from_millis(300)))
            .await
            .unwrap();

        let blue = recorder.values("Norwegian Blue");
        assert!(blue.len() >= 3, "got {} readings", blue.len());
        assert!(blue.iter().all(|(_, v)| *v == 5.0));
        assert!(recorder.values("a").iter().all(|(_, v)| *v == 1.2));
        assert!(recorder.values("b").iter().all(|(_, v)| *v == 5.4));
        assert_eq!(recorder.finalise_count(), 1);

        let csv = fs::read_to_string(out.path().join("Norwegian Blue.csv")).unwrap();
        assert_eq!(csv.lines().next(), Some("timestamp,value"));
        assert!(csv.lines().count() >= 2);
    }

    /// Readings of one sensor reach sinks in production order
    #[tokio::test]
    async fn test_per_sensor_fifo() {
        let recorder = Recorder::default();
        let source = builtin::RiseAndFall::new(0.0, 1000.0, 1.0).unwrap();
        let sensor: Arc<dyn Sensor> = Arc::new(PeriodicSensor::new(
            SensorDescriptor::new("ramp", "ramp", "1"),
            source,
        ));
        let mut feed = controller(vec![sensor], &recorder);

        feed.serve(tokio::time::sleep(Duration::from_millis(400)))
            .await
            .unwrap();

        let ramp = recorder.values("ramp");
        assert!(ramp.len() >= 4);
        for pair in ramp.windows(2) {
            assert!(pair[0].0 < pair[1].0, "timestamps out of order");
            assert_eq!(pair[1].1 - pair[0].1, 1.0, "values out of order");
        }
    }

    /// A sensor that overruns its period stops alone; the others keep going
    #[tokio::test]
    async fn test_slow_sensor_isolated() {
        let recorder = Recorder::default();
        let slow: Arc<dyn Sensor> = Arc::new(PeriodicSensor::new(
            SensorDescriptor::new("slow", "slow", "1"),
            || {
                thread::sleep(PERIOD * 3);
                Ok::<_, SensorError>(0.0)
            },
        ));
        let fast: Arc<dyn Sensor> = Arc::new(builtin::dummy_sensor());
        let mut feed = controller(vec![slow.clone(), fast.clone()], &recorder);

        feed.start_sensors().unwrap();
        tokio::time::sleep(Duration::from_millis(500)).await;
        feed.poll_once();

        assert!(!slow.is_running());
        assert!(fast.is_running());

        let failures = feed.stop_sensors().await;
        assert!(failures
            .iter()
            .any(|e| matches!(e, SensorError::SamplingTooSlow { .. })));
        assert!(recorder.values("slow").len() <= 1);
        assert!(recorder.values("Ones").len() >= 5);

        feed.finalise_sinks();
        assert_eq!(recorder.finalise_count(), 1);
    }

    /// Nothing is delivered after serve returns; startup failures still tear down
    #[tokio::test]
    async fn test_serve_lifecycle() {
        let recorder = Recorder::default();
        let good: Arc<dyn Sensor> = Arc::new(builtin::constant_sensor(2.0, "good"));
        let bounded: Arc<dyn Sensor> = Arc::new(PeriodicSensor::new(
            SensorDescriptor::new("bounded", "bounded", "1").with_bounds(
                contracts::PeriodBounds::at_least(Duration::from_secs(60)),
            ),
            builtin::Constant(1.0),
        ));
        let mut feed = controller(vec![good.clone(), bounded], &recorder);

        let result = feed.serve(std::future::pending()).await;
        assert!(matches!(result, Err(FeedError::SensorStart { .. })));
        assert!(!good.is_running());
        assert_eq!(recorder.finalise_count(), 1);

        let recorder = Recorder::default();
        let sensor: Arc<dyn Sensor> = Arc::new(builtin::dummy_sensor());
        let mut feed = controller(vec![sensor.clone()], &recorder);
        feed.serve(tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();
        assert!(!sensor.is_running());

        let settled = recorder.len();
        tokio::time::sleep(PERIOD * 3).await;
        assert_eq!(recorder.len(), settled);
        assert_eq!(feed.dispatched(), settled as u64);

        feed.finalise_sinks();
        assert_eq!(recorder.finalise_count(), 1);
    }

    /// A trigger reading drives the output and is reported back as usage
    #[tokio::test]
    async fn test_plant_control_feedback() {
        let pin = MemoryPin::new("valve");
        let settings = PlantSettings::new("soil", Threshold::above(1300.0), Duration::from_millis(30))
            .with_min_period(PERIOD);
        let plant = PlantControl::new(settings, Box::new(pin.clone()));

        let recorder = Recorder::default();
        let soil: Arc<dyn Sensor> = Arc::new(PeriodicSensor::new(
            SensorDescriptor::new("soil", "soil", "raw"),
            builtin::Constant(2000.0),
        ));
        let usage: Arc<dyn Sensor> = Arc::new(plant.sensor());
        let mut feed = FeedController::new(
            vec![soil, usage],
            vec![recorder.sink(), Box::new(plant.sink())],
            PERIOD,
        )
        .with_poll_wait(Duration::from_millis(20));

        feed.serve(tokio::time::sleep(Duration::from_millis(500)))
            .await
            .unwrap();

        assert!(pin.activations() >= 1);
        let reported: f64 = recorder.values("water_input").iter().map(|(_, v)| v).sum();
        assert!(reported > 0.0, "usage never reported");

        drop(feed);
        drop(plant);
        assert!(!pin.is_active());
    }

    /// Built-in defaults resolve and serve without a config file
    #[tokio::test]
    async fn test_defaults_serve() {
        let mut blueprint = ConfigLoader::load_or_default(None).unwrap();
        blueprint.feed.sensor_period_secs = 0.05;
        blueprint.feed.poll_wait_secs = 0.02;

        let mut feed = ComponentRegistry::default()
            .resolve(&blueprint)
            .unwrap()
            .into_controller();
        feed.serve(tokio::time::sleep(Duration::from_millis(200)))
            .await
            .unwrap();

        let summary = observability::FeedSummary::from_controller(&feed);
        assert_eq!(summary.sensors, 4);
        assert_eq!(summary.sink_failures(), 0);
    }
}
