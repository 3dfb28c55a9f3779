//! PeriodicSensor - a sensor driven by a blocking value source
//!
//! Wraps anything that can produce one value on demand (an ADC channel, a
//! file, a counter) and samples it on its own worker thread.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use contracts::{Reading, ReadingSender, Sensor, SensorDescriptor, SensorError};
use metrics::counter;
use tracing::{info, instrument, warn};

use crate::lock;
use crate::worker::{sample_loop, SamplingWorker};

/// Produces one value per call
pub trait ValueSource: Send + 'static {
    /// Read the current value, blocking as long as the hardware needs
    fn read_value(&mut self) -> Result<f64, SensorError>;
}

impl<F> ValueSource for F
where
    F: FnMut() -> Result<f64, SensorError> + Send + 'static,
{
    fn read_value(&mut self) -> Result<f64, SensorError> {
        self()
    }
}

/// Sensor that samples a `ValueSource` on a drift-correcting schedule
pub struct PeriodicSensor<S> {
    descriptor: SensorDescriptor,
    source: Arc<Mutex<S>>,
    worker: Mutex<Option<SamplingWorker>>,
}

impl<S: ValueSource> PeriodicSensor<S> {
    /// Create a sensor around `source`
    pub fn new(descriptor: SensorDescriptor, source: S) -> Self {
        Self {
            descriptor,
            source: Arc::new(Mutex::new(source)),
            worker: Mutex::new(None),
        }
    }

    /// Read one value directly, outside the schedule
    pub fn sample(&self) -> Result<f64, SensorError> {
        lock(&self.source).read_value()
    }
}

impl<S: ValueSource> Sensor for PeriodicSensor<S> {
    fn descriptor(&self) -> &SensorDescriptor {
        &self.descriptor
    }

    #[instrument(
        name = "periodic_sensor_start",
        skip(self, queue),
        fields(sensor = %self.descriptor.id)
    )]
    fn start(&self, queue: ReadingSender, period: Duration) -> Result<(), SensorError> {
        self.descriptor.check_period(period)?;

        let mut slot = lock(&self.worker);
        if slot.is_some() {
            return Err(SensorError::AlreadyRunning {
                sensor: self.descriptor.id.clone(),
            });
        }

        let id = self.descriptor.id.clone();
        let source = Arc::clone(&self.source);
        let worker = SamplingWorker::spawn(id.clone(), move |stop| {
            sample_loop(&id, period, &stop, |timestamp, _| {
                let value = lock(&source).read_value();
                if stop.is_set() {
                    return ControlFlow::Break(());
                }
                match value {
                    Ok(value) => {
                        if !queue.push(Reading::new(timestamp, value)) {
                            return ControlFlow::Break(());
                        }
                    }
                    Err(e) => {
                        counter!("sensor_feed_read_failures_total", "sensor" => id.to_string())
                            .increment(1);
                        warn!(sensor = %id, error = %e, "read failed, tick skipped");
                    }
                }
                ControlFlow::Continue(())
            })
        })?;

        *slot = Some(worker);
        info!(sensor = %self.descriptor.id, period = ?period, "sensor started");
        Ok(())
    }

    fn stop(&self, join: bool) -> Result<(), SensorError> {
        // the slot stays locked through the join so no second worker can start
        let mut slot = lock(&self.worker);
        let Some(worker) = slot.take() else {
            return Ok(());
        };

        info!(sensor = %self.descriptor.id, join, "stopping sensor");
        if join {
            worker.stop()
        } else {
            worker.request_stop();
            Ok(())
        }
    }

    fn is_running(&self) -> bool {
        lock(&self.worker)
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }
}

impl<S> Drop for PeriodicSensor<S> {
    fn drop(&mut self) {
        if let Some(worker) = lock(&self.worker).take() {
            worker.request_stop();
        }
    }
}
