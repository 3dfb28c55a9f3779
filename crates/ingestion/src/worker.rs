//! Sampling worker thread and its stop signal

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use contracts::{SensorError, SensorId, Timestamp};
use metrics::counter;
use tracing::{debug, error, trace};

use crate::schedule::TickSchedule;

/// Worker-side view of the stop signal
///
/// Checked once per tick boundary. The inter-tick wait parks the thread, so a
/// stop request (which unparks it) ends the wait early.
#[derive(Debug, Clone)]
pub struct StopFlag {
    flag: Arc<AtomicBool>,
}

impl StopFlag {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether stop has been requested
    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    fn set(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Sleep for `timeout` unless stop is requested first
    ///
    /// Returns `true` if stop was requested. Must be called from the thread
    /// that the stop request unparks.
    pub fn wait(&self, timeout: Duration) -> bool {
        // beyond the clock's range: wait for stop alone
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            while !self.is_set() {
                thread::park();
            }
            return true;
        };
        loop {
            if self.is_set() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return self.is_set();
            }
            thread::park_timeout(deadline - now);
        }
    }
}

/// Handle to one running sampling thread
#[derive(Debug)]
pub struct SamplingWorker {
    label: SensorId,
    stop: StopFlag,
    handle: JoinHandle<Result<(), SensorError>>,
}

impl SamplingWorker {
    /// Spawn a named worker thread running `body`
    ///
    /// # Errors
    /// Returns `SensorError::Spawn` if the OS refuses the thread.
    pub fn spawn<F>(label: SensorId, body: F) -> Result<Self, SensorError>
    where
        F: FnOnce(StopFlag) -> Result<(), SensorError> + Send + 'static,
    {
        let stop = StopFlag::new();
        let worker_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(format!("sensor-{label}"))
            .spawn(move || body(worker_stop))
            .map_err(|source| SensorError::Spawn {
                sensor: label.clone(),
                source,
            })?;

        Ok(Self {
            label,
            stop,
            handle,
        })
    }

    /// Worker label (sensor or device id)
    pub fn label(&self) -> &SensorId {
        &self.label
    }

    /// Ask the worker to exit at its next tick boundary, without waiting
    pub fn request_stop(&self) {
        self.stop.set();
        self.handle.thread().unpark();
    }

    /// Whether the worker thread has exited
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the worker to exit and return its outcome
    pub fn join(self) -> Result<(), SensorError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => Err(SensorError::WorkerPanicked { sensor: self.label }),
        }
    }

    /// Request stop and wait for exit
    pub fn stop(self) -> Result<(), SensorError> {
        self.request_stop();
        self.join()
    }
}

/// Run the drift-correcting sampling loop until stopped or overrun
///
/// `on_tick` receives the tick's wall-clock timestamp and monotonic instant.
/// It must re-check `stop` after value production and skip the append if stop
/// was requested meanwhile. Returning `ControlFlow::Break` ends the loop
/// quietly (e.g. when the consumer is gone).
///
/// # Errors
/// Returns `SensorError::SamplingTooSlow` when a tick overran its period.
pub fn sample_loop<F>(
    sensor: &SensorId,
    period: Duration,
    stop: &StopFlag,
    mut on_tick: F,
) -> Result<(), SensorError>
where
    F: FnMut(Timestamp, Instant) -> ControlFlow<()>,
{
    let mut schedule = TickSchedule::start_now(period);
    debug!(sensor = %sensor, period = ?period, "sampling worker started");

    loop {
        if stop.is_set() {
            break;
        }

        trace!(sensor = %sensor, timestamp = %schedule.timestamp(), "tick");
        if on_tick(schedule.timestamp(), schedule.scheduled_instant()).is_break() {
            break;
        }

        match schedule.advance(Instant::now()) {
            Ok(wait) => {
                if stop.wait(wait) {
                    break;
                }
            }
            Err(overrun) => {
                counter!("sensor_feed_sampling_overruns_total", "sensor" => sensor.to_string())
                    .increment(1);
                error!(
                    sensor = %sensor,
                    period = ?period,
                    overrun = ?overrun,
                    "sensor too slow, sampling worker terminating"
                );
                return Err(SensorError::SamplingTooSlow {
                    sensor: sensor.clone(),
                    period,
                    overrun,
                });
            }
        }
    }

    debug!(sensor = %sensor, "sampling worker stopped");
    Ok(())
}
