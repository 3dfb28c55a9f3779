//! MultiSensorDevice - one physical poll shared by several child sensors
//!
//! A device (e.g. a combined temperature/pressure/humidity chip) is read in a
//! single bus transaction that yields one value per child. Every child is a
//! regular `Sensor`; the device runs one worker for all active children.

use std::collections::BTreeMap;
use std::mem;
use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, Instant};

use contracts::{
    PeriodBounds, Reading, ReadingSender, Sensor, SensorDescriptor, SensorError, SensorId,
    Timestamp,
};
use metrics::counter;
use tracing::{debug, info, warn};

use crate::lock;
use crate::worker::{sample_loop, SamplingWorker, StopFlag};

/// Reads every child value of a device in one physical interaction
pub trait DeviceReader: Send + 'static {
    /// One value per child, in child order
    fn read_all(&mut self) -> Result<Vec<f64>, SensorError>;
}

impl<F> DeviceReader for F
where
    F: FnMut() -> Result<Vec<f64>, SensorError> + Send + 'static,
{
    fn read_all(&mut self) -> Result<Vec<f64>, SensorError> {
        self()
    }
}

struct Registration {
    queue: ReadingSender,
    since: Instant,
}

#[derive(Default)]
struct DeviceState {
    registrations: BTreeMap<usize, Registration>,
    worker: Option<SamplingWorker>,
    period: Option<Duration>,
    /// Workers stopped without joining, reaped at the next joined stop
    retired: Vec<SamplingWorker>,
}

struct DeviceShared {
    name: String,
    id: SensorId,
    children: Vec<SensorDescriptor>,
    reader: Mutex<Box<dyn DeviceReader>>,
    state: Mutex<DeviceState>,
}

impl DeviceShared {
    fn register(
        self: &Arc<Self>,
        index: usize,
        queue: ReadingSender,
        period: Duration,
    ) -> Result<(), SensorError> {
        let child = &self.children[index];
        child.check_period(period)?;

        let mut state = lock(&self.state);
        if state.registrations.contains_key(&index) {
            return Err(SensorError::DuplicateChild {
                device: self.name.clone(),
                child: child.id.clone(),
            });
        }

        if state.worker.as_ref().is_some_and(SamplingWorker::is_finished) {
            if let Some(dead) = state.worker.take() {
                warn!(device = %self.id, "device worker exited, relaunching");
                state.retired.push(dead);
            }
            state.period = None;
        }

        state.registrations.insert(
            index,
            Registration {
                queue,
                since: Instant::now(),
            },
        );
        debug!(
            device = %self.id,
            child = %child.id,
            active = state.registrations.len(),
            "child registered"
        );

        let running = state.period;
        match running {
            None => match self.launch(period) {
                Ok(worker) => {
                    state.worker = Some(worker);
                    state.period = Some(period);
                    info!(device = %self.id, period = ?period, "device polling started");
                }
                Err(e) => {
                    state.registrations.remove(&index);
                    return Err(e);
                }
            },
            Some(running) if running != period => warn!(
                device = %self.id,
                child = %child.id,
                requested = ?period,
                running = ?running,
                "device already polling at a different period, child served at running period"
            ),
            Some(_) => {}
        }
        Ok(())
    }

    fn deregister(&self, index: usize, join: bool) -> Result<(), SensorError> {
        let child = &self.children[index].id;
        let (worker, retired) = {
            let mut state = lock(&self.state);
            if state.registrations.remove(&index).is_none() {
                return Ok(());
            }
            debug!(
                device = %self.id,
                child = %child,
                active = state.registrations.len(),
                "child deregistered"
            );
            if !state.registrations.is_empty() {
                return Ok(());
            }

            state.period = None;
            let worker = state.worker.take();
            if !join {
                if let Some(worker) = worker {
                    worker.request_stop();
                    state.retired.push(worker);
                }
                info!(device = %self.id, "device polling stop requested");
                return Ok(());
            }
            (worker, mem::take(&mut state.retired))
        };

        // Joins happen outside the lock so the worker can finish its tick
        for old in retired {
            if let Err(e) = old.stop() {
                warn!(device = %self.id, error = %e, "retired device worker ended with error");
            }
        }
        let result = worker.map_or(Ok(()), SamplingWorker::stop);
        info!(device = %self.id, "device polling stopped");
        result
    }

    fn launch(self: &Arc<Self>, period: Duration) -> Result<SamplingWorker, SensorError> {
        let device = Arc::downgrade(self);
        let id = self.id.clone();
        SamplingWorker::spawn(self.id.clone(), move |stop| {
            sample_loop(&id, period, &stop, |timestamp, scheduled| {
                poll_tick(&device, &stop, timestamp, scheduled)
            })
        })
    }

    fn deliver(&self, values: &[f64], timestamp: Timestamp, scheduled: Instant) {
        if values.len() != self.children.len() {
            warn!(
                device = %self.id,
                expected = self.children.len(),
                got = values.len(),
                "device returned wrong number of values"
            );
        }

        let state = lock(&self.state);
        for (index, registration) in &state.registrations {
            if registration.since > scheduled {
                continue;
            }
            if let Some(value) = values.get(*index) {
                registration.queue.push(Reading::new(timestamp, *value));
            }
        }
    }
}

fn poll_tick(
    device: &Weak<DeviceShared>,
    stop: &StopFlag,
    timestamp: Timestamp,
    scheduled: Instant,
) -> ControlFlow<()> {
    let Some(device) = device.upgrade() else {
        return ControlFlow::Break(());
    };

    let values = lock(&device.reader).read_all();
    if stop.is_set() {
        return ControlFlow::Break(());
    }
    match values {
        Ok(values) => device.deliver(&values, timestamp, scheduled),
        Err(e) => {
            counter!("sensor_feed_read_failures_total", "sensor" => device.id.to_string())
                .increment(1);
            warn!(device = %device.id, error = %e, "device read failed, tick skipped");
        }
    }
    ControlFlow::Continue(())
}

impl Drop for DeviceShared {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        for worker in state.worker.iter().chain(state.retired.iter()) {
            worker.request_stop();
        }
    }
}

/// A physical device exposing several logical child sensors
///
/// Cloning yields another handle to the same device.
#[derive(Clone)]
pub struct MultiSensorDevice {
    shared: Arc<DeviceShared>,
}

impl MultiSensorDevice {
    /// Create a device
    ///
    /// Every child inherits the device's period `bounds`, since all children
    /// are served by the same poll.
    pub fn new(
        name: impl Into<String>,
        id: impl Into<SensorId>,
        children: Vec<SensorDescriptor>,
        bounds: PeriodBounds,
        reader: impl DeviceReader,
    ) -> Self {
        let children = children
            .into_iter()
            .map(|child| child.with_bounds(bounds))
            .collect();

        Self {
            shared: Arc::new(DeviceShared {
                name: name.into(),
                id: id.into(),
                children,
                reader: Mutex::new(Box::new(reader)),
                state: Mutex::new(DeviceState::default()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    pub fn id(&self) -> &SensorId {
        &self.shared.id
    }

    /// Child sensors in device order
    pub fn sensors(&self) -> Vec<ChildSensor> {
        (0..self.shared.children.len())
            .map(|index| ChildSensor {
                device: Arc::clone(&self.shared),
                index,
            })
            .collect()
    }

    /// Whether the shared worker is alive
    pub fn is_polling(&self) -> bool {
        lock(&self.shared.state)
            .worker
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    /// Ids of the currently registered children
    pub fn active_children(&self) -> Vec<SensorId> {
        lock(&self.shared.state)
            .registrations
            .keys()
            .map(|index| self.shared.children[*index].id.clone())
            .collect()
    }
}

/// One logical sensor of a `MultiSensorDevice`
pub struct ChildSensor {
    device: Arc<DeviceShared>,
    index: usize,
}

impl ChildSensor {
    /// Name of the owning device
    pub fn device_name(&self) -> &str {
        &self.device.name
    }
}

impl Sensor for ChildSensor {
    fn descriptor(&self) -> &SensorDescriptor {
        &self.device.children[self.index]
    }

    fn start(&self, queue: ReadingSender, period: Duration) -> Result<(), SensorError> {
        self.device.register(self.index, queue, period)
    }

    fn stop(&self, join: bool) -> Result<(), SensorError> {
        self.device.deregister(self.index, join)
    }

    fn is_running(&self) -> bool {
        let state = lock(&self.device.state);
        state.registrations.contains_key(&self.index)
            && state
                .worker
                .as_ref()
                .is_some_and(|worker| !worker.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::reading_queue;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::thread;

    fn device(reads: Arc<AtomicUsize>) -> MultiSensorDevice {
        MultiSensorDevice::new(
            "demo",
            "demo",
            vec![
                SensorDescriptor::new("a", "a", "mm"),
                SensorDescriptor::new("b", "b", "%"),
            ],
            PeriodBounds::UNBOUNDED,
            move || {
                reads.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SensorError>(vec![1.2, 5.4])
            },
        )
    }

    #[test]
    fn test_one_worker_one_reading_per_child_per_tick() {
        let reads = Arc::new(AtomicUsize::new(0));
        let device = device(Arc::clone(&reads));
        let children = device.sensors();
        let (tx_a, rx_a) = reading_queue();
        let (tx_b, rx_b) = reading_queue();

        children[0].start(tx_a, Duration::from_millis(20)).unwrap();
        children[1].start(tx_b, Duration::from_millis(20)).unwrap();
        assert!(device.is_polling());
        assert_eq!(device.active_children().len(), 2);

        thread::sleep(Duration::from_millis(120));
        children[1].stop(true).unwrap();
        children[0].stop(true).unwrap();

        let reads = reads.load(Ordering::SeqCst);
        let a = rx_a.len();
        let b = rx_b.len();
        assert!(a == reads || a + 1 == reads, "a={a} reads={reads}");
        assert!(b >= 1 && b <= a, "a={a} b={b}");
        assert!(rx_a.drain().all(|r| r.value == 1.2));
        assert!(rx_b.drain().all(|r| r.value == 5.4));
    }

    #[test]
    fn test_child_registered_mid_read_gets_only_later_ticks() {
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut first = true;
        let device = MultiSensorDevice::new(
            "gated",
            "gated",
            vec![
                SensorDescriptor::new("a", "a", "1"),
                SensorDescriptor::new("b", "b", "1"),
            ],
            PeriodBounds::UNBOUNDED,
            move || {
                if mem::take(&mut first) {
                    let _ = entered_tx.send(());
                    let _ = release_rx.recv();
                }
                Ok::<_, SensorError>(vec![1.0, 2.0])
            },
        );
        let children = device.sensors();
        let (tx_a, rx_a) = reading_queue();
        let (tx_b, rx_b) = reading_queue();

        children[0].start(tx_a, Duration::from_millis(300)).unwrap();
        entered_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        children[1].start(tx_b, Duration::from_millis(300)).unwrap();
        release_tx.send(()).unwrap();

        // well before the second tick
        thread::sleep(Duration::from_millis(100));
        assert_eq!(rx_a.len(), 1);
        assert!(rx_b.is_empty());

        thread::sleep(Duration::from_millis(300));
        children[1].stop(true).unwrap();
        children[0].stop(true).unwrap();

        let a: Vec<Reading> = rx_a.drain().collect();
        let b: Vec<Reading> = rx_b.drain().collect();
        assert!(!b.is_empty());
        assert!(b.iter().all(|r| r.timestamp > a[0].timestamp && r.value == 2.0));
    }

    #[test]
    fn test_sibling_keeps_streaming() {
        let device = device(Arc::new(AtomicUsize::new(0)));
        let children = device.sensors();
        let (tx_a, rx_a) = reading_queue();
        let (tx_b, rx_b) = reading_queue();

        children[0].start(tx_a, Duration::from_millis(20)).unwrap();
        children[1].start(tx_b, Duration::from_millis(20)).unwrap();
        thread::sleep(Duration::from_millis(50));

        children[0].stop(true).unwrap();
        assert!(!children[0].is_running());
        assert!(children[1].is_running());
        assert!(device.is_polling());

        let a_before = rx_a.len();
        let b_before = rx_b.len();
        thread::sleep(Duration::from_millis(80));
        assert_eq!(rx_a.len(), a_before);
        assert!(rx_b.len() > b_before);

        children[1].stop(true).unwrap();
        assert!(!device.is_polling());
        assert!(device.active_children().is_empty());
    }

    #[test]
    fn test_duplicate_child() {
        let device = device(Arc::new(AtomicUsize::new(0)));
        let children = device.sensors();
        let (tx1, _rx1) = reading_queue();
        let (tx2, _rx2) = reading_queue();

        children[0].start(tx1, Duration::from_millis(50)).unwrap();
        let err = children[0].start(tx2, Duration::from_millis(50)).unwrap_err();
        assert!(matches!(err, SensorError::DuplicateChild { .. }));
        children[0].stop(true).unwrap();
    }

    #[test]
    fn test_device_bounds_apply_to_children() {
        let bounds = PeriodBounds::new(Some(Duration::from_secs(1)), None).unwrap();
        let device = MultiSensorDevice::new(
            "bounded",
            "bounded",
            vec![SensorDescriptor::new("x", "x", "1")],
            bounds,
            || Ok::<_, SensorError>(vec![0.0]),
        );
        let child = device.sensors().remove(0);
        assert_eq!(child.descriptor().bounds, bounds);

        let (tx, _rx) = reading_queue();
        let err = child.start(tx, Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, SensorError::InvalidPeriod { .. }));
        assert!(!device.is_polling());
        assert!(device.active_children().is_empty());
    }

    #[test]
    fn test_dead_worker_relaunched_on_next_registration() {
        let first = Arc::new(AtomicBool::new(true));
        let device = MultiSensorDevice::new(
            "sluggish",
            "sluggish",
            vec![
                SensorDescriptor::new("a", "a", "1"),
                SensorDescriptor::new("b", "b", "1"),
            ],
            PeriodBounds::UNBOUNDED,
            move || {
                if first.swap(false, Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(40));
                }
                Ok::<_, SensorError>(vec![1.0, 2.0])
            },
        );
        let children = device.sensors();
        let (tx_a, rx_a) = reading_queue();
        let (tx_b, rx_b) = reading_queue();

        children[0].start(tx_a, Duration::from_millis(20)).unwrap();
        thread::sleep(Duration::from_millis(80));
        assert!(!device.is_polling());
        assert_eq!(rx_a.len(), 1);

        children[1].start(tx_b, Duration::from_millis(20)).unwrap();
        assert!(device.is_polling());
        thread::sleep(Duration::from_millis(80));
        assert!(rx_a.len() > 1);
        assert!(!rx_b.is_empty());

        children[0].stop(true).unwrap();
        children[1].stop(true).unwrap();
    }

    #[test]
    fn test_non_joined_stop_retires_worker() {
        let device = device(Arc::new(AtomicUsize::new(0)));
        let children = device.sensors();
        let (tx, _rx) = reading_queue();

        children[0].start(tx, Duration::from_millis(20)).unwrap();
        children[0].stop(false).unwrap();
        assert!(device.active_children().is_empty());

        // Restarting launches a fresh worker; the joined stop reaps both
        let (tx, _rx) = reading_queue();
        children[0].start(tx, Duration::from_millis(20)).unwrap();
        assert!(device.is_polling());
        children[0].stop(true).unwrap();
        assert!(lock(&device.shared.state).retired.is_empty());
    }
}
