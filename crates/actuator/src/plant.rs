//! PlantControl - threshold-triggered output that also reports its usage

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use contracts::{
    PeriodBounds, PlantControlConfig, SensorDescriptor, SensorError, Sink, SinkError, Timestamp,
};
use ingestion::{PeriodicSensor, ValueSource};
use metrics::counter;
use tracing::{error, info, instrument, warn};

use crate::error::{ActuatorError, Result};
use crate::output::OutputPin;
use crate::threshold::Threshold;
use crate::timer::ShutoffTimer;
use crate::lock;

/// Margin added to the action duration for the default minimum sampling period
const MIN_PERIOD_MARGIN: Duration = Duration::from_secs(2);

/// Behaviour of one plant controller
#[derive(Debug, Clone, PartialEq)]
pub struct PlantSettings {
    /// Parameter whose readings may trigger the action
    pub trigger_param: String,
    pub threshold: Threshold,
    /// How long the output stays active per action
    pub action_duration: Duration,
    /// Shortest sampling period of the usage sensor
    pub min_period: Duration,
    /// Parameter name the usage sensor reports under
    pub param_name: String,
}

impl PlantSettings {
    pub fn new(
        trigger_param: impl Into<String>,
        threshold: Threshold,
        action_duration: Duration,
    ) -> Self {
        Self {
            trigger_param: trigger_param.into(),
            threshold,
            action_duration,
            min_period: action_duration.saturating_add(MIN_PERIOD_MARGIN),
            param_name: "water_input".to_string(),
        }
    }

    /// Build settings from the config file section
    ///
    /// # Errors
    /// Rejects an empty trigger parameter, a non-finite threshold and an
    /// action duration that is not positive or too long to schedule.
    pub fn from_config(config: &PlantControlConfig) -> Result<Self> {
        if config.trigger_param.trim().is_empty() {
            return Err(ActuatorError::invalid_setting(
                "trigger_param",
                "must not be empty",
            ));
        }
        if !config.threshold.is_finite() {
            return Err(ActuatorError::invalid_setting(
                "threshold",
                format!("must be finite, got {}", config.threshold),
            ));
        }
        let schedulable = config.action_duration_secs > 0.0
            && Duration::try_from_secs_f64(config.action_duration_secs)
                .is_ok_and(|duration| Instant::now().checked_add(duration).is_some());
        if !schedulable {
            return Err(ActuatorError::invalid_setting(
                "action_duration_secs",
                format!(
                    "must be a positive schedulable duration, got {}",
                    config.action_duration_secs
                ),
            ));
        }

        Ok(Self {
            trigger_param: config.trigger_param.clone(),
            threshold: Threshold {
                level: config.threshold,
                direction: config.direction,
            },
            action_duration: config.action_duration(),
            min_period: config.min_period(),
            param_name: config.param_name.clone(),
        })
    }

    /// Override the parameter name of the usage sensor
    pub fn with_param_name(mut self, param_name: impl Into<String>) -> Self {
        self.param_name = param_name.into();
        self
    }

    /// Override the minimum sampling period of the usage sensor
    pub fn with_min_period(mut self, min_period: Duration) -> Self {
        self.min_period = min_period;
        self
    }
}

impl Default for PlantSettings {
    fn default() -> Self {
        Self::new("soil", Threshold::above(1300.0), Duration::from_secs(20))
    }
}

struct PlantState {
    settings: PlantSettings,
    output_label: String,
    /// Output applied since the last read, in nanoseconds
    applied_ns: AtomicU64,
    busy: Arc<AtomicBool>,
    output: Arc<Mutex<Box<dyn OutputPin>>>,
    timer: Mutex<Option<ShutoffTimer>>,
}

impl PlantState {
    #[instrument(name = "plant_apply_action", skip(self), fields(output = %self.output_label))]
    fn apply_action(&self) -> Result<()> {
        let duration = self.settings.action_duration;
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        // the closure never returns None
        let _ = self
            .applied_ns
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |total| {
                Some(total.saturating_add(nanos))
            });
        info!(duration = ?duration, "action requested");

        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            warn!("action already underway");
            return Ok(());
        }

        counter!("sensor_feed_actuations_total").increment(1);
        let activated = lock(&self.output)
            .set_active(true)
            .map_err(|e| ActuatorError::output(&self.output_label, e));
        match &activated {
            Ok(()) => info!("output on"),
            Err(e) => error!(error = %e, "failed to switch output on"),
        }

        let output = Arc::clone(&self.output);
        let busy = Arc::clone(&self.busy);
        let label = self.output_label.clone();
        let timer = ShutoffTimer::schedule(duration, move || {
            switch_off(&output, &label);
            busy.store(false, Ordering::SeqCst);
        });

        match timer {
            Ok(timer) => {
                let previous = lock(&self.timer).replace(timer);
                if let Some(previous) = previous {
                    previous.join();
                }
                activated
            }
            Err(e) => {
                switch_off(&self.output, &self.output_label);
                self.busy.store(false, Ordering::SeqCst);
                activated.and(Err(ActuatorError::TimerSpawn(e)))
            }
        }
    }

    fn take_applied(&self) -> Duration {
        Duration::from_nanos(self.applied_ns.swap(0, Ordering::SeqCst))
    }
}

fn switch_off(output: &Mutex<Box<dyn OutputPin>>, label: &str) {
    match lock(output).set_active(false) {
        Ok(()) => info!(output = %label, "output off"),
        Err(e) => error!(output = %label, error = %e, "failed to switch output off"),
    }
}

impl Drop for PlantState {
    fn drop(&mut self) {
        let timer = match self.timer.get_mut() {
            Ok(slot) => slot.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(timer) = timer {
            timer.cancel();
        }
        match lock(&self.output).set_active(false) {
            Ok(()) => info!(output = %self.output_label, "ensure output off"),
            Err(e) => error!(output = %self.output_label, error = %e, "failed to ensure output off"),
        }
    }
}

/// Threshold-triggered actuator, usable as a sensor and as a sink
///
/// Clones share the same state; the output is forced off when the last
/// handle (including sensors and sinks created from it) is dropped.
#[derive(Clone)]
pub struct PlantControl {
    state: Arc<PlantState>,
}

impl PlantControl {
    pub fn new(settings: PlantSettings, output: Box<dyn OutputPin>) -> Self {
        Self {
            state: Arc::new(PlantState {
                output_label: output.label(),
                settings,
                applied_ns: AtomicU64::new(0),
                busy: Arc::new(AtomicBool::new(false)),
                output: Arc::new(Mutex::new(output)),
                timer: Mutex::new(None),
            }),
        }
    }

    pub fn settings(&self) -> &PlantSettings {
        &self.state.settings
    }

    /// Trigger the action regardless of any reading
    ///
    /// # Errors
    /// Returns the output failure when switching on fails; the shutoff is
    /// still scheduled in that case.
    pub fn apply_action(&self) -> Result<()> {
        self.state.apply_action()
    }

    /// Whether an action is in progress
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::SeqCst)
    }

    /// Output time applied since the last call, resetting the counter
    pub fn take_applied(&self) -> Duration {
        self.state.take_applied()
    }

    /// Usage sensor reporting seconds of output since its last reading
    pub fn sensor(&self) -> PlantSensor {
        let settings = &self.state.settings;
        let descriptor = SensorDescriptor::new(
            settings.param_name.clone(),
            settings.param_name.as_str(),
            "seconds",
        )
        .with_bounds(PeriodBounds::at_least(settings.min_period));

        PeriodicSensor::new(
            descriptor,
            AppliedOutput {
                state: Arc::clone(&self.state),
            },
        )
    }

    /// Sink reacting to the trigger parameter
    pub fn sink(&self) -> PlantSink {
        PlantSink {
            name: "plant_control".to_string(),
            state: Arc::clone(&self.state),
        }
    }
}

/// Value source behind `PlantSensor`
pub struct AppliedOutput {
    state: Arc<PlantState>,
}

impl ValueSource for AppliedOutput {
    fn read_value(&mut self) -> std::result::Result<f64, SensorError> {
        Ok(self.state.take_applied().as_secs_f64())
    }
}

/// Sensor half of `PlantControl`
pub type PlantSensor = PeriodicSensor<AppliedOutput>;

/// Sink half of `PlantControl`
pub struct PlantSink {
    name: String,
    state: Arc<PlantState>,
}

impl PlantSink {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl Sink for PlantSink {
    fn name(&self) -> &str {
        &self.name
    }

    fn process_value(
        &mut self,
        param_name: &str,
        _timestamp: Timestamp,
        value: f64,
    ) -> std::result::Result<(), SinkError> {
        let settings = &self.state.settings;
        if param_name != settings.trigger_param || !settings.threshold.is_met(value) {
            return Ok(());
        }
        self.state
            .apply_action()
            .map_err(|e| SinkError::process(&self.name, param_name, e.to_string()))
    }
}
