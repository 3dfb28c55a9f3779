//! ComponentRegistry - maps config kinds to constructors
//!
//! Kinds are plain strings so new sensors and sinks can be registered by a
//! binary without touching this crate.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use actuator::{MemoryPin, OutputPin, PlantControl, PlantSettings, SysfsGpioPin};
use contracts::{ComponentSpec, FeedBlueprint, OutputKind, PlantControlConfig, Sensor, Sink};
use dispatcher::FeedController;
use tracing::{debug, info, instrument};

use crate::builtins;
use crate::error::{FactoryError, Result};

/// Builds one or more sensors from a spec (devices expand to their children)
pub type SensorConstructor = fn(&ComponentSpec) -> Result<Vec<Arc<dyn Sensor>>>;

/// Builds a sink from a spec and its resolved instance name
pub type SinkConstructor = fn(&ComponentSpec, &str) -> Result<Box<dyn Sink>>;

/// Knobs for `ComponentRegistry::resolve_with`
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveOptions {
    /// Replace hardware outputs with in-memory ones
    pub simulate_outputs: bool,
}

/// Live components built from a blueprint, ready to hand to a controller
pub struct ResolvedFeed {
    pub sensors: Vec<Arc<dyn Sensor>>,
    pub sinks: Vec<Box<dyn Sink>>,
    pub plant: Option<PlantControl>,
    pub sensor_period: Duration,
    pub poll_wait: Duration,
}

impl ResolvedFeed {
    /// Parameter names in start order
    pub fn sensor_names(&self) -> Vec<String> {
        self.sensors
            .iter()
            .map(|sensor| sensor.descriptor().name.clone())
            .collect()
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks.iter().map(|sink| sink.name().to_string()).collect()
    }

    /// Build the controller; the plant handle is dropped along with it
    pub fn into_controller(self) -> FeedController {
        FeedController::new(self.sensors, self.sinks, self.sensor_period)
            .with_poll_wait(self.poll_wait)
    }
}

/// Registry of sensor and sink constructors keyed by kind
#[derive(Clone)]
pub struct ComponentRegistry {
    sensors: BTreeMap<String, SensorConstructor>,
    sinks: BTreeMap<String, SinkConstructor>,
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl ComponentRegistry {
    /// Registry with no kinds at all
    pub fn empty() -> Self {
        Self {
            sensors: BTreeMap::new(),
            sinks: BTreeMap::new(),
        }
    }

    /// Registry with every built-in kind
    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        builtins::register_all(&mut registry);
        registry
    }

    /// Register (or replace) a sensor kind
    pub fn register_sensor(&mut self, kind: impl Into<String>, constructor: SensorConstructor) {
        self.sensors.insert(kind.into(), constructor);
    }

    /// Register (or replace) a sink kind
    pub fn register_sink(&mut self, kind: impl Into<String>, constructor: SinkConstructor) {
        self.sinks.insert(kind.into(), constructor);
    }

    pub fn sensor_kinds(&self) -> Vec<&str> {
        self.sensors.keys().map(String::as_str).collect()
    }

    pub fn sink_kinds(&self) -> Vec<&str> {
        self.sinks.keys().map(String::as_str).collect()
    }

    /// Build every sensor, in spec order, expanding devices in place
    pub fn build_sensors(&self, specs: &[ComponentSpec]) -> Result<Vec<Arc<dyn Sensor>>> {
        let mut sensors = Vec::with_capacity(specs.len());
        for spec in specs {
            let constructor = self.sensors.get(&spec.kind).ok_or_else(|| {
                unknown("sensor", &spec.kind, self.sensors.keys())
            })?;
            let built = constructor(spec)?;
            debug!(kind = %spec.kind, count = built.len(), "sensor spec built");
            sensors.extend(built);
        }
        Ok(sensors)
    }

    /// Build every sink, in spec order
    ///
    /// The instance name is `spec.name`, falling back to the kind.
    pub fn build_sinks(&self, specs: &[ComponentSpec]) -> Result<Vec<Box<dyn Sink>>> {
        specs
            .iter()
            .map(|spec| {
                let constructor = self
                    .sinks
                    .get(&spec.kind)
                    .ok_or_else(|| unknown("sink", &spec.kind, self.sinks.keys()))?;
                let name = spec.name.as_deref().unwrap_or(&spec.kind);
                constructor(spec, name)
            })
            .collect()
    }

    /// Resolve with real outputs
    pub fn resolve(&self, blueprint: &FeedBlueprint) -> Result<ResolvedFeed> {
        self.resolve_with(blueprint, ResolveOptions::default())
    }

    /// Turn a blueprint into live components
    ///
    /// When plant control is configured its usage sensor is appended after
    /// the configured sensors and its sink after the configured sinks.
    #[instrument(name = "registry_resolve", skip_all, fields(simulate = options.simulate_outputs))]
    pub fn resolve_with(
        &self,
        blueprint: &FeedBlueprint,
        options: ResolveOptions,
    ) -> Result<ResolvedFeed> {
        let mut sensors = self.build_sensors(&blueprint.sensors)?;
        let mut sinks = self.build_sinks(&blueprint.sinks)?;

        let plant = match &blueprint.plant_control {
            Some(config) => {
                let plant = build_plant(config, options)?;
                sensors.push(Arc::new(plant.sensor()));
                sinks.push(Box::new(plant.sink()));
                Some(plant)
            }
            None => None,
        };

        info!(
            sensors = sensors.len(),
            sinks = sinks.len(),
            plant = plant.is_some(),
            "feed resolved"
        );
        Ok(ResolvedFeed {
            sensors,
            sinks,
            plant,
            sensor_period: blueprint.feed.sensor_period(),
            poll_wait: blueprint.feed.poll_wait(),
        })
    }
}

fn build_plant(config: &PlantControlConfig, options: ResolveOptions) -> Result<PlantControl> {
    let settings = PlantSettings::from_config(config)?;
    let output: Box<dyn OutputPin> = match config.output {
        OutputKind::Memory => Box::new(MemoryPin::new(&config.param_name)),
        OutputKind::SysfsGpio if options.simulate_outputs => {
            Box::new(MemoryPin::new(format!("gpio{}", config.gpio_pin)))
        }
        OutputKind::SysfsGpio => {
            Box::new(SysfsGpioPin::open(config.gpio_pin).map_err(|source| {
                FactoryError::Output {
                    output: format!("gpio{}", config.gpio_pin),
                    source,
                }
            })?)
        }
    };
    Ok(PlantControl::new(settings, output))
}

fn unknown<'a>(
    category: &'static str,
    kind: &str,
    known: impl Iterator<Item = &'a String>,
) -> FactoryError {
    FactoryError::UnknownKind {
        category,
        kind: kind.to_string(),
        known: known.map(String::as_str).collect::<Vec<_>>().join(", "),
    }
}
