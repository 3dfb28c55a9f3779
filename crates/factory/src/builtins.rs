//! Constructors for the built-in component kinds

use std::sync::Arc;
use std::time::Duration;

use contracts::{ComponentSpec, PeriodBounds, Sensor, SensorDescriptor, Sink};
use dispatcher::{CsvSink, LogSink, PrintingSink};
use ingestion::builtin::{self, Constant, FileValue, RiseAndFall, PROC_LOADAVG};
use ingestion::PeriodicSensor;

use crate::error::{FactoryError, Result};
use crate::registry::ComponentRegistry;

pub(crate) fn register_all(registry: &mut ComponentRegistry) {
    registry.register_sensor("constant", constant);
    registry.register_sensor("rise_and_fall", rise_and_fall);
    registry.register_sensor("cpu_load_average", cpu_load_average);
    registry.register_sensor("dummy", dummy);
    registry.register_sensor("file_value", file_value);
    registry.register_sensor("dummy_multi", dummy_multi);

    registry.register_sink("log", log_sink);
    registry.register_sink("printing", printing_sink);
    registry.register_sink("csv", csv_sink);
}

/// Descriptor from the common `name` / `id` / `unit` / period params
fn descriptor(spec: &ComponentSpec, default_name: &str, default_unit: &str) -> Result<SensorDescriptor> {
    let name = spec
        .param("name")
        .or(spec.name.as_deref())
        .unwrap_or(default_name);
    let id = spec
        .param("id")
        .map(Into::into)
        .unwrap_or_else(|| builtin::id_from_name(name));
    let unit = spec.param("unit").unwrap_or(default_unit);

    let min = spec.parse_param::<f64>("min_period_secs")?;
    let max = spec.parse_param::<f64>("max_period_secs")?;
    let bounds = PeriodBounds::new(secs(spec, min)?, secs(spec, max)?)?;

    Ok(SensorDescriptor::new(name, id, unit).with_bounds(bounds))
}

fn secs(spec: &ComponentSpec, value: Option<f64>) -> Result<Option<Duration>> {
    value
        .map(|secs| {
            Duration::try_from_secs_f64(secs).map_err(|e| {
                FactoryError::invalid_param(&spec.kind, format!("bad period {secs}: {e}"))
            })
        })
        .transpose()
}

fn shared<S: Sensor + 'static>(sensor: S) -> Vec<Arc<dyn Sensor>> {
    vec![Arc::new(sensor)]
}

fn constant(spec: &ComponentSpec) -> Result<Vec<Arc<dyn Sensor>>> {
    let value = spec.parse_param::<f64>("value")?.unwrap_or(1.0);
    let descriptor = descriptor(spec, "constant", "1")?;
    Ok(shared(PeriodicSensor::new(descriptor, Constant(value))))
}

fn rise_and_fall(spec: &ComponentSpec) -> Result<Vec<Arc<dyn Sensor>>> {
    let min = spec.parse_param::<f64>("min")?.unwrap_or(0.0);
    let max = spec.parse_param::<f64>("max")?.unwrap_or(10.0);
    let step = spec.parse_param::<f64>("step")?.unwrap_or(1.0);
    let source = RiseAndFall::new(min, max, step)?;

    if spec.params.is_empty() && spec.name.is_none() {
        return Ok(shared(builtin::rise_and_fall_sensor(source)));
    }
    let descriptor = descriptor(spec, "Rise and fall", "1")?;
    Ok(shared(PeriodicSensor::new(descriptor, source)))
}

fn cpu_load_average(spec: &ComponentSpec) -> Result<Vec<Arc<dyn Sensor>>> {
    let path = spec.param("path").unwrap_or(PROC_LOADAVG);
    Ok(shared(builtin::cpu_load_average_sensor(path)))
}

fn dummy(_spec: &ComponentSpec) -> Result<Vec<Arc<dyn Sensor>>> {
    Ok(shared(builtin::dummy_sensor()))
}

fn file_value(spec: &ComponentSpec) -> Result<Vec<Arc<dyn Sensor>>> {
    let path = spec
        .param("path")
        .ok_or_else(|| FactoryError::invalid_param(&spec.kind, "missing required param 'path'"))?;
    let scale = spec.parse_param::<f64>("scale")?.unwrap_or(1.0);
    let field = spec.parse_param::<usize>("field")?.unwrap_or(0);
    let descriptor = descriptor(spec, "file_value", "1")?;

    let source = FileValue::new(&descriptor.id, path)
        .with_scale(scale)
        .with_field(field);
    Ok(shared(PeriodicSensor::new(descriptor, source)))
}

fn dummy_multi(_spec: &ComponentSpec) -> Result<Vec<Arc<dyn Sensor>>> {
    Ok(builtin::dummy_multi_device()
        .sensors()
        .into_iter()
        .map(|child| Arc::new(child) as Arc<dyn Sensor>)
        .collect())
}

fn log_sink(_spec: &ComponentSpec, name: &str) -> Result<Box<dyn Sink>> {
    Ok(Box::new(LogSink::new(name)))
}

fn printing_sink(_spec: &ComponentSpec, name: &str) -> Result<Box<dyn Sink>> {
    Ok(Box::new(PrintingSink::stdout(name)))
}

fn csv_sink(spec: &ComponentSpec, name: &str) -> Result<Box<dyn Sink>> {
    Ok(Box::new(CsvSink::from_params(name, &spec.params)?))
}
