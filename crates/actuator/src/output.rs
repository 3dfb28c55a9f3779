//! Physical outputs driven by the actuator

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

/// Default sysfs GPIO class directory
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// A two-state output (valve, pump relay, ...)
pub trait OutputPin: Send {
    /// Human-readable identity for logs and errors
    fn label(&self) -> String;

    /// Drive the output active (`true`) or inactive (`false`)
    fn set_active(&mut self, active: bool) -> io::Result<()>;
}

#[derive(Debug, Default)]
struct MemoryPinState {
    active: AtomicBool,
    activations: AtomicUsize,
}

/// In-process output that only records its state
///
/// Clones observe the same state, which makes it handy for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPin {
    name: String,
    state: Arc<MemoryPinState>,
}

impl MemoryPin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::default(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active.load(Ordering::SeqCst)
    }

    /// Number of inactive -> active transitions
    pub fn activations(&self) -> usize {
        self.state.activations.load(Ordering::SeqCst)
    }
}

impl OutputPin for MemoryPin {
    fn label(&self) -> String {
        format!("memory:{}", self.name)
    }

    fn set_active(&mut self, active: bool) -> io::Result<()> {
        let was = self.state.active.swap(active, Ordering::SeqCst);
        if active && !was {
            self.state.activations.fetch_add(1, Ordering::SeqCst);
        }
        info!(output = %self.label(), active, "memory output set");
        Ok(())
    }
}

/// GPIO line driven through the legacy sysfs interface
#[derive(Debug)]
pub struct SysfsGpioPin {
    pin: u32,
    value_path: PathBuf,
}

impl SysfsGpioPin {
    /// Export `pin` under `/sys/class/gpio` and configure it as an output
    pub fn open(pin: u32) -> io::Result<Self> {
        Self::open_at(SYSFS_GPIO_ROOT, pin)
    }

    /// Same as `open`, with an explicit class directory
    pub fn open_at(root: impl AsRef<Path>, pin: u32) -> io::Result<Self> {
        let root = root.as_ref();
        let line = root.join(format!("gpio{pin}"));
        if !line.exists() {
            debug!(pin, "exporting gpio");
            fs::write(root.join("export"), pin.to_string())?;
        }
        fs::write(line.join("direction"), "out")?;

        Ok(Self {
            pin,
            value_path: line.join("value"),
        })
    }

    pub fn pin(&self) -> u32 {
        self.pin
    }
}

impl OutputPin for SysfsGpioPin {
    fn label(&self) -> String {
        format!("gpio{}", self.pin)
    }

    fn set_active(&mut self, active: bool) -> io::Result<()> {
        fs::write(&self.value_path, if active { "1" } else { "0" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_pin_counts_activations() {
        let pin = MemoryPin::new("valve");
        let mut driver = pin.clone();

        driver.set_active(true).unwrap();
        driver.set_active(true).unwrap();
        assert!(pin.is_active());
        driver.set_active(false).unwrap();
        driver.set_active(true).unwrap();
        assert_eq!(pin.activations(), 2);
    }

    #[test]
    fn test_sysfs_gpio_writes_value() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("gpio17")).unwrap();

        let mut pin = SysfsGpioPin::open_at(root.path(), 17).unwrap();
        assert_eq!(
            fs::read_to_string(root.path().join("gpio17/direction")).unwrap(),
            "out"
        );

        pin.set_active(true).unwrap();
        let value = root.path().join("gpio17/value");
        assert_eq!(fs::read_to_string(&value).unwrap(), "1");
        pin.set_active(false).unwrap();
        assert_eq!(fs::read_to_string(&value).unwrap(), "0");
    }

    #[test]
    fn test_sysfs_gpio_exports_missing_line() {
        let root = tempdir().unwrap();
        // no kernel behind the tempdir, so the line never appears
        assert!(SysfsGpioPin::open_at(root.path(), 4).is_err());
        assert_eq!(
            fs::read_to_string(root.path().join("export")).unwrap(),
            "4"
        );
    }
}
