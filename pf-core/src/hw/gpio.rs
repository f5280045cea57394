//! Digital outputs through the legacy sysfs GPIO interface

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::paths;
use crate::data::Level;
use crate::error::{PifanError, Result};

use super::PinOutput;

/// Output pins under a sysfs GPIO root such as `/sys/class/gpio`
#[derive(Debug)]
pub struct SysfsGpio {
    root: PathBuf,
    configured: Vec<u32>,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into(), configured: Vec::new() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Pins configured so far, in configuration order
    pub fn configured(&self) -> &[u32] {
        &self.configured
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{}", pin))
    }

    fn write(&self, pin: u32, attr: &str, value: &str) -> Result<()> {
        let path = self.pin_dir(pin).join(attr);
        fs::write(&path, value).map_err(|e| PifanError::GpioWrite {
            path: path.clone(),
            reason: e.to_string(),
        })
    }

    fn release(&self, pin: u32) -> Result<()> {
        self.write(pin, "value", Level::Low.as_sysfs())?;
        self.write(pin, "direction", "in")?;
        let unexport = self.root.join("unexport");
        fs::write(&unexport, pin.to_string()).map_err(|e| PifanError::GpioWrite {
            path: unexport.clone(),
            reason: e.to_string(),
        })
    }
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(paths::GPIO_ROOT)
    }
}

impl PinOutput for SysfsGpio {
    fn export(&mut self, pin: u32) -> Result<Option<PathBuf>> {
        let dir = self.pin_dir(pin);
        if dir.exists() {
            return Ok(None);
        }

        debug!("Exporting GPIO {}", pin);
        fs::write(self.root.join("export"), pin.to_string())
            .map_err(|e| PifanError::hardware_init(pin, format!("Failed to export: {}", e)))?;
        Ok(Some(dir))
    }

    fn configure_pin(&mut self, pin: u32) -> Result<()> {
        let dir = self.pin_dir(pin);
        if !dir.exists() {
            return Err(PifanError::hardware_init(pin, format!("{:?} is not exported", dir)));
        }

        // "low" sets output mode with the line already driven low
        self.write(pin, "direction", "low")
            .map_err(|e| PifanError::hardware_init(pin, e.to_string()))?;

        if !self.configured.contains(&pin) {
            self.configured.push(pin);
        }
        Ok(())
    }

    fn write_pin(&mut self, pin: u32, level: Level) -> Result<()> {
        if !self.configured.contains(&pin) {
            return Err(PifanError::PinNotConfigured(pin));
        }
        self.write(pin, "value", level.as_sysfs())
    }

    fn cleanup(&mut self) -> Result<()> {
        let mut first_error = None;
        for pin in std::mem::take(&mut self.configured) {
            if let Err(e) = self.release(pin) {
                warn!("Failed to release GPIO {}: {}", pin, e);
                first_error = first_error.or(Some(e));
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn root_with_pins(pins: &[u32]) -> (TempDir, SysfsGpio) {
        let dir = TempDir::new().unwrap();
        for pin in pins {
            fs::create_dir(dir.path().join(format!("gpio{}", pin))).unwrap();
        }
        let gpio = SysfsGpio::new(dir.path());
        (dir, gpio)
    }

    fn read(dir: &TempDir, rel: &str) -> String {
        fs::read_to_string(dir.path().join(rel)).unwrap()
    }

    #[test]
    fn test_configure_sets_output_low() {
        let (dir, mut gpio) = root_with_pins(&[18]);
        gpio.configure_pin(18).unwrap();
        assert_eq!(read(&dir, "gpio18/direction"), "low");
        assert_eq!(gpio.configured(), &[18]);
    }

    #[test]
    fn test_configure_twice_is_tracked_once() {
        let (_dir, mut gpio) = root_with_pins(&[18]);
        gpio.configure_pin(18).unwrap();
        gpio.configure_pin(18).unwrap();
        assert_eq!(gpio.configured(), &[18]);
    }

    #[test]
    fn test_write_levels() {
        let (dir, mut gpio) = root_with_pins(&[5, 6]);
        gpio.configure_pin(5).unwrap();
        gpio.configure_pin(6).unwrap();
        gpio.write_pin(5, Level::High).unwrap();
        gpio.write_pin(6, Level::Low).unwrap();
        assert_eq!(read(&dir, "gpio5/value"), "1");
        assert_eq!(read(&dir, "gpio6/value"), "0");
    }

    #[test]
    fn test_write_unconfigured_pin_fails() {
        let (_dir, mut gpio) = root_with_pins(&[5]);
        assert!(matches!(gpio.write_pin(5, Level::High), Err(PifanError::PinNotConfigured(5))));
    }

    #[test]
    fn test_export_requests_missing_pin() {
        let (dir, mut gpio) = root_with_pins(&[5]);
        assert_eq!(gpio.export(5).unwrap(), None);
        assert_eq!(gpio.export(23).unwrap(), Some(dir.path().join("gpio23")));
        assert_eq!(read(&dir, "export"), "23");
    }

    #[test]
    fn test_configure_unexported_pin_is_init_error() {
        let (_dir, mut gpio) = root_with_pins(&[]);
        let err = gpio.configure_pin(23).unwrap_err();
        assert!(matches!(err, PifanError::HardwareInit { pin: 23, .. }));
        assert!(gpio.configured().is_empty());
    }

    #[test]
    fn test_cleanup_releases_all_pins() {
        let (dir, mut gpio) = root_with_pins(&[5, 6]);
        gpio.configure_pin(5).unwrap();
        gpio.configure_pin(6).unwrap();
        gpio.write_pin(6, Level::High).unwrap();
        gpio.cleanup().unwrap();

        for pin in ["gpio5", "gpio6"] {
            assert_eq!(read(&dir, &format!("{}/value", pin)), "0");
            assert_eq!(read(&dir, &format!("{}/direction", pin)), "in");
        }
        // last unexport written wins
        assert_eq!(read(&dir, "unexport"), "6");
        assert!(gpio.configured().is_empty());
        assert!(gpio.cleanup().is_ok());
    }
}
