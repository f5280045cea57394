//! Thermal zone reader
//!
//! Linux thermal zones report millidegrees Celsius.

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{paths, temperature};
use crate::error::{PifanError, Result};

use super::TemperatureSource;

/// Temperature read from a sysfs thermal zone `temp` file
#[derive(Debug, Clone)]
pub struct ThermalZone {
    path: PathBuf,
}

impl ThermalZone {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for ThermalZone {
    fn default() -> Self {
        Self::new(paths::THERMAL_ZONE)
    }
}

impl TemperatureSource for ThermalZone {
    fn read_temperature(&mut self) -> Result<f64> {
        let content = fs::read_to_string(&self.path).map_err(|e| PifanError::TemperatureRead {
            path: self.path.clone(),
            reason: format!("Failed to read: {}", e),
        })?;

        let millidegrees: f64 = content.trim().parse().map_err(|e| PifanError::TemperatureRead {
            path: self.path.clone(),
            reason: format!("Failed to parse '{}': {}", content.trim(), e),
        })?;

        if !millidegrees.is_finite() {
            return Err(PifanError::TemperatureRead {
                path: self.path.clone(),
                reason: format!("Not a finite value: '{}'", content.trim()),
            });
        }

        Ok(millidegrees / temperature::MILLIDEGREE_DIVISOR)
    }
}
