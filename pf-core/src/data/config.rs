//! Controller configuration
//!
//! Both controllers read one section of the fan control config file. Entries
//! overlay the current values field by field; the merged result is validated
//! as a whole before anyone gets to see it.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use configparser::ini::Ini;
use serde::{Deserialize, Serialize};

use crate::constants::{continuous, discrete, sections};
use crate::data::types::Stage;
use crate::data::validation::{
    validate_file_size, validate_percent, validate_positive, validate_speed_bounds,
    validate_stage_lists, validate_temperature_order,
};
use crate::error::{PifanError, Result};

/// Non-fatal problem found while reading a config file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// The file exists but has no section for this controller
    SectionMissing { section: String, path: PathBuf },
    /// Key not known to the controller
    UnknownKey { key: String },
    /// Value is not an integer (or a list element is not)
    NotAnInteger { key: String, value: String },
    /// Integer does not fit the field
    OutOfRange { key: String, value: String },
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::SectionMissing { section, path } => {
                write!(f, "No [{}] section found in config: {:?}", section, path)
            }
            ConfigWarning::UnknownKey { key } => write!(f, "Unknown config setting {:?}", key),
            ConfigWarning::NotAnInteger { key, value } => {
                write!(f, "Not an integer: {:?}={:?}", key, value)
            }
            ConfigWarning::OutOfRange { key, value } => {
                write!(f, "Value out of range: {:?}={:?}", key, value)
            }
        }
    }
}

/// A config that lives in one section of the config file
pub trait SectionConfig: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    /// Section name in the config file
    const SECTION: &'static str;

    /// Overwrite the field named by `key` (already lowercased)
    fn apply_entry(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigWarning>;

    /// Check the invariants across all fields
    fn validate(&self) -> Result<()>;

    /// Time between two samples
    fn sample_interval(&self) -> Duration;
}

/// Settings of the continuous (PWM duty cycle) controller
///
/// Field names double as config keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlConfig {
    /// BCM pin used to drive the PWM fan
    pub fan_pin: u32,
    /// Seconds between samples
    pub wait_time: u32,
    /// PWM frequency in Hz
    pub pwm_freq: u32,
    /// Below this the fan is switched to `fan_off` (°C)
    pub off_temp: i32,
    /// Above this the fan ramps from `fan_low` (°C)
    pub min_temp: i32,
    /// At this temperature the ramp reaches `fan_high` (°C)
    pub max_temp: i32,
    pub fan_low: u8,
    pub fan_high: u8,
    pub fan_off: u8,
    /// Ceiling applied to the ramp output
    pub fan_max: u8,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            fan_pin: continuous::FAN_PIN,
            wait_time: continuous::WAIT_TIME,
            pwm_freq: continuous::PWM_FREQ,
            off_temp: continuous::OFF_TEMP,
            min_temp: continuous::MIN_TEMP,
            max_temp: continuous::MAX_TEMP,
            fan_low: continuous::FAN_LOW,
            fan_high: continuous::FAN_HIGH,
            fan_off: continuous::FAN_OFF,
            fan_max: continuous::FAN_MAX,
        }
    }
}

impl SectionConfig for ControlConfig {
    const SECTION: &'static str = sections::CONTINUOUS;

    fn apply_entry(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigWarning> {
        match key {
            "fan_pin" => self.fan_pin = parse_int(key, value)?,
            "wait_time" => self.wait_time = parse_int(key, value)?,
            "pwm_freq" => self.pwm_freq = parse_int(key, value)?,
            "off_temp" => self.off_temp = parse_int(key, value)?,
            "min_temp" => self.min_temp = parse_int(key, value)?,
            "max_temp" => self.max_temp = parse_int(key, value)?,
            "fan_low" => self.fan_low = parse_int(key, value)?,
            "fan_high" => self.fan_high = parse_int(key, value)?,
            "fan_off" => self.fan_off = parse_int(key, value)?,
            "fan_max" => self.fan_max = parse_int(key, value)?,
            _ => return Err(ConfigWarning::UnknownKey { key: key.to_string() }),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_positive("wait_time", self.wait_time)?;
        validate_positive("pwm_freq", self.pwm_freq)?;
        validate_temperature_order(self.off_temp, self.min_temp, self.max_temp)?;
        validate_speed_bounds(self.fan_low, self.fan_high, self.fan_max)?;
        validate_percent("fan_off", self.fan_off)?;
        Ok(())
    }

    fn sample_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.wait_time))
    }
}

/// Settings of the staged (GPIO) controller
///
/// The three lists are parallel: entry `i` of each describes stage `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageConfig {
    pub wait_time: u32,
    pub fan_pins: Vec<u32>,
    pub on_temp: Vec<i32>,
    pub off_temp: Vec<i32>,
}

impl StageConfig {
    /// Stages in controller order
    pub fn stages(&self) -> Vec<Stage> {
        self.fan_pins
            .iter()
            .zip(&self.on_temp)
            .zip(&self.off_temp)
            .map(|((&pin, &on_temp), &off_temp)| Stage { pin, on_temp, off_temp })
            .collect()
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            wait_time: discrete::WAIT_TIME,
            fan_pins: discrete::FAN_PINS.to_vec(),
            on_temp: discrete::ON_TEMP.to_vec(),
            off_temp: discrete::OFF_TEMP.to_vec(),
        }
    }
}

impl SectionConfig for StageConfig {
    const SECTION: &'static str = sections::DISCRETE;

    fn apply_entry(&mut self, key: &str, value: &str) -> std::result::Result<(), ConfigWarning> {
        match key {
            "wait_time" => self.wait_time = parse_int(key, value)?,
            "fan_pins" => self.fan_pins = parse_int_list(key, value)?,
            "on_temp" => self.on_temp = parse_int_list(key, value)?,
            "off_temp" => self.off_temp = parse_int_list(key, value)?,
            _ => return Err(ConfigWarning::UnknownKey { key: key.to_string() }),
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        validate_positive("wait_time", self.wait_time)?;
        validate_stage_lists(&self.fan_pins, &self.on_temp, &self.off_temp)
    }

    fn sample_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.wait_time))
    }
}

/// Result of reading one config section on top of a base config
#[derive(Debug, Clone)]
pub struct LoadOutcome<C> {
    /// Merged and validated config
    pub config: C,
    pub warnings: Vec<ConfigWarning>,
    /// Whether the file existed at all
    pub source_found: bool,
    /// Number of entries that overwrote a field
    pub applied: usize,
}

/// Read the section of `C` from `path` and overlay it on `base`
///
/// A missing file is not an error: the base config comes back unchanged.
/// A merged config that fails validation is returned as an error and
/// nothing is applied.
pub fn load_section<C: SectionConfig>(base: &C, path: &Path) -> Result<LoadOutcome<C>> {
    if !path.exists() {
        return Ok(LoadOutcome {
            config: base.clone(),
            warnings: Vec::new(),
            source_found: false,
            applied: 0,
        });
    }

    let meta = fs::metadata(path).map_err(|e| PifanError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate_file_size(meta.len())?;

    let text = fs::read_to_string(path).map_err(|e| PifanError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let outcome = overlay_text(base, text, path)?;
    outcome.config.validate()?;
    Ok(outcome)
}

/// Overlay the section of `C` found in `text` on `base` without validating
///
/// Entries of `[DEFAULT]` apply to every section; the section's own
/// entries take precedence. Entries are applied in key order.
fn overlay_text<C: SectionConfig>(base: &C, text: String, path: &Path) -> Result<LoadOutcome<C>> {
    // lowercases section names and keys
    let mut parser = Ini::new();
    let parsed = parser
        .read(text)
        .map_err(|reason| PifanError::invalid_config("file", format!("{:?}: {}", path, reason)))?;

    let mut config = base.clone();
    let mut warnings = Vec::new();
    let mut applied = 0;

    let Some(section) = parsed.get(C::SECTION) else {
        warnings.push(ConfigWarning::SectionMissing {
            section: C::SECTION.to_string(),
            path: path.to_path_buf(),
        });
        return Ok(LoadOutcome { config, warnings, source_found: true, applied });
    };

    let mut entries: BTreeMap<&str, &str> = BTreeMap::new();
    for values in [parsed.get(sections::DEFAULT), Some(section)].into_iter().flatten() {
        for (key, value) in values {
            entries.insert(key.as_str(), value.as_deref().unwrap_or_default());
        }
    }

    for (key, value) in entries {
        match config.apply_entry(key, value) {
            Ok(()) => applied += 1,
            Err(warning) => warnings.push(warning),
        }
    }

    Ok(LoadOutcome { config, warnings, source_found: true, applied })
}

/// Render a config as pretty JSON
pub fn to_json<C: Serialize>(config: &C) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

fn parse_int<T: TryFrom<i64>>(key: &str, value: &str) -> std::result::Result<T, ConfigWarning> {
    let parsed = value.trim().parse::<i64>().map_err(|_| ConfigWarning::NotAnInteger {
        key: key.to_string(),
        value: value.to_string(),
    })?;
    T::try_from(parsed).map_err(|_| ConfigWarning::OutOfRange {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_int_list<T: TryFrom<i64>>(key: &str, value: &str) -> std::result::Result<Vec<T>, ConfigWarning> {
    value
        .split(',')
        .map(|item| parse_int(key, item))
        .collect::<std::result::Result<Vec<T>, _>>()
        .map_err(|warning| match warning {
            // report the whole list, not the element
            ConfigWarning::NotAnInteger { key, .. } => ConfigWarning::NotAnInteger { key, value: value.to_string() },
            ConfigWarning::OutOfRange { key, .. } => ConfigWarning::OutOfRange { key, value: value.to_string() },
            other => other,
        })
}
