//! Validation of config values
//!
//! Every check returns `InvalidConfig` naming the offending field. Callers
//! run these against a fully merged config, never against single entries.

use std::collections::HashSet;

use tracing::warn;

use crate::constants::{limits, percent, temperature};
use crate::error::{PifanError, Result};

/// Validates that an interval or frequency is non-zero
pub fn validate_positive(field: &str, value: u32) -> Result<()> {
    if value == 0 {
        return Err(PifanError::invalid_config(field, "must be greater than 0"));
    }
    Ok(())
}

/// Validates that a duty cycle percentage is within 0-100
pub fn validate_percent(field: &str, value: u8) -> Result<()> {
    if value > percent::MAX {
        return Err(PifanError::invalid_config(
            field,
            format!("{} is outside {}..={}", value, percent::MIN, percent::MAX),
        ));
    }
    Ok(())
}

/// Validates that a threshold is a plausible temperature
pub fn validate_threshold(field: &str, value: i32) -> Result<()> {
    if !(temperature::MIN_THRESHOLD..=temperature::MAX_THRESHOLD).contains(&value) {
        return Err(PifanError::invalid_config(
            field,
            format!(
                "{}°C is outside {}..={}",
                value,
                temperature::MIN_THRESHOLD,
                temperature::MAX_THRESHOLD
            ),
        ));
    }
    Ok(())
}

/// Validates `off_temp < min_temp < max_temp`, all within the threshold range
pub fn validate_temperature_order(off_temp: i32, min_temp: i32, max_temp: i32) -> Result<()> {
    validate_threshold("off_temp", off_temp)?;
    validate_threshold("min_temp", min_temp)?;
    validate_threshold("max_temp", max_temp)?;
    if off_temp >= min_temp {
        return Err(PifanError::invalid_config(
            "off_temp",
            format!("must be below min_temp ({} >= {})", off_temp, min_temp),
        ));
    }
    if min_temp >= max_temp {
        return Err(PifanError::invalid_config(
            "min_temp",
            format!("must be below max_temp ({} >= {})", min_temp, max_temp),
        ));
    }
    Ok(())
}

/// Validates `fan_low <= fan_high <= fan_max <= 100`
pub fn validate_speed_bounds(fan_low: u8, fan_high: u8, fan_max: u8) -> Result<()> {
    validate_percent("fan_max", fan_max)?;
    if fan_low > fan_high {
        return Err(PifanError::invalid_config(
            "fan_low",
            format!("must not exceed fan_high ({} > {})", fan_low, fan_high),
        ));
    }
    if fan_high > fan_max {
        return Err(PifanError::invalid_config(
            "fan_high",
            format!("must not exceed fan_max ({} > {})", fan_high, fan_max),
        ));
    }
    Ok(())
}

/// Validates the parallel stage lists and the ordering the staged controller relies on
///
/// `off_temp > on_temp` removes the hysteresis band of a stage but is allowed;
/// it is only logged.
pub fn validate_stage_lists(fan_pins: &[u32], on_temp: &[i32], off_temp: &[i32]) -> Result<()> {
    if fan_pins.is_empty() {
        return Err(PifanError::invalid_config("fan_pins", "at least one stage is required"));
    }
    if fan_pins.len() > limits::MAX_STAGES {
        return Err(PifanError::invalid_config(
            "fan_pins",
            format!("too many stages (max {})", limits::MAX_STAGES),
        ));
    }
    if on_temp.len() != fan_pins.len() {
        return Err(PifanError::invalid_config(
            "on_temp",
            format!("has {} entries, fan_pins has {}", on_temp.len(), fan_pins.len()),
        ));
    }
    if off_temp.len() != fan_pins.len() {
        return Err(PifanError::invalid_config(
            "off_temp",
            format!("has {} entries, fan_pins has {}", off_temp.len(), fan_pins.len()),
        ));
    }

    for (on, off) in on_temp.iter().zip(off_temp) {
        validate_threshold("on_temp", *on)?;
        validate_threshold("off_temp", *off)?;
    }

    let mut seen = HashSet::new();
    for pin in fan_pins {
        if !seen.insert(*pin) {
            return Err(PifanError::invalid_config("fan_pins", format!("pin {} listed twice", pin)));
        }
    }

    for (idx, pair) in on_temp.windows(2).enumerate() {
        if pair[1] < pair[0] {
            return Err(PifanError::invalid_config(
                "on_temp",
                format!("stage {} turns on below stage {} ({} < {})", idx + 1, idx, pair[1], pair[0]),
            ));
        }
    }

    for (idx, (on, off)) in on_temp.iter().zip(off_temp).enumerate() {
        if off > on {
            warn!("Stage {} has off_temp {} above on_temp {}: no hysteresis band", idx, off, on);
        }
    }

    Ok(())
}

/// Validates the config file size before reading it
pub fn validate_file_size(size: u64) -> Result<()> {
    if size > limits::MAX_CONFIG_SIZE {
        return Err(PifanError::invalid_config(
            "file",
            format!("{} bytes exceeds the {} byte limit", size, limits::MAX_CONFIG_SIZE),
        ));
    }
    Ok(())
}
