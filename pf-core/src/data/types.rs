//! Core data types for pifan
//!
//! Shared by the engines, the hardware backends and the daemon.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Output level of a GPIO pin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// Value written to a sysfs `value` file
    pub fn as_sysfs(self) -> &'static str {
        match self {
            Level::Low => "0",
            Level::High => "1",
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Low => write!(f, "low"),
            Level::High => write!(f, "high"),
        }
    }
}

/// One fan stage of the staged controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage {
    /// BCM pin switched on for this stage
    pub pin: u32,
    /// Temperature at or above which the stage turns on (°C)
    pub on_temp: i32,
    /// Temperature below which the stage turns off (°C), exclusive
    pub off_temp: i32,
}

/// A single pin write emitted by the staged controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinTransition {
    pub pin: u32,
    pub level: Level,
}

impl PinTransition {
    pub fn on(pin: u32) -> Self {
        Self { pin, level: Level::High }
    }

    pub fn off(pin: u32) -> Self {
        Self { pin, level: Level::Low }
    }
}
