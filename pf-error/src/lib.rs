//! Unified error handling for pifan
//!
//! This crate provides the single error type used by the pifan crates.
//! Config warnings are not errors and live next to the config reader;
//! everything here either aborts a load or stops the control loop.

use std::io;
use std::path::PathBuf;

/// Result type alias using PifanError
pub type Result<T> = std::result::Result<T, PifanError>;

/// Unified error type for all pifan operations
#[derive(thiserror::Error, Debug)]
pub enum PifanError {
    // ============================================================================
    // I/O and File System Errors
    // ============================================================================
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Sensor Errors
    // ============================================================================
    #[error("Failed to read temperature from {path}: {reason}")]
    TemperatureRead {
        path: PathBuf,
        reason: String,
    },

    // ============================================================================
    // Hardware Output Errors
    // ============================================================================
    #[error("Failed to initialise pin {pin}: {reason}")]
    HardwareInit {
        pin: u32,
        reason: String,
    },

    #[error("Failed to write PWM to {path}: {reason}")]
    PwmWrite {
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to write GPIO {path}: {reason}")]
    GpioWrite {
        path: PathBuf,
        reason: String,
    },

    #[error("Pin {0} was used before it was configured")]
    PinNotConfigured(u32),

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig {
        field: String,
        reason: String,
    },

    #[error("Failed to render JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl PifanError {
    /// Create an invalid config error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a hardware initialisation error
    pub fn hardware_init(pin: u32, reason: impl Into<String>) -> Self {
        Self::HardwareInit {
            pin,
            reason: reason.into(),
        }
    }

    /// Whether the error came from the temperature sensor
    pub fn is_sensor_error(&self) -> bool {
        matches!(self, Self::TemperatureRead { .. })
    }
}
