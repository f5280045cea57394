//! Pifan Core Library
//!
//! Temperature driven fan control for single board computers.
//!
//! # Features
//!
//! - **Continuous control**: PWM duty cycle ramped between two temperatures,
//!   with an off/hold band for hysteresis
//! - **Staged control**: N on/off fan stages, each with its own thresholds
//! - **Hot reload**: INI config that can be re-read while running
//!
//! # Module Structure
//!
//! - `data/` - Config types, INI reader, validation
//! - `engine/` - Pure controller stepping functions
//! - `hw/` - Hardware traits and the sysfs backends
//! - `store` - Live config with atomic snapshots
//!
//! # Example
//!
//! ```
//! use pf_core::{engine::continuous, ControlConfig};
//!
//! let config = ControlConfig::default();
//! let step = continuous::step(None, 57.0, &config);
//! assert_eq!(step.command, Some(step.speed));
//! ```

// Grouped modules
pub mod data;
pub mod engine;
pub mod hw;

// Standalone modules
pub mod constants;
pub mod error;
pub mod store;

// Re-export primary types from data/
pub use data::{
    load_section, to_json, ConfigWarning, ControlConfig, Level, LoadOutcome, PinTransition,
    SectionConfig, Stage, StageConfig,
};

// Re-export error types
pub use error::{PifanError, Result};

// Re-export engine types
pub use engine::{ContinuousStep, DiscreteStep};

// Re-export hardware types from hw/
pub use hw::{wait_for_node, PinOutput, PwmOutput, SysfsGpio, SysfsPwm, TemperatureSource, ThermalZone};

pub use store::{ConfigStore, LoadReport};
