//! Data types, configuration, and validation modules
//!
//! Contains the config types of both controllers, their loader and validation.

mod config;
mod types;
mod validation;

pub use config::{
    load_section, to_json, ConfigWarning, ControlConfig, LoadOutcome, SectionConfig, StageConfig,
};
pub use types::{Level, PinTransition, Stage};
pub use validation::{
    validate_file_size, validate_percent, validate_positive, validate_speed_bounds,
    validate_stage_lists, validate_temperature_order, validate_threshold,
};
