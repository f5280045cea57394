/*
 * This file is part of Pifan.
 *
 * Copyright (C) 2025 Pifan contributors
 *
 * Pifan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Pifan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Pifan. If not, see <https://www.gnu.org/licenses/>.
 */

//! Command Line Interface

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use pf_core::constants::paths;
use pf_core::{load_section, to_json, ConfigWarning, Result, SectionConfig};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(name = "pifand")]
#[command(version)]
#[command(about = "Pifan - temperature driven fan control")]
#[command(long_about = "Pifan - temperature driven fan control

Drives a PWM fan, or a set of on/off fan stages, from the CPU temperature.

EXAMPLES:
    pifand                             Run the PWM controller (default)
    pifand stages                      Run the staged GPIO controller
    pifand check-config                Print the effective PWM config as JSON
    pifand -c ./fan.cfg check-config --stages

SIGNALS:
    SIGTERM, SIGINT        Stop, switch the fan off and release the pins
    SIGUSR1, SIGHUP        Reload the config file

ENVIRONMENT VARIABLES:
    PIFAN_LOG=debug        Log level (trace, debug, info, warn, error)

FILES:
    /etc/fan_control.cfg   Config, sections [fan_control] and [fan_control_discrete]")]
pub struct Cli {
    /// Config file
    #[arg(short, long, default_value = paths::CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Thermal zone file reporting millidegrees
    #[arg(long, default_value = paths::THERMAL_ZONE, global = true)]
    pub sensor: PathBuf,

    /// sysfs PWM chip used by the PWM controller
    #[arg(long, default_value = paths::PWM_CHIP, global = true)]
    pub pwm_chip: PathBuf,

    /// sysfs GPIO root used by the staged controller
    #[arg(long, default_value = paths::GPIO_ROOT, global = true)]
    pub gpio_root: PathBuf,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Ramp a PWM fan between min_temp and max_temp (default)
    Pwm,

    /// Switch fan stages on GPIO pins at per-stage thresholds
    Stages,

    /// Load and validate the config, then print it as JSON
    CheckConfig {
        /// Check the staged controller section instead
        #[arg(long)]
        stages: bool,
    },
}

impl Cli {
    /// Subcommand to run, `pwm` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Pwm)
    }
}

/// Effective config for `check-config`, rendered as JSON
#[derive(Debug)]
pub struct ConfigReport {
    pub json: String,
    pub warnings: Vec<ConfigWarning>,
    pub source_found: bool,
}

/// Load `path` on top of the defaults and render the result
///
/// Validation failures are returned as errors.
pub fn check_config<C>(path: &Path) -> Result<ConfigReport>
where
    C: SectionConfig + Default + Serialize,
{
    let outcome = load_section(&C::default(), path)?;
    Ok(ConfigReport {
        json: to_json(&outcome.config)?,
        warnings: outcome.warnings,
        source_found: outcome.source_found,
    })
}
