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

//! Pifan daemon (pifand)
//!
//! Runs one fan controller against the CPU thermal zone until it receives
//! SIGTERM or SIGINT. SIGUSR1 and SIGHUP reload the config file.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use pf_core::constants::paths;
use pf_core::{ConfigStore, ControlConfig, SectionConfig, StageConfig, SysfsGpio, SysfsPwm, ThermalZone};
use pifan::cli::{check_config, Cli, Commands};
use pifan::drive::{ContinuousDrive, DiscreteDrive, Drive};
use pifan::fan_control::{run_control_loop, ControlEvent};
use pifan::signals::SignalListener;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Buffered control events; signals arrive far slower than the loop drains them
const EVENT_QUEUE: usize = 8;

/// Log to the systemd journal when available, stdout otherwise
///
/// Returns whether the journal is in use.
fn init_logging() -> bool {
    let log_level = std::env::var("PIFAN_LOG").unwrap_or_else(|_| "info".to_string());

    if Path::new(paths::JOURNALD_SOCKET).exists() {
        match tracing_journald::layer() {
            Ok(journald_layer) => {
                use tracing_subscriber::prelude::*;
                tracing_subscriber::registry()
                    .with(journald_layer)
                    .with(tracing_subscriber::EnvFilter::new(&log_level))
                    .init();
                return true;
            }
            Err(e) => {
                eprintln!("Failed to create journald layer: {}, falling back to stdout", e);
            }
        }
    }

    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_env_filter(&log_level)
        .init();
    false
}

/// sysfs exports need root; running without it is allowed for test rigs
fn verify_privileges() {
    // SAFETY: geteuid has no preconditions and only returns the effective user ID.
    let euid = unsafe { libc::geteuid() };
    if euid != 0 {
        warn!("Not running as root (euid={}), hardware access will likely fail", euid);
    }
}

/// Store for `C` loaded from `path`, falling back to the defaults on error
fn load_store<C: SectionConfig + Default>(path: &Path) -> ConfigStore<C> {
    let store = ConfigStore::with_source(C::default(), path);
    match store.load() {
        Ok(report) if report.source_found => {
            info!("Loaded [{}] from {:?} ({} settings)", C::SECTION, path, report.applied);
        }
        Ok(_) => info!("No config at {:?}, using defaults", path),
        Err(e) => error!("Invalid configuration in {:?}: {} - using defaults", path, e),
    }
    store
}

async fn run_daemon<D>(cli: &Cli, mut drive: D) -> Result<()>
where
    D: Drive,
    D::Config: Default,
{
    verify_privileges();

    let store = load_store::<D::Config>(&cli.config);
    let mut sensor = ThermalZone::new(&cli.sensor);

    let (tx, mut rx) = mpsc::channel::<ControlEvent>(EVENT_QUEUE);
    let listener = SignalListener::register().context("Failed to register signal handlers")?;
    let _forwarder = listener.forward(tx);

    let reason = run_control_loop(&mut sensor, &mut drive, &store, &mut rx)
        .await
        .context("Fan control stopped with an error")?;

    info!("SHUTDOWN: pifand stopped ({})", reason);
    Ok(())
}

fn print_config<C>(path: &Path) -> Result<()>
where
    C: SectionConfig + Default + Serialize,
{
    let report = check_config::<C>(path)
        .with_context(|| format!("Config {:?} is invalid", path))?;

    if !report.source_found {
        eprintln!("Note: {:?} not found, showing defaults", path);
    }
    for warning in &report.warnings {
        eprintln!("Warning: {}", warning);
    }
    println!("{}", report.json);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command() {
        Commands::CheckConfig { stages } => {
            if stages {
                print_config::<StageConfig>(&cli.config)
            } else {
                print_config::<ControlConfig>(&cli.config)
            }
        }
        command => {
            let use_journald = init_logging();
            info!("STARTUP: pifand {} starting", VERSION);
            info!("STARTUP: Logging to {}", if use_journald { "systemd journal" } else { "stdout" });

            if command == Commands::Stages {
                run_daemon(&cli, DiscreteDrive::new(SysfsGpio::new(&cli.gpio_root))).await
            } else {
                run_daemon(&cli, ContinuousDrive::new(SysfsPwm::new(&cli.pwm_chip))).await
            }
        }
    }
}
