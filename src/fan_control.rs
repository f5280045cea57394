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

//! Sampling loop
//!
//! One task samples the temperature, steps the controller, writes the result
//! and sleeps for `wait_time`. Reload and stop requests arrive as
//! [`ControlEvent`]s and are only handled while the loop sleeps, so a tick
//! always runs against a single config snapshot. The hardware is released
//! on every exit path.

use std::fmt;

use pf_core::{ConfigStore, Result, SectionConfig, TemperatureSource};
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info};

use crate::drive::Drive;

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// SIGINT
    Interrupt,
    /// SIGTERM
    Terminate,
    /// Every event sender was dropped
    ChannelClosed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Interrupt => write!(f, "interrupt"),
            StopReason::Terminate => write!(f, "termination request"),
            StopReason::ChannelClosed => write!(f, "control channel closed"),
        }
    }
}

/// Requests delivered to a running loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// Re-read the config source
    Reload,
    Stop(StopReason),
}

/// Run the control loop until a stop request or an error
///
/// Returns the stop reason on an orderly stop. Hardware cleanup always runs;
/// its error is returned only when the loop itself succeeded.
pub async fn run_control_loop<S, D>(
    sensor: &mut S,
    drive: &mut D,
    store: &ConfigStore<D::Config>,
    events: &mut mpsc::Receiver<ControlEvent>,
) -> Result<StopReason>
where
    S: TemperatureSource,
    D: Drive,
{
    info!("Fan control loop starting ({})", <D::Config as SectionConfig>::SECTION);

    let result = sample_until_stopped(sensor, drive, store, events).await;
    let cleanup = drive.release();

    match (result, cleanup) {
        (Ok(reason), Ok(())) => {
            info!("Fan control loop stopped: {}", reason);
            Ok(reason)
        }
        (Ok(reason), Err(e)) => {
            error!("Hardware cleanup failed after {}: {}", reason, e);
            Err(e)
        }
        (Err(e), cleanup) => {
            error!("Fan control loop failed: {}", e);
            if let Err(ce) = cleanup {
                error!("Hardware cleanup failed: {}", ce);
            }
            Err(e)
        }
    }
}

async fn sample_until_stopped<S, D>(
    sensor: &mut S,
    drive: &mut D,
    store: &ConfigStore<D::Config>,
    events: &mut mpsc::Receiver<ControlEvent>,
) -> Result<StopReason>
where
    S: TemperatureSource,
    D: Drive,
{
    drive.start(&store.snapshot()).await?;

    loop {
        let config = store.snapshot();
        let temperature = sensor.read_temperature()?;
        drive.apply(temperature, &config).await?;

        let deadline = Instant::now() + config.sample_interval();
        // the snapshot is released here so a reload never waits on a tick
        drop(config);

        loop {
            tokio::select! {
                biased;

                event = events.recv() => match event {
                    Some(ControlEvent::Reload) => {
                        info!("SIGNAL: Configuration reload requested");
                        // failures are logged by the store, the old config stays active
                        let _ = store.reload();
                    }
                    Some(ControlEvent::Stop(reason)) => {
                        info!("SIGNAL: Received {} - stopping", reason);
                        return Ok(reason);
                    }
                    None => {
                        debug!("All control event senders dropped");
                        return Ok(StopReason::ChannelClosed);
                    }
                },
                _ = sleep_until(deadline) => break,
            }
        }
    }
}
