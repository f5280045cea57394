//! Hardware PWM through the sysfs PWM class
//!
//! # Layout
//!
//! ```text
//! pwmchip0/export          write a channel number to create pwmN/
//! pwmchip0/pwmN/period     in nanoseconds
//! pwmchip0/pwmN/duty_cycle in nanoseconds, never above period
//! pwmchip0/pwmN/enable     1 = running
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::constants::{paths, percent, pwm};
use crate::error::{PifanError, Result};

use super::PwmOutput;

#[derive(Debug, Clone)]
struct BoundChannel {
    pin: u32,
    dir: PathBuf,
    period_ns: u64,
}

/// PWM output on one channel of a sysfs PWM chip
#[derive(Debug)]
pub struct SysfsPwm {
    chip: PathBuf,
    bound: Option<BoundChannel>,
}

impl SysfsPwm {
    pub fn new(chip: impl Into<PathBuf>) -> Self {
        Self { chip: chip.into(), bound: None }
    }

    pub fn chip(&self) -> &Path {
        &self.chip
    }

    /// Pin currently bound, if any
    pub fn pin(&self) -> Option<u32> {
        self.bound.as_ref().map(|b| b.pin)
    }

    /// Period of the bound channel in nanoseconds
    pub fn period_ns(&self) -> Option<u64> {
        self.bound.as_ref().map(|b| b.period_ns)
    }

    fn channel_dir(&self, channel: u32) -> PathBuf {
        self.chip.join(format!("pwm{}", channel))
    }
}

fn channel_for(pin: u32) -> Result<u32> {
    pwm::channel_for_pin(pin).ok_or_else(|| PifanError::hardware_init(pin, "pin has no hardware PWM channel"))
}

impl Default for SysfsPwm {
    fn default() -> Self {
        Self::new(paths::PWM_CHIP)
    }
}

fn write_attr(dir: &Path, attr: &str, value: impl ToString) -> Result<()> {
    let path = dir.join(attr);
    fs::write(&path, value.to_string()).map_err(|e| PifanError::PwmWrite {
        path: path.clone(),
        reason: e.to_string(),
    })
}

impl PwmOutput for SysfsPwm {
    fn export(&mut self, pin: u32) -> Result<Option<PathBuf>> {
        let channel = channel_for(pin)?;
        // unexporting later would remove a channel exported here
        if self.bound.is_some() {
            self.cleanup()?;
        }

        let dir = self.channel_dir(channel);
        if dir.exists() {
            return Ok(None);
        }

        debug!("Exporting PWM channel {} on {:?}", channel, self.chip);
        fs::write(self.chip.join("export"), channel.to_string())
            .map_err(|e| PifanError::hardware_init(pin, format!("Failed to export channel {}: {}", channel, e)))?;
        Ok(Some(dir))
    }

    fn configure_pwm(&mut self, pin: u32, frequency_hz: u32) -> Result<()> {
        let channel = channel_for(pin)?;
        if frequency_hz == 0 {
            return Err(PifanError::hardware_init(pin, "frequency must be greater than 0"));
        }

        if self.bound.is_some() {
            self.cleanup()?;
        }

        let dir = self.channel_dir(channel);
        if !dir.exists() {
            return Err(PifanError::hardware_init(pin, format!("{:?} is not exported", dir)));
        }
        let period_ns = pwm::NANOS_PER_SECOND / u64::from(frequency_hz);

        // duty first so the new period is never below the old duty cycle
        let init = |attr: &str, value: u64| {
            write_attr(&dir, attr, value).map_err(|e| PifanError::hardware_init(pin, e.to_string()))
        };
        init("duty_cycle", 0)?;
        init("period", period_ns)?;
        init("enable", 1)?;

        debug!(pin, channel, period_ns, "PWM output configured");
        self.bound = Some(BoundChannel { pin, dir, period_ns });
        Ok(())
    }

    fn set_duty_cycle(&mut self, percent: u8) -> Result<()> {
        let bound = self.bound.as_ref().ok_or_else(|| PifanError::PwmWrite {
            path: self.chip.clone(),
            reason: "no PWM channel configured".to_string(),
        })?;

        let percent = percent.min(percent::MAX);
        let duty_ns = bound.period_ns * u64::from(percent) / u64::from(percent::MAX);
        write_attr(&bound.dir, "duty_cycle", duty_ns)
    }

    fn cleanup(&mut self) -> Result<()> {
        let Some(bound) = self.bound.take() else {
            return Ok(());
        };

        let mut first_error = None;
        if let Err(e) = write_attr(&bound.dir, "enable", 0) {
            warn!("Failed to disable PWM on pin {}: {}", bound.pin, e);
            first_error = first_error.or(Some(e));
        }
        if let Some(channel) = pwm::channel_for_pin(bound.pin) {
            if let Err(e) = write_attr(&self.chip, "unexport", channel) {
                warn!("Failed to unexport PWM channel {}: {}", channel, e);
                first_error = first_error.or(Some(e));
            }
        }

        debug!(pin = bound.pin, "PWM output released");
        first_error.map_or(Ok(()), Err)
    }
}
