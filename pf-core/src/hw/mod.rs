//! Hardware access
//!
//! The controllers only ever see these traits. The sysfs backends implement
//! them for Linux; tests substitute fakes.

mod gpio;
mod pwm;
mod thermal;

use std::path::{Path, PathBuf};

use tokio::time::sleep;

use crate::constants::timing;
use crate::data::Level;
use crate::error::{PifanError, Result};

pub use gpio::SysfsGpio;
pub use pwm::SysfsPwm;
pub use thermal::ThermalZone;

/// Source of the temperature the controllers react to
pub trait TemperatureSource: Send {
    /// Current temperature in °C
    fn read_temperature(&mut self) -> Result<f64>;
}

/// Hardware PWM output driving a single fan
pub trait PwmOutput: Send {
    /// Ask the kernel to create the node behind `pin`
    ///
    /// Returns the node to wait for when an export was requested, `None`
    /// when the pin is ready to configure. Releases any previous binding.
    fn export(&mut self, _pin: u32) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    /// Bind `pin` as a PWM output at `frequency_hz`, starting at 0% duty
    fn configure_pwm(&mut self, pin: u32, frequency_hz: u32) -> Result<()>;

    /// Set the duty cycle of the configured pin, `percent` in 0..=100
    fn set_duty_cycle(&mut self, percent: u8) -> Result<()>;

    /// Stop the output and release the pin; a no-op when nothing is bound
    fn cleanup(&mut self) -> Result<()>;
}

/// Digital outputs switching fan stages
pub trait PinOutput: Send {
    /// Ask the kernel to create the node behind `pin`, see [`PwmOutput::export`]
    fn export(&mut self, _pin: u32) -> Result<Option<PathBuf>> {
        Ok(None)
    }

    /// Bind `pin` as an output, initially low
    fn configure_pin(&mut self, pin: u32) -> Result<()>;

    fn write_pin(&mut self, pin: u32, level: Level) -> Result<()>;

    /// Drive every configured pin low and release it
    fn cleanup(&mut self) -> Result<()>;
}

/// Wait for the kernel to create `node` after an export of `pin`
///
/// Polls without blocking the runtime, so signals are still handled while
/// the kernel catches up.
pub async fn wait_for_node(pin: u32, node: &Path) -> Result<()> {
    for _ in 0..timing::EXPORT_POLL_ATTEMPTS {
        if node.exists() {
            return Ok(());
        }
        sleep(timing::EXPORT_POLL_INTERVAL).await;
    }
    if node.exists() {
        return Ok(());
    }
    Err(PifanError::hardware_init(pin, format!("{:?} did not appear after export", node)))
}
