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

//! Controller drives
//!
//! A drive owns the hardware output of one controller together with the
//! controller state, and turns temperature samples into hardware writes.
//! The pure stepping lives in `pf_core::engine`.

use pf_core::engine::{continuous, discrete};
use pf_core::hw::{wait_for_node, PinOutput, PwmOutput};
use pf_core::{ControlConfig, Result, SectionConfig, StageConfig};
use tracing::{debug, info};

/// Hardware side of one controller, as seen by the sampling loop
///
/// Binding is async because freshly exported sysfs nodes appear with a delay.
#[allow(async_fn_in_trait)]
pub trait Drive {
    type Config: SectionConfig;

    /// Bind the hardware described by `config` and reset the controller state
    async fn start(&mut self, config: &Self::Config) -> Result<()>;

    /// Step the controller with one sample and write whatever it emits
    ///
    /// Rebinds first when `config` names different hardware than the
    /// current binding.
    async fn apply(&mut self, temperature: f64, config: &Self::Config) -> Result<()>;

    /// Release the hardware; safe to call in any state
    fn release(&mut self) -> Result<()>;
}

// ============================================================================
// Continuous (PWM)
// ============================================================================

/// PWM fan driven by the continuous controller
#[derive(Debug)]
pub struct ContinuousDrive<P> {
    output: P,
    /// (pin, frequency) currently configured
    binding: Option<(u32, u32)>,
    speed: Option<u8>,
}

impl<P: PwmOutput> ContinuousDrive<P> {
    pub fn new(output: P) -> Self {
        Self { output, binding: None, speed: None }
    }

    /// Last speed written, `None` before the first sample
    pub fn speed(&self) -> Option<u8> {
        self.speed
    }

    pub fn output(&self) -> &P {
        &self.output
    }
}

impl<P: PwmOutput> Drive for ContinuousDrive<P> {
    type Config = ControlConfig;

    async fn start(&mut self, config: &ControlConfig) -> Result<()> {
        if self.binding.take().is_some() {
            self.output.cleanup()?;
        }
        self.speed = None;

        if let Some(node) = self.output.export(config.fan_pin)? {
            wait_for_node(config.fan_pin, &node).await?;
        }
        self.output.configure_pwm(config.fan_pin, config.pwm_freq)?;
        self.binding = Some((config.fan_pin, config.pwm_freq));
        info!("PWM fan on pin {} at {}Hz", config.fan_pin, config.pwm_freq);
        Ok(())
    }

    async fn apply(&mut self, temperature: f64, config: &ControlConfig) -> Result<()> {
        if self.binding != Some((config.fan_pin, config.pwm_freq)) {
            debug!("PWM binding changed, reconfiguring output");
            self.start(config).await?;
        }

        let step = continuous::step(self.speed, temperature, config);
        if let Some(speed) = step.command {
            self.output.set_duty_cycle(speed)?;
            info!("temp={:.1}°C => fan-speed={}%", temperature, speed);
        }
        self.speed = Some(step.speed);
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.binding = None;
        self.output.cleanup()
    }
}

// ============================================================================
// Discrete (staged GPIO)
// ============================================================================

/// Fan stages switched by the discrete controller
#[derive(Debug)]
pub struct DiscreteDrive<G> {
    output: G,
    /// Stage pins currently configured, in stage order
    pins: Option<Vec<u32>>,
    level: usize,
}

impl<G: PinOutput> DiscreteDrive<G> {
    pub fn new(output: G) -> Self {
        Self { output, pins: None, level: 0 }
    }

    /// Current level, 0 when every stage is off
    pub fn level(&self) -> usize {
        self.level
    }

    pub fn output(&self) -> &G {
        &self.output
    }
}

impl<G: PinOutput> Drive for DiscreteDrive<G> {
    type Config = StageConfig;

    async fn start(&mut self, config: &StageConfig) -> Result<()> {
        if self.pins.take().is_some() {
            self.output.cleanup()?;
        }
        self.level = 0;

        for &pin in &config.fan_pins {
            if let Some(node) = self.output.export(pin)? {
                wait_for_node(pin, &node).await?;
            }
            self.output.configure_pin(pin)?;
        }
        self.pins = Some(config.fan_pins.clone());
        info!("Fan stages on pins {:?}", config.fan_pins);
        Ok(())
    }

    async fn apply(&mut self, temperature: f64, config: &StageConfig) -> Result<()> {
        if self.pins.as_deref() != Some(config.fan_pins.as_slice()) {
            debug!("Stage pins changed, reconfiguring outputs");
            self.start(config).await?;
        }

        let stages = config.stages();
        let step = discrete::step(self.level, temperature, &stages);
        for transition in &step.transitions {
            self.output.write_pin(transition.pin, transition.level)?;
        }
        if step.level != self.level {
            info!("temp={:.1}°C => fan-level={}", temperature, step.level);
        }
        self.level = step.level;
        Ok(())
    }

    fn release(&mut self) -> Result<()> {
        self.pins = None;
        self.output.cleanup()
    }
}
