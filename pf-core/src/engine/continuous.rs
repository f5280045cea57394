//! Continuous (PWM duty cycle) controller
//!
//! Three zones, from cold to hot:
//!
//! 1. **Off**: below `off_temp` the fan is set to `fan_off`.
//! 2. **Hold**: between `off_temp` and `min_temp` the previous speed is kept.
//!    This band is the hysteresis that stops the fan from toggling around a
//!    single threshold.
//! 3. **Ramp**: above `min_temp` the speed rises linearly from `fan_low`,
//!    reaching `fan_high` at `max_temp`.
//!
//! Rounding is half-to-even at both rounding points.

use crate::constants::continuous::RAMP_SATURATION_DEGREES;
use crate::data::ControlConfig;

/// Outcome of one continuous step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContinuousStep {
    /// Speed to remember as the new state
    pub speed: u8,
    /// Duty cycle to write, `None` when the speed did not change
    pub command: Option<u8>,
}

/// Advance the controller by one sample
///
/// `current` is `None` before the first sample, which makes the first step
/// always emit a command. A first sample inside the hold band has nothing to
/// hold and falls back to `fan_off`.
pub fn step(current: Option<u8>, temperature: f64, config: &ControlConfig) -> ContinuousStep {
    let speed = if temperature > f64::from(config.min_temp) {
        ramp_speed(temperature, config)
    } else if temperature < f64::from(config.off_temp) {
        config.fan_off
    } else {
        current.unwrap_or(config.fan_off)
    };

    ContinuousStep {
        speed,
        command: (current != Some(speed)).then_some(speed),
    }
}

/// Speed in the ramp zone
///
/// The ramp input saturates 100 degrees above `min_temp`; the output is
/// clamped to `fan_max`.
pub fn ramp_speed(temperature: f64, config: &ControlConfig) -> u8 {
    let temp_span = f64::from(config.max_temp) - f64::from(config.min_temp);
    let gain = (f64::from(config.fan_high) - f64::from(config.fan_low)) / temp_span;

    let degrees_above = (temperature - f64::from(config.min_temp))
        .round_ties_even()
        .min(RAMP_SATURATION_DEGREES);
    let speed = (f64::from(config.fan_low) + degrees_above * gain).round_ties_even();

    speed.clamp(0.0, f64::from(config.fan_max)) as u8
}
