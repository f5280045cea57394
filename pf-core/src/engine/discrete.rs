//! Staged (GPIO) controller
//!
//! Level `k` means "stage `k - 1` is on", level 0 means every pin is off.
//! Exactly one stage pin is high at any level above 0, so a level change
//! never needs more than two pin writes, however many levels it crosses.
//!
//! Each stage has its own on and off threshold. A stage that is on stays on
//! until the temperature falls below its `off_temp`.

use crate::data::{PinTransition, Stage};

/// Outcome of one staged step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscreteStep {
    pub level: usize,
    /// Pin writes in the order they must be applied, empty when unchanged
    pub transitions: Vec<PinTransition>,
}

/// Level demanded by `temperature` given the current `level`
pub fn target_level(level: usize, temperature: f64, stages: &[Stage]) -> usize {
    let count = stages.len();
    // lowest level not yet triggered by the current heat
    let on = stages
        .iter()
        .position(|s| f64::from(s.on_temp) > temperature)
        .unwrap_or(count);
    let off = stages
        .iter()
        .position(|s| f64::from(s.off_temp) > temperature)
        .unwrap_or(count);

    if on > level {
        on
    } else {
        off.min(level)
    }
}

/// Advance the controller by one sample
///
/// `level` must not exceed `stages.len()`.
pub fn step(level: usize, temperature: f64, stages: &[Stage]) -> DiscreteStep {
    let new_level = target_level(level, temperature, stages);
    if new_level == level {
        return DiscreteStep { level, transitions: Vec::new() };
    }

    let mut transitions = Vec::with_capacity(2);
    if let Some(stage) = level.checked_sub(1).and_then(|i| stages.get(i)) {
        transitions.push(PinTransition::off(stage.pin));
    }
    if let Some(stage) = new_level.checked_sub(1).and_then(|i| stages.get(i)) {
        transitions.push(PinTransition::on(stage.pin));
    }

    DiscreteStep { level: new_level, transitions }
}
