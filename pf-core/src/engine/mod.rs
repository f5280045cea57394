//! Fan control engines
//!
//! Pure stepping functions: prior state and one temperature sample in,
//! next state and the hardware commands to emit out. No I/O happens here.

pub mod continuous;
pub mod discrete;

pub use continuous::{ramp_speed, ContinuousStep};
pub use discrete::{target_level, DiscreteStep};
