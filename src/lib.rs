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

//! Pifan - temperature driven fan control daemon
//!
//! Glues the pure controllers of `pf_core` to hardware and runs them in a
//! sampling loop that can be reloaded and stopped through signals.

pub mod cli;
pub mod drive;
pub mod fan_control;
pub mod signals;

pub use drive::{ContinuousDrive, DiscreteDrive, Drive};
pub use fan_control::{run_control_loop, ControlEvent, StopReason};
