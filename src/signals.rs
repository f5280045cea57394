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

//! Unix signal listener
//!
//! SIGTERM and SIGINT stop the control loop, SIGUSR1 and SIGHUP reload the
//! config. Signals are forwarded as [`ControlEvent`]s.

use std::io;

use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::fan_control::{ControlEvent, StopReason};

/// Registered signal streams
pub struct SignalListener {
    terminate: Signal,
    interrupt: Signal,
    user1: Signal,
    hangup: Signal,
}

impl SignalListener {
    /// Register the handlers; must be called from inside a tokio runtime
    pub fn register() -> io::Result<Self> {
        Ok(Self {
            terminate: signal(SignalKind::terminate())?,
            interrupt: signal(SignalKind::interrupt())?,
            user1: signal(SignalKind::user_defined1())?,
            hangup: signal(SignalKind::hangup())?,
        })
    }

    /// Wait for the next signal of interest
    ///
    /// Returns `None` once the signal driver shuts down.
    pub async fn next_event(&mut self) -> Option<ControlEvent> {
        tokio::select! {
            s = self.terminate.recv() => s.map(|_| ControlEvent::Stop(StopReason::Terminate)),
            s = self.interrupt.recv() => s.map(|_| ControlEvent::Stop(StopReason::Interrupt)),
            s = self.user1.recv() => s.map(|_| ControlEvent::Reload),
            s = self.hangup.recv() => s.map(|_| ControlEvent::Reload),
        }
    }

    /// Forward signals to `events` until the receiver goes away
    ///
    /// Stop signals do not end forwarding; repeated signals keep queueing
    /// while the loop shuts down.
    pub fn forward(mut self, events: mpsc::Sender<ControlEvent>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = events.closed() => break,
                    event = self.next_event() => match event {
                        Some(event) => event,
                        None => break,
                    },
                };
                debug!("Forwarding {:?}", event);
                if events.send(event).await.is_err() {
                    break;
                }
            }
            debug!("Signal forwarding finished");
        })
    }
}
