// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::ops::ControlFlow;

/// What a spin loop is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// `DATA_READY` in the line-status register.
    Receive,
    /// `THR_EMPTY` in the line-status register.
    Transmit,
    /// Fallback spin after the stop code was written.
    Halt,
}

impl Wait {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Wait::Receive => "receive",
            Wait::Transmit => "transmit",
            Wait::Halt => "halt",
        }
    }
}

/// Wait predicate consulted once per spin iteration.
///
/// `polls` counts the iterations of the current wait that already failed.
/// Returning `Break` abandons the wait, which the caller then sees as
/// [`Stalled`].
pub trait Idle {
    fn idle(&mut self, wait: Wait, polls: u64) -> ControlFlow<()>;
}

impl<I: Idle + ?Sized> Idle for &mut I {
    fn idle(&mut self, wait: Wait, polls: u64) -> ControlFlow<()> {
        (**self).idle(wait, polls)
    }
}

/// Never gives up. The board's policy: no timeouts.
#[derive(Debug, Clone, Copy, Default)]
pub struct Forever;

impl Idle for Forever {
    fn idle(&mut self, _wait: Wait, _polls: u64) -> ControlFlow<()> {
        core::hint::spin_loop();
        ControlFlow::Continue(())
    }
}

/// A wait that the idle policy abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{} wait stalled after {polls} polls", .wait.as_str())]
pub struct Stalled {
    pub wait: Wait,
    pub polls: u64,
}
