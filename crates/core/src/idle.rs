// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use labwired_bsp::{Idle, Wait};
use std::ops::ControlFlow;

/// Bounds every spin loop of the simulated board.
///
/// A serial wait is abandoned after `max_polls` failed polls; the halt
/// fallback spins `halt_spins` times. Abandoned waits are counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PollBudget {
    pub max_polls: u64,
    pub halt_spins: u64,
    pub stalls: u64,
}

impl PollBudget {
    pub fn new(max_polls: u64) -> Self {
        Self {
            max_polls,
            halt_spins: 0,
            stalls: 0,
        }
    }

    pub fn with_halt_spins(mut self, spins: u64) -> Self {
        self.halt_spins = spins;
        self
    }
}

impl Default for PollBudget {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl Idle for PollBudget {
    fn idle(&mut self, wait: Wait, polls: u64) -> ControlFlow<()> {
        let limit = match wait {
            Wait::Receive | Wait::Transmit => self.max_polls,
            Wait::Halt => self.halt_spins,
        };
        if polls < limit {
            return ControlFlow::Continue(());
        }
        if wait != Wait::Halt {
            self.stalls += 1;
            tracing::warn!("{} wait abandoned after {} polls", wait.as_str(), polls);
        }
        ControlFlow::Break(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_applies_per_wait_kind() {
        let mut budget = PollBudget::new(2).with_halt_spins(1);
        assert!(budget.idle(Wait::Receive, 1).is_continue());
        assert!(budget.idle(Wait::Receive, 2).is_break());
        assert!(budget.idle(Wait::Halt, 0).is_continue());
        assert!(budget.idle(Wait::Halt, 1).is_break());
        assert_eq!(budget.stalls, 1);
    }
}
