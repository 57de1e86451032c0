// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::convert::Infallible;
use core::ops::ControlFlow;

use crate::error::BringupError;
use crate::idle::{Forever, Idle, Stalled, Wait};
use crate::image::{ImageMemory, Section};
use crate::io_map::{IoMap, LineStatus};
use crate::regs::RegisterFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Image as loaded; globals not valid yet.
    Uninitialized,
    Running,
    /// Terminal.
    Halted,
}

impl Phase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Phase::Uninitialized => "uninitialized",
            Phase::Running => "running",
            Phase::Halted => "halted",
        }
    }
}

/// The board as seen by a program: serial port, halt control and the
/// one-shot bring-up sequence.
///
/// Once halted the board stops touching its registers; every primitive then
/// reports the halt instead of doing I/O.
#[derive(Debug)]
pub struct Board<R, I = Forever> {
    regs: R,
    map: IoMap,
    idle: I,
    phase: Phase,
    halt_spins: Option<u64>,
}

impl<R: RegisterFile> Board<R, Forever> {
    pub fn new(regs: R, map: IoMap) -> Self {
        Self::with_idle(regs, map, Forever)
    }
}

impl<R: RegisterFile, I: Idle> Board<R, I> {
    pub fn with_idle(regs: R, map: IoMap, idle: I) -> Self {
        Self {
            regs,
            map,
            idle,
            phase: Phase::Uninitialized,
            halt_spins: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn io_map(&self) -> &IoMap {
        &self.map
    }

    pub fn registers(&self) -> &R {
        &self.regs
    }

    pub fn registers_mut(&mut self) -> &mut R {
        &mut self.regs
    }

    pub fn idle(&self) -> &I {
        &self.idle
    }

    pub fn idle_mut(&mut self) -> &mut I {
        &mut self.idle
    }

    /// Fallback spins performed after the stop code, once halted.
    pub fn halt_spins(&self) -> Option<u64> {
        self.halt_spins
    }

    /// Copies and zeroes `sections` in order, runs `entry` once, then halts.
    ///
    /// `entry` gets the board and the initialized memory image; its result
    /// is discarded. With [`Forever`] this never returns. Under a bounded
    /// idle policy it returns the abandoned halt spin.
    pub fn initialize_and_run<M, F, T>(
        &mut self,
        memory: &mut M,
        sections: &[Section],
        entry: F,
    ) -> Result<Stalled, BringupError<M::Error>>
    where
        M: ImageMemory,
        F: FnOnce(&mut Self, &mut M) -> T,
    {
        if self.phase != Phase::Uninitialized {
            return Err(BringupError::AlreadyInitialized);
        }

        for section in sections {
            section
                .apply(memory)
                .map_err(|source| BringupError::Memory {
                    section: section.name,
                    source,
                })?;
        }
        self.phase = Phase::Running;

        let _ = entry(self, memory);

        if let Some(polls) = self.halt_spins {
            // The program halted itself; that halt was the last transition.
            return Ok(Stalled {
                wait: Wait::Halt,
                polls,
            });
        }
        Ok(self.halt())
    }

    /// Writes `c` to the transmit register and returns it.
    ///
    /// The reference board never checks the line first; with
    /// [`IoMap::tx_wait_ready`] set this polls `THR_EMPTY` before writing.
    pub fn write_char(&mut self, c: u8) -> Result<u8, Stalled> {
        self.halted_check(Wait::Transmit)?;
        if self.map.tx_wait_ready {
            self.wait_for(LineStatus::THR_EMPTY, Wait::Transmit)?;
        }
        let addr = self.map.serial_data();
        self.regs.write(addr, c);
        Ok(c)
    }

    /// Whether the receiver holds an unread byte.
    pub fn read_ready(&mut self) -> bool {
        if self.phase == Phase::Halted {
            return false;
        }
        self.line_status().contains(LineStatus::DATA_READY)
    }

    /// Spins until a byte is received and returns it.
    pub fn read_char(&mut self) -> Result<u8, Stalled> {
        self.halted_check(Wait::Receive)?;
        self.wait_for(LineStatus::DATA_READY, Wait::Receive)?;
        let addr = self.map.serial_data();
        Ok(self.regs.read(addr))
    }

    /// Writes the stop code, then spins.
    ///
    /// Returns only if the idle policy abandons the spin. Nothing the
    /// program does afterwards reaches the hardware.
    pub fn halt(&mut self) -> Stalled {
        if let Some(polls) = self.halt_spins {
            return Stalled {
                wait: Wait::Halt,
                polls,
            };
        }

        let addr = self.map.halt_register();
        self.regs.write(addr, self.map.halt_code);
        self.phase = Phase::Halted;

        let mut polls = 0;
        while let ControlFlow::Continue(()) = self.idle.idle(Wait::Halt, polls) {
            polls += 1;
        }
        self.halt_spins = Some(polls);
        Stalled {
            wait: Wait::Halt,
            polls,
        }
    }

    /// Nothing on this board buffers output, so there is nothing to flush.
    pub fn sync(&mut self, _fd: i32) -> Result<(), Infallible> {
        Ok(())
    }

    fn line_status(&mut self) -> LineStatus {
        let addr = self.map.serial_status();
        LineStatus::from_bits_retain(self.regs.read(addr))
    }

    fn wait_for(&mut self, flag: LineStatus, wait: Wait) -> Result<(), Stalled> {
        let mut polls = 0;
        loop {
            if self.line_status().contains(flag) {
                return Ok(());
            }
            if self.idle.idle(wait, polls).is_break() {
                return Err(Stalled { wait, polls });
            }
            polls += 1;
        }
    }

    fn halted_check(&self, wait: Wait) -> Result<(), Stalled> {
        if self.phase == Phase::Halted {
            return Err(Stalled { wait, polls: 0 });
        }
        Ok(())
    }
}
