// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::bus::IoBus;
use crate::idle::PollBudget;
use crate::memory::SimMemory;
use crate::programs::Program;
use crate::snapshot::TargetSnapshot;
use crate::{SimResult, SimulationError};
use anyhow::Context;
use labwired_bsp::{Board, BringupError, EabiLayout, Phase};
use labwired_bsp_config::{section_kind_name, BoardDescriptor};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub type SimBoard = Board<IoBus, PollBudget>;

#[derive(Debug, Clone, Serialize)]
pub struct SectionReport {
    pub name: &'static str,
    pub kind: &'static str,
    pub start: u32,
    pub end: u32,
    pub len: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub board: String,
    pub phase: &'static str,
    /// The halt port saw the stop code.
    pub halted: bool,
    pub stop_codes: Vec<u8>,
    pub halt_spins: u64,
    pub serial_tx_bytes: u64,
    pub serial_output: String,
    pub lsr_polls: u64,
    pub stalled_waits: u64,
    pub unmapped_accesses: u64,
    pub sections: Vec<SectionReport>,
}

/// A simulated board: I/O bus, memory image and data layout.
pub struct SimTarget {
    pub name: String,
    pub board: SimBoard,
    pub memory: SimMemory,
    pub layout: EabiLayout,
    rom_base: u32,
    serial_tx: Arc<Mutex<Vec<u8>>>,
}

impl SimTarget {
    pub fn from_descriptor(desc: &BoardDescriptor, budget: PollBudget) -> anyhow::Result<Self> {
        desc.validate()?;
        let layout = desc.layout()?;
        let map = desc.io_map();

        let mut memory = SimMemory::new();
        for (name, range) in [("rom", &desc.memory.rom), ("ram", &desc.memory.ram)] {
            let (lo, hi) = range
                .bounds()
                .with_context(|| format!("Invalid {} size", name))?;
            memory.add_region(name, range.base, (hi - lo) as usize);
        }

        let mut bus = IoBus::from_io_map(&map, &desc.io.serial);
        let serial_tx = Arc::new(Mutex::new(Vec::new()));
        bus.attach_serial_tx_sink(serial_tx.clone(), false);

        info!(
            "Board '{}': I/O window {:#x}, COM1 {:#x}, halt {:#x}",
            desc.name,
            map.base,
            map.serial_data(),
            map.halt_register()
        );

        Ok(Self {
            name: desc.name.clone(),
            board: Board::with_idle(bus, map, budget),
            memory,
            layout,
            rom_base: desc.memory.rom.base,
            serial_tx,
        })
    }

    pub fn powerpc_elf() -> anyhow::Result<Self> {
        Self::from_descriptor(&BoardDescriptor::powerpc_elf(), PollBudget::default())
    }

    /// Mirror serial output to stdout as well as capturing it.
    pub fn set_echo_stdout(&mut self, echo: bool) {
        let sink = self.serial_tx.clone();
        self.board
            .registers_mut()
            .attach_serial_tx_sink(sink, echo);
    }

    pub fn load_rom(&mut self, bytes: &[u8]) -> SimResult<()> {
        info!("Loading {} byte ROM image at {:#x}", bytes.len(), self.rom_base);
        self.memory.load(self.rom_base, bytes)
    }

    pub fn queue_serial_input(&mut self, bytes: &[u8]) {
        match self.board.registers_mut().serial_mut() {
            Some(uart) => uart.push_rx(bytes),
            None => warn!("No serial port to queue input on"),
        }
    }

    pub fn serial_output(&self) -> Vec<u8> {
        self.serial_tx
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    /// Brings the board up and runs `entry` as its program.
    pub fn run<F, T>(&mut self, entry: F) -> SimResult<RunReport>
    where
        F: FnOnce(&mut SimBoard, &mut SimMemory) -> T,
    {
        let sections = self.layout.sections();
        for s in &sections {
            debug!(
                "{} {} [{:#x}, {:#x})",
                s.name,
                section_kind_name(&s.kind),
                s.start,
                s.end
            );
        }

        info!("Bring-up of '{}'", self.name);
        let halt = self
            .board
            .initialize_and_run(&mut self.memory, &sections, entry)
            .map_err(|e| match e {
                BringupError::AlreadyInitialized => SimulationError::AlreadyInitialized,
                BringupError::Memory { section, source } => SimulationError::Section {
                    section,
                    source: Box::new(source),
                },
            })?;
        info!("Halted after {} fallback spins", halt.polls);

        Ok(self.report())
    }

    pub fn run_program(&mut self, program: Program) -> SimResult<RunReport> {
        let layout = self.layout;
        self.run(|board, memory| program.run(board, memory, &layout))
    }

    pub fn report(&self) -> RunReport {
        let bus = self.board.registers();
        let halt = bus.halt_controller();
        let serial = bus.serial();
        let output = self.serial_output();

        RunReport {
            board: self.name.clone(),
            phase: self.board.phase().as_str(),
            halted: halt.is_some_and(|h| h.stop_requested()),
            stop_codes: halt.map(|h| h.writes().to_vec()).unwrap_or_default(),
            halt_spins: self.board.halt_spins().unwrap_or(0),
            serial_tx_bytes: serial.map_or(0, |s| s.tx_count()),
            serial_output: String::from_utf8_lossy(&output).into_owned(),
            lsr_polls: serial.map_or(0, |s| s.lsr_polls()),
            stalled_waits: self.board_budget().stalls,
            unmapped_accesses: bus.unmapped_accesses(),
            sections: self
                .layout
                .sections()
                .iter()
                .map(|s| SectionReport {
                    name: s.name,
                    kind: section_kind_name(&s.kind),
                    start: s.start,
                    end: s.end,
                    len: s.len(),
                })
                .collect(),
        }
    }

    pub fn is_halted(&self) -> bool {
        self.board.phase() == Phase::Halted
    }

    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            board: self.name.clone(),
            phase: self.board.phase().as_str().to_string(),
            budget: self.board_budget(),
            peripherals: self
                .board
                .registers()
                .peripherals
                .iter()
                .map(|p| (p.name.clone(), p.dev.snapshot()))
                .collect(),
        }
    }

    fn board_budget(&self) -> PollBudget {
        *self.board.idle()
    }
}
