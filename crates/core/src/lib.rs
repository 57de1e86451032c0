// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

pub mod bus;
pub mod idle;
pub mod memory;
pub mod peripherals;
pub mod programs;
pub mod snapshot;
pub mod target;

use std::any::Any;


pub use idle::PollBudget;
pub use target::{RunReport, SimBoard, SimTarget};

#[derive(Debug, thiserror::Error)]
pub enum SimulationError {
    #[error("Memory access violation at {0:#x}")]
    MemoryViolation(u32),
    #[error("ROM image of {len} bytes does not fit at {base:#x}")]
    RomTooLarge { base: u32, len: usize },
    #[error("Board was already brought up")]
    AlreadyInitialized,
    #[error("Section {section} failed: {source}")]
    Section {
        section: &'static str,
        source: Box<SimulationError>,
    },
}

pub type SimResult<T> = Result<T, SimulationError>;

/// A byte-wide memory-mapped device on the simulated I/O bus.
///
/// Offsets are relative to the device's base address.
pub trait Peripheral: std::fmt::Debug + Send {
    fn read(&mut self, offset: u32) -> u8;
    fn write(&mut self, offset: u32, value: u8);
    fn as_any(&self) -> Option<&dyn Any> {
        None
    }
    fn as_any_mut(&mut self) -> Option<&mut dyn Any> {
        None
    }
    fn snapshot(&self) -> serde_json::Value {
        serde_json::Value::Null
    }
}
