// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Minimal board support for the PowerPC ELF target.
//!
//! The crate brings a linked image from "sections at their load addresses"
//! to "globals valid, `main` running", and offers the polling serial port and
//! halt primitives the example programs link against. Hardware is reached
//! only through [`RegisterFile`] and [`ImageMemory`], so the same code runs
//! on the board and against a simulated register map.

#![cfg_attr(not(test), no_std)]

pub mod board;
pub mod error;
pub mod idle;
pub mod image;
pub mod io_map;
pub mod regs;

pub use board::{Board, Phase};
pub use error::BringupError;
pub use idle::{Forever, Idle, Stalled, Wait};
pub use image::{EabiLayout, ImageMemory, RawMemory, Section, SectionKind};
pub use io_map::{IoMap, LineStatus};
pub use regs::{Mmio, RegisterFile};
