// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use bitflags::bitflags;

/// Start of the ISA-style I/O window; a port's register lives at `base + port`.
pub const IO_BASE: u32 = 0x8000_0000;
pub const HALT_PORT: u16 = 0x92;
pub const HALT_CODE: u8 = 0x01;
/// COM1.
pub const SERIAL_PORT: u16 = 0x3f8;

/// RBR on read, THR on write.
pub const SERIAL_DATA: u16 = 0x00;
pub const SERIAL_LSR: u16 = 0x05;

bitflags! {
    /// 16550 line-status register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineStatus: u8 {
        const DATA_READY = 0x01;
        const THR_EMPTY = 0x20;
    }
}

/// Where the board's halt control and serial port registers sit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoMap {
    pub base: u32,
    pub halt_port: u16,
    pub halt_code: u8,
    pub serial_port: u16,
    /// Poll `THR_EMPTY` before each transmit. Off on the reference board,
    /// whose transmit path writes unconditionally.
    pub tx_wait_ready: bool,
}

impl IoMap {
    pub const POWERPC_ELF: Self = Self {
        base: IO_BASE,
        halt_port: HALT_PORT,
        halt_code: HALT_CODE,
        serial_port: SERIAL_PORT,
        tx_wait_ready: false,
    };

    pub const fn port(&self, port: u16) -> u32 {
        self.base.wrapping_add(port as u32)
    }

    pub const fn halt_register(&self) -> u32 {
        self.port(self.halt_port)
    }

    pub const fn serial_data(&self) -> u32 {
        self.port(self.serial_port.wrapping_add(SERIAL_DATA))
    }

    pub const fn serial_status(&self) -> u32 {
        self.port(self.serial_port.wrapping_add(SERIAL_LSR))
    }
}

impl Default for IoMap {
    fn default() -> Self {
        Self::POWERPC_ELF
    }
}
