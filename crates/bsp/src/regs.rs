// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Byte-wide register access at absolute addresses.
///
/// Reads take `&mut self`: a register read may change device state (a data
/// register pops its FIFO, a status register clears a latch).
pub trait RegisterFile {
    fn read(&mut self, addr: u32) -> u8;
    fn write(&mut self, addr: u32, value: u8);
}

impl<R: RegisterFile + ?Sized> RegisterFile for &mut R {
    fn read(&mut self, addr: u32) -> u8 {
        (**self).read(addr)
    }

    fn write(&mut self, addr: u32, value: u8) {
        (**self).write(addr, value)
    }
}

/// Volatile memory-mapped I/O on the running target.
#[derive(Debug)]
pub struct Mmio {
    _private: (),
}

impl Mmio {
    /// # Safety
    ///
    /// Every address later passed to [`RegisterFile::read`] or
    /// [`RegisterFile::write`] must be a mapped device register of the
    /// running target.
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl RegisterFile for Mmio {
    fn read(&mut self, addr: u32) -> u8 {
        // SAFETY: upheld by the contract of `Mmio::new`.
        unsafe { core::ptr::read_volatile(addr as usize as *const u8) }
    }

    fn write(&mut self, addr: u32, value: u8) {
        // SAFETY: upheld by the contract of `Mmio::new`.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u8, value) }
    }
}
