// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::convert::Infallible;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// Initialized data, copied from its load address.
    Copy { load: u32 },
    /// Uninitialized data, zero-filled.
    Zero,
}

/// One contiguous run-time range `[start, end)` named by the linker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Section {
    pub name: &'static str,
    pub kind: SectionKind,
    pub start: u32,
    pub end: u32,
}

impl Section {
    pub const fn copy(name: &'static str, load: u32, start: u32, end: u32) -> Self {
        Self {
            name,
            kind: SectionKind::Copy { load },
            start,
            end,
        }
    }

    pub const fn zero(name: &'static str, start: u32, end: u32) -> Self {
        Self {
            name,
            kind: SectionKind::Zero,
            start,
            end,
        }
    }

    /// Byte length. An inverted range counts as empty.
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Applies this section to `memory`.
    pub fn apply<M: ImageMemory + ?Sized>(&self, memory: &mut M) -> Result<(), M::Error> {
        match self.kind {
            SectionKind::Copy { load } => memory.copy(self.start, load, self.len()),
            SectionKind::Zero => memory.zero(self.start, self.len()),
        }
    }
}

/// Byte-granular access to the memory image during bring-up.
pub trait ImageMemory {
    type Error;

    /// Copies `len` bytes from `src` to `dst`. The ranges do not overlap.
    fn copy(&mut self, dst: u32, src: u32, len: u32) -> Result<(), Self::Error>;

    fn zero(&mut self, dst: u32, len: u32) -> Result<(), Self::Error>;
}

/// The target's own address space.
#[derive(Debug)]
pub struct RawMemory {
    _private: (),
}

impl RawMemory {
    /// # Safety
    ///
    /// Every range handed to [`ImageMemory`] must be mapped and must not
    /// hold anything live (no stack, no code running from it).
    pub const unsafe fn new() -> Self {
        Self { _private: () }
    }
}

impl ImageMemory for RawMemory {
    type Error = Infallible;

    fn copy(&mut self, dst: u32, src: u32, len: u32) -> Result<(), Infallible> {
        // SAFETY: upheld by the contract of `RawMemory::new`.
        unsafe {
            core::ptr::copy_nonoverlapping(
                src as usize as *const u8,
                dst as usize as *mut u8,
                len as usize,
            );
        }
        Ok(())
    }

    fn zero(&mut self, dst: u32, len: u32) -> Result<(), Infallible> {
        // SAFETY: upheld by the contract of `RawMemory::new`.
        unsafe {
            core::ptr::write_bytes(dst as usize as *mut u8, 0, len as usize);
        }
        Ok(())
    }
}

/// The PowerPC EABI data layout: two initialized and three uninitialized
/// sections, taken from the linker script's boundary symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EabiLayout {
    pub sdata2: Section,
    pub data: Section,
    pub sbss2: Section,
    pub sbss: Section,
    pub bss: Section,
}

impl EabiLayout {
    /// Builds the layout from `(load, start, end)` triples for the copied
    /// sections and `(start, end)` pairs for the zeroed ones.
    pub const fn new(
        sdata2: (u32, u32, u32),
        data: (u32, u32, u32),
        sbss2: (u32, u32),
        sbss: (u32, u32),
        bss: (u32, u32),
    ) -> Self {
        Self {
            sdata2: Section::copy(".sdata2", sdata2.0, sdata2.1, sdata2.2),
            data: Section::copy(".data", data.0, data.1, data.2),
            sbss2: Section::zero(".sbss2", sbss2.0, sbss2.1),
            sbss: Section::zero(".sbss", sbss.0, sbss.1),
            bss: Section::zero(".bss", bss.0, bss.1),
        }
    }

    /// Sections in bring-up order.
    pub const fn sections(&self) -> [Section; 5] {
        [self.sdata2, self.data, self.sbss2, self.sbss, self.bss]
    }
}
