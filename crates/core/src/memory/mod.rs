// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::{SimResult, SimulationError};
use labwired_bsp::ImageMemory;
use tracing::debug;

/// A simple flat memory storage
pub struct LinearMemory {
    pub data: Vec<u8>,
    pub base_addr: u32,
}

impl LinearMemory {
    pub fn new(size: usize, base_addr: u32) -> Self {
        Self {
            data: vec![0; size],
            base_addr,
        }
    }

    fn index(&self, addr: u32) -> Option<usize> {
        let offset = addr.checked_sub(self.base_addr)? as usize;
        (offset < self.data.len()).then_some(offset)
    }

    pub fn contains(&self, addr: u32) -> bool {
        self.index(addr).is_some()
    }

    pub fn read_u8(&self, addr: u32) -> Option<u8> {
        self.index(addr).map(|i| self.data[i])
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) -> bool {
        match self.index(addr) {
            Some(i) => {
                self.data[i] = value;
                true
            }
            None => false,
        }
    }

    /// `len` bytes at `addr`, if the whole range is inside this memory.
    pub fn slice(&self, addr: u32, len: usize) -> Option<&[u8]> {
        let start = self.index(addr)?;
        self.data.get(start..start.checked_add(len)?)
    }

    pub fn load(&mut self, addr: u32, bytes: &[u8]) -> bool {
        let Some(start) = self.index(addr) else {
            return false;
        };
        match self.data.get_mut(start..start + bytes.len()) {
            Some(dst) => {
                dst.copy_from_slice(bytes);
                true
            }
            None => false,
        }
    }
}

/// Named memory regions of the simulated board.
#[derive(Default)]
pub struct SimMemory {
    regions: Vec<(String, LinearMemory)>,
}

impl SimMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_region(&mut self, name: &str, base: u32, size: usize) {
        self.regions
            .push((name.to_string(), LinearMemory::new(size, base)));
    }

    pub fn region(&self, name: &str) -> Option<&LinearMemory> {
        self.regions.iter().find(|(n, _)| n == name).map(|(_, m)| m)
    }

    fn find(&self, addr: u32) -> Option<&LinearMemory> {
        self.regions
            .iter()
            .map(|(_, m)| m)
            .find(|m| m.contains(addr))
    }

    fn find_mut(&mut self, addr: u32) -> Option<&mut LinearMemory> {
        self.regions
            .iter_mut()
            .map(|(_, m)| m)
            .find(|m| m.contains(addr))
    }

    pub fn read_u8(&self, addr: u32) -> SimResult<u8> {
        self.find(addr)
            .and_then(|m| m.read_u8(addr))
            .ok_or(SimulationError::MemoryViolation(addr))
    }

    pub fn write_u8(&mut self, addr: u32, value: u8) -> SimResult<()> {
        match self.find_mut(addr).map(|m| m.write_u8(addr, value)) {
            Some(true) => Ok(()),
            _ => Err(SimulationError::MemoryViolation(addr)),
        }
    }

    /// Reads `len` bytes that may span regions.
    pub fn read_bytes(&self, addr: u32, len: u32) -> SimResult<Vec<u8>> {
        (0..len)
            .map(|i| self.read_u8(addr.wrapping_add(i)))
            .collect()
    }

    /// Places `bytes` at `addr`; the whole range must be in one region.
    pub fn load(&mut self, addr: u32, bytes: &[u8]) -> SimResult<()> {
        match self.find_mut(addr).map(|m| m.load(addr, bytes)) {
            Some(true) => Ok(()),
            _ => Err(SimulationError::RomTooLarge {
                base: addr,
                len: bytes.len(),
            }),
        }
    }
}

impl ImageMemory for SimMemory {
    type Error = SimulationError;

    fn copy(&mut self, dst: u32, src: u32, len: u32) -> SimResult<()> {
        debug!("Copy {} bytes {:#x} -> {:#x}", len, src, dst);
        for i in 0..len {
            let b = self.read_u8(src.wrapping_add(i))?;
            self.write_u8(dst.wrapping_add(i), b)?;
        }
        Ok(())
    }

    fn zero(&mut self, dst: u32, len: u32) -> SimResult<()> {
        debug!("Zero {} bytes at {:#x}", len, dst);
        for i in 0..len {
            self.write_u8(dst.wrapping_add(i), 0)?;
        }
        Ok(())
    }
}
