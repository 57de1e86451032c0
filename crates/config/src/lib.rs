// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use labwired_bsp::{EabiLayout, IoMap, SectionKind};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod script;

pub use script::{MemoryValue, RunInputs, RunLimits, RunScript, ScriptAssertion};

/// One past the last byte a `u32` address can reach.
const ADDRESS_SPACE: u64 = 1 << 32;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_io_base() -> u32 {
    labwired_bsp::io_map::IO_BASE
}

fn default_halt_port() -> u16 {
    labwired_bsp::io_map::HALT_PORT
}

fn default_halt_code() -> u8 {
    labwired_bsp::io_map::HALT_CODE
}

fn default_serial_port() -> u16 {
    labwired_bsp::io_map::SERIAL_PORT
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct HaltConfig {
    #[serde(default = "default_halt_port")]
    pub port: u16,
    #[serde(default = "default_halt_code")]
    pub code: u8,
}

impl Default for HaltConfig {
    fn default() -> Self {
        Self {
            port: default_halt_port(),
            code: default_halt_code(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: u16,
    #[serde(default)]
    pub tx_wait_ready: bool,
    /// Simulation only: transmitted bytes are fed back to the receiver.
    #[serde(default)]
    pub loopback: bool,
    /// Simulation only: status polls before a pending byte shows as ready.
    #[serde(default)]
    pub rx_delay: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            tx_wait_ready: false,
            loopback: false,
            rx_delay: 0,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IoConfig {
    #[serde(default = "default_io_base")]
    pub base: u32,
    #[serde(default)]
    pub halt: HaltConfig,
    #[serde(default)]
    pub serial: SerialConfig,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            base: default_io_base(),
            halt: HaltConfig::default(),
            serial: SerialConfig::default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MemoryRange {
    pub base: u32,
    pub size: String, // e.g. "256KiB"
}

impl MemoryRange {
    /// `[base, base + size)` as 64-bit bounds so a range ending at 4 GiB fits.
    pub fn bounds(&self) -> Result<(u64, u64)> {
        let size = parse_size(&self.size)?;
        let end = (self.base as u64)
            .checked_add(size)
            .ok_or_else(|| anyhow::anyhow!("Size '{}' is out of range", self.size))?;
        Ok((self.base as u64, end))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct MemoryMap {
    pub rom: MemoryRange,
    pub ram: MemoryRange,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct SectionRange {
    #[serde(default)]
    pub load: Option<u32>,
    pub start: u32,
    pub end: u32,
}

/// Linker symbol values of the five EABI data sections.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SectionMap {
    pub sdata2: SectionRange,
    pub data: SectionRange,
    pub sbss2: SectionRange,
    pub sbss: SectionRange,
    pub bss: SectionRange,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("section {0} ends before it starts")]
    Inverted(&'static str),
    #[error("section {0} is initialized data but has no load address")]
    MissingLoad(&'static str),
    #[error("section {0} is uninitialized data and cannot have a load address")]
    UnexpectedLoad(&'static str),
    #[error("load image of section {0} lies outside ROM and RAM")]
    LoadOutOfRange(&'static str),
    #[error("section {0} lies outside RAM")]
    RunOutOfRange(&'static str),
    #[error("sections {0} and {1} overlap")]
    Overlap(&'static str, &'static str),
    #[error("{0} region extends past the 32-bit address space")]
    RegionOutOfRange(&'static str),
    #[error("rom and ram regions overlap")]
    RegionOverlap,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardDescriptor {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default)]
    pub io: IoConfig,
    pub memory: MemoryMap,
    pub sections: SectionMap,
}

impl BoardDescriptor {
    /// The reference PowerPC ELF board with a small fixed data layout.
    pub fn powerpc_elf() -> Self {
        Self {
            schema_version: default_schema_version(),
            name: "powerpc-elf".to_string(),
            io: IoConfig::default(),
            memory: MemoryMap {
                rom: MemoryRange {
                    base: 0x0100_0000,
                    size: "256KiB".to_string(),
                },
                ram: MemoryRange {
                    base: 0x0000_0000,
                    size: "1MiB".to_string(),
                },
            },
            sections: SectionMap {
                sdata2: SectionRange {
                    load: Some(0x0100_8000),
                    start: 0x0001_0000,
                    end: 0x0001_0010,
                },
                data: SectionRange {
                    load: Some(0x0100_8010),
                    start: 0x0001_0100,
                    end: 0x0001_0200,
                },
                sbss2: SectionRange {
                    load: None,
                    start: 0x0001_0200,
                    end: 0x0001_0210,
                },
                sbss: SectionRange {
                    load: None,
                    start: 0x0001_0300,
                    end: 0x0001_0340,
                },
                bss: SectionRange {
                    load: None,
                    start: 0x0001_1000,
                    end: 0x0001_2000,
                },
            },
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open board descriptor at {:?}", path))?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let desc: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Board Descriptor YAML")?;
        desc.validate()?;
        Ok(desc)
    }

    pub fn io_map(&self) -> IoMap {
        IoMap {
            base: self.io.base,
            halt_port: self.io.halt.port,
            halt_code: self.io.halt.code,
            serial_port: self.io.serial.port,
            tx_wait_ready: self.io.serial.tx_wait_ready,
        }
    }

    /// Fails when a copied section has no load address; `validate` reports
    /// that case with the section name.
    pub fn layout(&self) -> Result<EabiLayout> {
        let s = &self.sections;
        let copy = |name: &'static str, r: &SectionRange| -> Result<(u32, u32, u32)> {
            let load = r.load.ok_or(LayoutError::MissingLoad(name))?;
            Ok((load, r.start, r.end))
        };
        Ok(EabiLayout::new(
            copy(".sdata2", &s.sdata2)?,
            copy(".data", &s.data)?,
            (s.sbss2.start, s.sbss2.end),
            (s.sbss.start, s.sbss.end),
            (s.bss.start, s.bss.end),
        ))
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }
        if self.name.trim().is_empty() {
            anyhow::bail!("Board 'name' cannot be empty");
        }

        let rom = self.memory.rom.bounds().context("Invalid ROM size")?;
        let ram = self.memory.ram.bounds().context("Invalid RAM size")?;
        for (name, (_, hi)) in [("rom", rom), ("ram", ram)] {
            if hi > ADDRESS_SPACE {
                return Err(LayoutError::RegionOutOfRange(name).into());
            }
        }
        if rom.0 < ram.1 && ram.0 < rom.1 {
            return Err(LayoutError::RegionOverlap.into());
        }
        let inside = |(lo, hi): (u64, u64), start: u64, end: u64| start >= lo && end <= hi;

        let s = &self.sections;
        let named = [
            (".sdata2", &s.sdata2, true),
            (".data", &s.data, true),
            (".sbss2", &s.sbss2, false),
            (".sbss", &s.sbss, false),
            (".bss", &s.bss, false),
        ];

        for (name, range, initialized) in named {
            if range.end < range.start {
                return Err(LayoutError::Inverted(name).into());
            }
            match (initialized, range.load) {
                (true, None) => return Err(LayoutError::MissingLoad(name).into()),
                (false, Some(_)) => return Err(LayoutError::UnexpectedLoad(name).into()),
                (true, Some(load)) => {
                    let len = (range.end - range.start) as u64;
                    let (lo, hi) = (load as u64, load as u64 + len);
                    if !inside(rom, lo, hi) && !inside(ram, lo, hi) {
                        return Err(LayoutError::LoadOutOfRange(name).into());
                    }
                }
                (false, None) => {}
            }
            if !inside(ram, range.start as u64, range.end as u64) {
                return Err(LayoutError::RunOutOfRange(name).into());
            }
        }

        for (i, (a, ra, _)) in named.iter().enumerate() {
            for (b, rb, _) in &named[i + 1..] {
                let empty = ra.start == ra.end || rb.start == rb.end;
                if !empty && ra.start < rb.end && rb.start < ra.end {
                    return Err(LayoutError::Overlap(*a, *b).into());
                }
            }
        }

        Ok(())
    }
}

/// "copy" or "zero", for reports.
pub fn section_kind_name(kind: &SectionKind) -> &'static str {
    match kind {
        SectionKind::Copy { .. } => "copy",
        SectionKind::Zero => "zero",
    }
}

pub fn parse_size(size_str: &str) -> Result<u64> {
    use human_size::{Byte, Size, SpecificSize};
    let s: Size = size_str
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid size format: {}", e))?;
    let bytes: SpecificSize<Byte> = s.into();
    Ok(bytes.value() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_board_is_valid() {
        let desc = BoardDescriptor::powerpc_elf();
        desc.validate().unwrap();
        assert_eq!(desc.io_map(), IoMap::POWERPC_ELF);

        let layout = desc.layout().unwrap();
        assert_eq!(layout.data.kind, SectionKind::Copy { load: 0x0100_8010 });
        assert_eq!(layout.bss.len(), 0x1000);
    }

    #[test]
    fn test_parse_size_binary_units() {
        assert_eq!(parse_size("256KiB").unwrap(), 256 * 1024);
        assert_eq!(parse_size("1MiB").unwrap(), 1024 * 1024);
        assert!(parse_size("lots").is_err());
    }

    #[test]
    fn test_overlap_is_rejected() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.sections.sbss.start = 0x0001_0100;
        desc.sections.sbss.end = 0x0001_0110;
        let err = desc.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<LayoutError>(),
            Some(&LayoutError::Overlap(".data", ".sbss"))
        );
    }

    #[test]
    fn test_empty_sections_never_overlap() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.sections.sbss2.start = 0x0001_0100;
        desc.sections.sbss2.end = 0x0001_0100;
        desc.validate().unwrap();
    }

    #[test]
    fn test_huge_region_size_is_an_error() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.memory.rom.size = "20EiB".to_string();
        assert!(desc.memory.rom.bounds().is_err());
        assert!(desc.validate().is_err());
    }

    #[test]
    fn test_region_past_address_space_is_rejected() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.memory.ram.size = "64TiB".to_string();
        let err = desc.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<LayoutError>(),
            Some(&LayoutError::RegionOutOfRange("ram"))
        );

        // A region may end exactly at 4 GiB.
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.memory.rom.base = 0xFFFF_0000;
        desc.memory.rom.size = "64KiB".to_string();
        desc.sections.sdata2.load = Some(0x0000_8000);
        desc.sections.data.load = Some(0x0000_8010);
        desc.validate().unwrap();
    }

    #[test]
    fn test_overlapping_regions_are_rejected() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.memory.rom.base = 0x000F_0000;
        let err = desc.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<LayoutError>(),
            Some(&LayoutError::RegionOverlap)
        );
    }

    #[test]
    fn test_inverted_section_is_rejected() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.sections.bss.end = desc.sections.bss.start - 1;
        let err = desc.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<LayoutError>(),
            Some(&LayoutError::Inverted(".bss"))
        );
    }

    #[test]
    fn test_copy_section_needs_load_address() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.sections.data.load = None;
        assert!(desc.validate().is_err());
        assert!(desc.layout().is_err());

        let mut desc = BoardDescriptor::powerpc_elf();
        desc.sections.bss.load = Some(0x0100_0000);
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("cannot have a load address"));
    }

    #[test]
    fn test_load_image_outside_memory_is_rejected() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.sections.sdata2.load = Some(0x0200_0000);
        let err = desc.validate().unwrap_err();
        assert_eq!(
            err.downcast_ref::<LayoutError>(),
            Some(&LayoutError::LoadOutOfRange(".sdata2"))
        );
    }

    #[test]
    fn test_run_range_must_be_in_ram() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.sections.bss.start = 0x0100_0000;
        desc.sections.bss.end = 0x0100_0010;
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("outside RAM"));
    }

    #[test]
    fn test_unsupported_schema_version() {
        let mut desc = BoardDescriptor::powerpc_elf();
        desc.schema_version = "2.0".to_string();
        let err = desc.validate().unwrap_err();
        assert!(err.to_string().contains("Unsupported schema_version"));
    }
}
