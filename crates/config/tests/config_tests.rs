// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use labwired_bsp::IoMap;
use labwired_bsp_config::BoardDescriptor;

#[test]
fn test_minimal_yaml_uses_reference_io_map() {
    let yaml = r#"
name: "ppc-sim"
memory:
  rom:
    base: 0x01000000
    size: "256KiB"
  ram:
    base: 0x0
    size: "1MiB"
sections:
  sdata2: { load: 0x01008000, start: 0x10000, end: 0x10008 }
  data: { load: 0x01008008, start: 0x10100, end: 0x10120 }
  sbss2: { start: 0x10200, end: 0x10208 }
  sbss: { start: 0x10300, end: 0x10340 }
  bss: { start: 0x11000, end: 0x12000 }
"#;
    let desc = BoardDescriptor::from_yaml(yaml).unwrap();
    assert_eq!(desc.schema_version, "1.0");
    assert_eq!(desc.io_map(), IoMap::POWERPC_ELF);
    assert_eq!(desc.layout().unwrap().sections().len(), 5);
}

#[test]
fn test_io_overrides_parse() {
    let yaml = r#"
name: "ppc-sim-com2"
io:
  base: 0xF0000000
  halt:
    port: 0x94
    code: 0x7f
  serial:
    port: 0x2f8
    tx_wait_ready: true
    loopback: true
    rx_delay: 3
memory:
  rom:
    base: 0x01000000
    size: "64KiB"
  ram:
    base: 0x0
    size: "128KiB"
sections:
  sdata2: { load: 0x01000000, start: 0x100, end: 0x100 }
  data: { load: 0x01000000, start: 0x200, end: 0x210 }
  sbss2: { start: 0x300, end: 0x300 }
  sbss: { start: 0x400, end: 0x410 }
  bss: { start: 0x1000, end: 0x2000 }
"#;
    let desc = BoardDescriptor::from_yaml(yaml).unwrap();
    let map = desc.io_map();
    assert_eq!(map.halt_register(), 0xF000_0094);
    assert_eq!(map.halt_code, 0x7f);
    assert_eq!(map.serial_data(), 0xF000_02F8);
    assert!(map.tx_wait_ready);
    assert!(desc.io.serial.loopback);
    assert_eq!(desc.io.serial.rx_delay, 3);
}

#[test]
fn test_overlapping_sections_fail_to_load() {
    let yaml = r#"
name: "broken"
memory:
  rom: { base: 0x01000000, size: "64KiB" }
  ram: { base: 0x0, size: "128KiB" }
sections:
  sdata2: { load: 0x01000000, start: 0x100, end: 0x110 }
  data: { load: 0x01000010, start: 0x108, end: 0x120 }
  sbss2: { start: 0x300, end: 0x300 }
  sbss: { start: 0x400, end: 0x410 }
  bss: { start: 0x1000, end: 0x2000 }
"#;
    let err = BoardDescriptor::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("overlap"));
}

#[test]
fn test_bad_size_is_reported() {
    let yaml = r#"
name: "bad-size"
memory:
  rom: { base: 0x01000000, size: "huge" }
  ram: { base: 0x0, size: "128KiB" }
sections:
  sdata2: { load: 0x01000000, start: 0x100, end: 0x100 }
  data: { load: 0x01000000, start: 0x200, end: 0x200 }
  sbss2: { start: 0x300, end: 0x300 }
  sbss: { start: 0x400, end: 0x400 }
  bss: { start: 0x1000, end: 0x1000 }
"#;
    let err = BoardDescriptor::from_yaml(yaml).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid ROM size"));
}
