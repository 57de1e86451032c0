// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use labwired_bsp_config::BoardDescriptor;
use labwired_bsp_core::programs::Program;
use labwired_bsp_core::{PollBudget, SimTarget};

const COM2_BOARD: &str = r#"
name: "ppc-com2"
io:
  base: 0xF0000000
  halt:
    port: 0x94
    code: 0x7f
  serial:
    port: 0x2f8
    loopback: true
memory:
  rom: { base: 0x01000000, size: "64KiB" }
  ram: { base: 0x0, size: "64KiB" }
sections:
  sdata2: { load: 0x01000000, start: 0x100, end: 0x104 }
  data: { load: 0x01000004, start: 0x200, end: 0x220 }
  sbss2: { start: 0x300, end: 0x308 }
  sbss: { start: 0x400, end: 0x440 }
  bss: { start: 0x1000, end: 0x2000 }
"#;

#[test]
fn test_relocated_board_runs_banner_and_halts_with_its_code() {
    let desc = BoardDescriptor::from_yaml(COM2_BOARD).unwrap();
    let mut target = SimTarget::from_descriptor(&desc, PollBudget::new(100)).unwrap();

    let mut rom = vec![0u8; 0x24];
    rom[..4].copy_from_slice(&[1, 2, 3, 4]);
    rom[4..10].copy_from_slice(b"COM2!\0");
    target.load_rom(&rom).unwrap();

    let report = target.run_program(Program::Banner).unwrap();
    assert_eq!(report.board, "ppc-com2");
    assert_eq!(report.serial_output, "COM2!");
    assert_eq!(report.stop_codes, vec![0x7f]);
    assert!(report.halted);
    assert_eq!(report.unmapped_accesses, 0);

    assert_eq!(target.memory.read_bytes(0x100, 4).unwrap(), vec![1, 2, 3, 4]);
}

#[test]
fn test_loopback_keeps_one_byte_cycling() {
    let desc = BoardDescriptor::from_yaml(COM2_BOARD).unwrap();
    let mut target = SimTarget::from_descriptor(&desc, PollBudget::new(3)).unwrap();
    target.queue_serial_input(b"A");

    // Every echoed byte lands back in the receiver.
    let mut rounds = 0;
    let report = target
        .run(|board, _| {
            for _ in 0..8 {
                let c = board.read_char().unwrap();
                board.write_char(c).unwrap();
                rounds += 1;
            }
        })
        .unwrap();

    assert_eq!(rounds, 8);
    assert_eq!(report.serial_output, "AAAAAAAA");
    assert_eq!(report.stalled_waits, 0);
}

#[test]
fn test_rom_larger_than_region_is_rejected() {
    let desc = BoardDescriptor::from_yaml(COM2_BOARD).unwrap();
    let mut target = SimTarget::from_descriptor(&desc, PollBudget::default()).unwrap();
    let err = target.load_rom(&vec![0u8; 64 * 1024 + 1]).unwrap_err();
    assert!(err.to_string().contains("does not fit"));
}

#[test]
fn test_report_serializes_to_json() {
    let mut target = SimTarget::powerpc_elf().unwrap();
    let report = target.run_program(Program::Idle).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["phase"], "halted");
    assert_eq!(json["sections"].as_array().unwrap().len(), 5);
    assert_eq!(json["sections"][0]["name"], ".sdata2");
    assert_eq!(json["sections"][4]["kind"], "zero");
}
