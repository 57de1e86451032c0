// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use labwired_bsp::io_map::{SERIAL_DATA, SERIAL_LSR};
use labwired_bsp::LineStatus;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

const MCR: u32 = 0x04;
/// MCR bit 4: internal loopback.
const MCR_LOOP: u8 = 0x10;

/// 16550-style serial port: RBR/THR, LSR and scratch registers.
///
/// A received byte becomes visible only after `rx_delay` LSR polls, which
/// lets tests model a line that turns ready late.
#[derive(Debug, Default, serde::Serialize)]
pub struct Uart16550 {
    rx: VecDeque<u8>,
    rx_delay: u32,
    #[serde(skip)]
    countdown: u32,
    loopback: bool,
    regs: [u8; 8],
    #[serde(skip)]
    sink: Option<Arc<Mutex<Vec<u8>>>>,
    echo_stdout: bool,
    tx_count: u64,
    lsr_polls: u64,
}

impl Uart16550 {
    pub fn new() -> Self {
        Self {
            echo_stdout: true,
            ..Default::default()
        }
    }

    pub fn with_rx_delay(mut self, polls: u32) -> Self {
        self.rx_delay = polls;
        self
    }

    pub fn set_loopback(&mut self, enabled: bool) {
        self.loopback = enabled;
        if enabled {
            self.regs[MCR as usize] |= MCR_LOOP;
        } else {
            self.regs[MCR as usize] &= !MCR_LOOP;
        }
    }

    pub fn loopback(&self) -> bool {
        self.loopback
    }

    pub fn set_sink(&mut self, sink: Option<Arc<Mutex<Vec<u8>>>>, echo_stdout: bool) {
        self.sink = sink;
        self.echo_stdout = echo_stdout;
    }

    /// Queues bytes as if they arrived on the line.
    pub fn push_rx(&mut self, bytes: &[u8]) {
        for &b in bytes {
            if self.rx.is_empty() {
                self.countdown = self.rx_delay;
            }
            self.rx.push_back(b);
        }
    }

    pub fn pending_rx(&self) -> usize {
        self.rx.len()
    }

    pub fn tx_count(&self) -> u64 {
        self.tx_count
    }

    /// LSR reads so far, including the ones that reported "not ready".
    pub fn lsr_polls(&self) -> u64 {
        self.lsr_polls
    }

    fn data_visible(&self) -> bool {
        !self.rx.is_empty() && self.countdown == 0
    }

    fn line_status(&mut self) -> u8 {
        self.lsr_polls += 1;
        let mut status = LineStatus::THR_EMPTY;
        if !self.rx.is_empty() {
            if self.countdown > 0 {
                self.countdown -= 1;
            } else {
                status |= LineStatus::DATA_READY;
            }
        }
        status.bits()
    }

    fn pop_rx(&mut self) -> u8 {
        if !self.data_visible() {
            // Stale RBR; the reference board returns whatever was latched.
            return 0;
        }
        let b = self.rx.pop_front().unwrap_or(0);
        if !self.rx.is_empty() {
            self.countdown = self.rx_delay;
        }
        b
    }

    fn push_tx(&mut self, value: u8) {
        self.tx_count += 1;
        if let Some(sink) = &self.sink {
            if let Ok(mut guard) = sink.lock() {
                guard.push(value);
            }
        }

        if self.echo_stdout {
            #[allow(unused_must_use)]
            {
                print!("{}", value as char);
                io::stdout().flush();
            }
        }

        if self.loopback {
            self.push_rx(&[value]);
        }
    }
}

impl crate::Peripheral for Uart16550 {
    fn read(&mut self, offset: u32) -> u8 {
        match offset {
            o if o == SERIAL_DATA as u32 => self.pop_rx(),
            o if o == SERIAL_LSR as u32 => self.line_status(),
            o => self.regs.get(o as usize).copied().unwrap_or(0),
        }
    }

    fn write(&mut self, offset: u32, value: u8) {
        match offset {
            o if o == SERIAL_DATA as u32 => self.push_tx(value),
            // LSR is read-only.
            o if o == SERIAL_LSR as u32 => {}
            MCR => {
                self.regs[MCR as usize] = value;
                self.loopback = value & MCR_LOOP != 0;
            }
            o => {
                if let Some(r) = self.regs.get_mut(o as usize) {
                    *r = value;
                }
            }
        }
    }

    fn as_any(&self) -> Option<&dyn std::any::Any> {
        Some(self)
    }

    fn as_any_mut(&mut self) -> Option<&mut dyn std::any::Any> {
        Some(self)
    }

    fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::Uart16550;
    use crate::Peripheral;
    use std::sync::{Arc, Mutex};

    fn quiet() -> (Uart16550, Arc<Mutex<Vec<u8>>>) {
        let mut uart = Uart16550::new();
        let sink = Arc::new(Mutex::new(Vec::new()));
        uart.set_sink(Some(sink.clone()), false);
        (uart, sink)
    }

    #[test]
    fn test_transmit_goes_to_sink() {
        let (mut uart, sink) = quiet();
        uart.write(0x00, b'O');
        uart.write(0x00, b'K');
        assert_eq!(sink.lock().unwrap().clone(), b"OK".to_vec());
        assert_eq!(uart.tx_count(), 2);
        // THR is always empty; nothing pending to read.
        assert_eq!(uart.read(0x05), 0x20);
    }

    #[test]
    fn test_received_byte_sets_data_ready_and_pops() {
        let (mut uart, _) = quiet();
        uart.push_rx(b"hi");
        assert_eq!(uart.read(0x05) & 0x01, 0x01);
        assert_eq!(uart.read(0x00), b'h');
        assert_eq!(uart.read(0x00), b'i');
        assert_eq!(uart.read(0x05) & 0x01, 0x00);
        assert_eq!(uart.read(0x00), 0);
    }

    #[test]
    fn test_rx_delay_hides_byte_for_n_polls() {
        let (uart, _) = quiet();
        let mut uart = uart.with_rx_delay(2);
        uart.push_rx(b"x");
        // Not visible yet, so the data register does not pop it.
        assert_eq!(uart.read(0x00), 0);
        assert_eq!(uart.read(0x05) & 0x01, 0);
        assert_eq!(uart.read(0x05) & 0x01, 0);
        assert_eq!(uart.read(0x05) & 0x01, 1);
        assert_eq!(uart.read(0x00), b'x');
        assert_eq!(uart.lsr_polls(), 3);
    }

    #[test]
    fn test_mcr_loop_bit_enables_loopback() {
        let (mut uart, sink) = quiet();
        uart.write(0x04, 0x10);
        assert!(uart.loopback());
        uart.write(0x00, 0x41);
        assert_eq!(uart.read(0x00), 0x41);
        assert_eq!(sink.lock().unwrap().clone(), vec![0x41]);

        uart.write(0x04, 0x00);
        assert!(!uart.loopback());
    }

    #[test]
    fn test_lsr_writes_are_ignored() {
        let (mut uart, _) = quiet();
        uart.write(0x05, 0xFF);
        assert_eq!(uart.read(0x05), 0x20);
        uart.write(0x07, 0xA5);
        assert_eq!(uart.read(0x07), 0xA5);
    }
}
