// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use crate::peripherals::halt::HaltController;
use crate::peripherals::serial::Uart16550;
use crate::Peripheral;
use labwired_bsp::{IoMap, RegisterFile};
use labwired_bsp_config::SerialConfig;
use std::sync::{Arc, Mutex};
use tracing::{trace, warn};

/// Value an unmapped read returns: nothing drives the data lines.
pub const OPEN_BUS: u8 = 0xFF;

pub struct PeripheralEntry {
    pub name: String,
    pub base: u32,
    pub size: u32,
    pub dev: Box<dyn Peripheral>,
}

impl PeripheralEntry {
    fn offset_of(&self, addr: u32) -> Option<u32> {
        let offset = addr.checked_sub(self.base)?;
        (offset < self.size).then_some(offset)
    }
}

/// Address-decoded simulated register file.
#[derive(Default)]
pub struct IoBus {
    pub peripherals: Vec<PeripheralEntry>,
    unmapped: u64,
}

impl IoBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// COM1 and the halt port at the addresses given by `map`.
    pub fn from_io_map(map: &IoMap, serial: &SerialConfig) -> Self {
        let mut uart = Uart16550::new().with_rx_delay(serial.rx_delay);
        uart.set_loopback(serial.loopback);

        let mut bus = Self::new();
        bus.add("com1", map.port(map.serial_port), 8, Box::new(uart));
        bus.add(
            "halt",
            map.halt_register(),
            1,
            Box::new(HaltController::new(map.halt_code)),
        );
        bus
    }

    pub fn add(&mut self, name: &str, base: u32, size: u32, dev: Box<dyn Peripheral>) {
        self.peripherals.push(PeripheralEntry {
            name: name.to_string(),
            base,
            size,
            dev,
        });
    }

    /// Attach a serial TX capture sink to any 16550 on this bus.
    ///
    /// When `echo_stdout` is false, serial writes will no longer be printed to stdout.
    pub fn attach_serial_tx_sink(&mut self, sink: Arc<Mutex<Vec<u8>>>, echo_stdout: bool) {
        for p in &mut self.peripherals {
            let Some(any) = p.dev.as_any_mut() else {
                continue;
            };
            let Some(uart) = any.downcast_mut::<Uart16550>() else {
                continue;
            };
            uart.set_sink(Some(sink.clone()), echo_stdout);
        }
    }

    pub fn device<T: 'static>(&self, name: &str) -> Option<&T> {
        self.peripherals
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any())
            .and_then(|any| any.downcast_ref::<T>())
    }

    pub fn device_mut<T: 'static>(&mut self, name: &str) -> Option<&mut T> {
        self.peripherals
            .iter_mut()
            .find(|p| p.name == name)
            .and_then(|p| p.dev.as_any_mut())
            .and_then(|any| any.downcast_mut::<T>())
    }

    pub fn serial(&self) -> Option<&Uart16550> {
        self.device("com1")
    }

    pub fn serial_mut(&mut self) -> Option<&mut Uart16550> {
        self.device_mut("com1")
    }

    pub fn halt_controller(&self) -> Option<&HaltController> {
        self.device("halt")
    }

    /// Accesses that hit no peripheral.
    pub fn unmapped_accesses(&self) -> u64 {
        self.unmapped
    }

    fn decode(&mut self, addr: u32) -> Option<(&mut PeripheralEntry, u32)> {
        self.peripherals
            .iter_mut()
            .find_map(|p| p.offset_of(addr).map(|off| (p, off)))
    }
}

impl RegisterFile for IoBus {
    fn read(&mut self, addr: u32) -> u8 {
        if let Some((p, offset)) = self.decode(addr) {
            let value = p.dev.read(offset);
            trace!("{} read  +{:#x} = {:#04x}", p.name, offset, value);
            return value;
        }
        self.unmapped += 1;
        warn!("Unmapped register read at {:#x}", addr);
        OPEN_BUS
    }

    fn write(&mut self, addr: u32, value: u8) {
        if let Some((p, offset)) = self.decode(addr) {
            trace!("{} write +{:#x} = {:#04x}", p.name, offset, value);
            p.dev.write(offset, value);
            return;
        }
        self.unmapped += 1;
        warn!("Unmapped register write {:#04x} at {:#x}", value, addr);
    }
}
