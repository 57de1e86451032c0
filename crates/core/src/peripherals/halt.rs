// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// System control port that stops the simulation when the stop code is
/// written to it.
#[derive(Debug, serde::Serialize)]
pub struct HaltController {
    stop_code: u8,
    writes: Vec<u8>,
}

impl HaltController {
    pub fn new(stop_code: u8) -> Self {
        Self {
            stop_code,
            writes: Vec::new(),
        }
    }

    /// Every byte written to the port, in order.
    pub fn writes(&self) -> &[u8] {
        &self.writes
    }

    pub fn stop_requested(&self) -> bool {
        self.writes.contains(&self.stop_code)
    }
}

impl crate::Peripheral for HaltController {
    fn read(&mut self, _offset: u32) -> u8 {
        self.writes.last().copied().unwrap_or(0)
    }

    fn write(&mut self, _offset: u32, value: u8) {
        if value == self.stop_code {
            tracing::info!("Halt requested (stop code {:#04x})", value);
        } else {
            tracing::warn!("Unknown value {:#04x} written to halt port", value);
        }
        self.writes.push(value);
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
    use super::HaltController;
    use crate::Peripheral;

    #[test]
    fn test_only_stop_code_requests_halt() {
        let mut halt = HaltController::new(0x01);
        halt.write(0, 0x02);
        assert!(!halt.stop_requested());
        halt.write(0, 0x01);
        assert!(halt.stop_requested());
        assert_eq!(halt.writes(), &[0x02, 0x01]);
        assert_eq!(halt.read(0), 0x01);
    }
}
