// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Entry programs the simulator can run in place of a linked `main`.

use crate::memory::SimMemory;
use crate::target::SimBoard;
use labwired_bsp::EabiLayout;
use std::str::FromStr;

pub const DEFAULT_BANNER: &[u8] = b"LabWired PowerPC BSP\n";

/// End-of-transmission; stops `echo`.
const EOT: u8 = 0x04;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// Prints the NUL-terminated string at the start of `.data`.
    #[default]
    Banner,
    /// Echoes received bytes until NUL, EOT or an idle line.
    Echo,
    /// Returns immediately.
    Idle,
}

impl FromStr for Program {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "banner" | "hello" => Ok(Self::Banner),
            "echo" => Ok(Self::Echo),
            "idle" | "none" => Ok(Self::Idle),
            _ => Err(format!(
                "unsupported program '{}'; supported: banner, echo, idle",
                value
            )),
        }
    }
}

impl Program {
    pub fn run(&self, board: &mut SimBoard, memory: &mut SimMemory, layout: &EabiLayout) {
        match self {
            Program::Banner => banner(board, memory, layout),
            Program::Echo => echo(board),
            Program::Idle => {}
        }
    }
}

fn banner(board: &mut SimBoard, memory: &SimMemory, layout: &EabiLayout) {
    let data = &layout.data;
    let text: Vec<u8> = (data.start..data.end)
        .map_while(|addr| memory.read_u8(addr).ok())
        .take_while(|&b| b != 0)
        .collect();
    let text = if text.is_empty() {
        DEFAULT_BANNER
    } else {
        &text[..]
    };

    for &b in text {
        if board.write_char(b).is_err() {
            return;
        }
    }
    let _ = board.sync(1);
}

fn echo(board: &mut SimBoard) {
    while let Ok(c) = board.read_char() {
        if c == 0 || c == EOT {
            break;
        }
        if board.write_char(c).is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_names() {
        assert_eq!("echo".parse::<Program>(), Ok(Program::Echo));
        assert_eq!(" Hello ".parse::<Program>(), Ok(Program::Banner));
        assert_eq!("idle".parse::<Program>(), Ok(Program::Idle));
        assert!("shell".parse::<Program>().is_err());
    }
}
