// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunInputs {
    /// Raw ROM image, loaded at the board's ROM base.
    #[serde(default)]
    pub rom: Option<String>,
    /// Board descriptor; the reference board when absent.
    #[serde(default)]
    pub board: Option<String>,
    /// Built-in entry program: "banner", "echo" or "idle".
    pub program: String,
    /// Bytes queued on the serial receiver before bring-up.
    #[serde(default)]
    pub serial_input: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunLimits {
    /// Status polls a single serial wait may spend before it is abandoned.
    pub max_polls: u64,
    /// Fallback spins after the stop code.
    #[serde(default)]
    pub halt_spins: u64,
}

/// One check per entry; an entry with more than one key is rejected.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged, deny_unknown_fields)]
pub enum ScriptAssertion {
    SerialContains { serial_contains: String },
    SerialEquals { serial_equals: String },
    Halted { halted: bool },
    StopCode { stop_code: u8 },
    MemoryValue { memory_value: MemoryValue },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MemoryValue {
    pub address: u32,
    pub expected_value: u8,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct RunScript {
    pub schema_version: String,
    pub inputs: RunInputs,
    pub limits: RunLimits,
    #[serde(default)]
    pub assertions: Vec<ScriptAssertion>,
}

impl RunScript {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let f = std::fs::File::open(&path)
            .with_context(|| format!("Failed to open run script at {:?}", path.as_ref()))?;
        let script: Self = serde_yaml::from_reader(f).context("Failed to parse Run Script YAML")?;
        script.validate()?;
        Ok(script)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.inputs.program.trim().is_empty() {
            anyhow::bail!("Input 'program' cannot be empty");
        }

        if self.limits.max_polls == 0 {
            anyhow::bail!("Limit 'max_polls' must be greater than zero");
        }

        Ok(())
    }

    /// Resolves a script-relative input path.
    pub fn resolve(&self, script_path: &Path, input: &str) -> std::path::PathBuf {
        let p = Path::new(input);
        if p.is_absolute() {
            return p.to_path_buf();
        }
        script_path
            .parent()
            .map(|dir| dir.join(p))
            .unwrap_or_else(|| p.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn test_valid_script() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  program: echo
  serial_input: "hi"
limits:
  max_polls: 1000
assertions:
  - serial_equals: "hi"
  - halted: true
  - stop_code: 1
  - memory_value:
      address: 0x10000
      expected_value: 0
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        script.validate().unwrap();
        assert_eq!(script.assertions.len(), 4);
        assert_eq!(
            script.assertions[1],
            ScriptAssertion::Halted { halted: true }
        );
        assert_eq!(
            script.assertions[3],
            ScriptAssertion::MemoryValue {
                memory_value: MemoryValue {
                    address: 0x10000,
                    expected_value: 0
                }
            }
        );
    }

    #[test]
    fn test_zero_poll_budget_is_rejected() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  program: banner
limits:
  max_polls: 0
"#;
        let script: RunScript = serde_yaml::from_str(yaml).unwrap();
        let err = script.validate().unwrap_err();
        assert!(err.to_string().contains("max_polls"));
    }

    #[test]
    fn test_unknown_input_field_is_rejected() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  program: banner
  firmware: fw.elf
limits:
  max_polls: 10
"#;
        assert!(serde_yaml::from_str::<RunScript>(yaml).is_err());
    }

    #[test]
    fn test_assertion_with_two_checks_is_rejected() {
        let yaml = r#"
schema_version: "1.0"
inputs:
  program: idle
limits:
  max_polls: 10
assertions:
  - { halted: true, stop_code: 2 }
"#;
        assert!(serde_yaml::from_str::<RunScript>(yaml).is_err());

        let single: ScriptAssertion = serde_yaml::from_str("stop_code: 2").unwrap();
        assert_eq!(single, ScriptAssertion::StopCode { stop_code: 2 });
    }

    #[test]
    fn test_relative_inputs_resolve_next_to_script() {
        let mut dir = std::env::temp_dir();
        dir.push("labwired-bsp-config-tests");
        let _ = std::fs::create_dir_all(&dir);
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = dir.join(format!("script-{}.yaml", nonce));
        std::fs::write(
            &path,
            r#"
schema_version: "1.0"
inputs:
  program: banner
  rom: rom.bin
limits:
  max_polls: 10
"#,
        )
        .unwrap();

        let script = RunScript::from_file(&path).unwrap();
        let rom = script.resolve(&path, script.inputs.rom.as_deref().unwrap());
        assert_eq!(rom, dir.join("rom.bin"));
    }
}
