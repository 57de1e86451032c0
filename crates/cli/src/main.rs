// LabWired - Firmware Simulation Platform
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::{Parser, Subcommand};
use labwired_bsp_config::{BoardDescriptor, RunScript, ScriptAssertion};
use labwired_bsp_core::programs::Program;
use labwired_bsp_core::{PollBudget, RunReport, SimTarget};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

const EXIT_PASS: u8 = 0;
const EXIT_ASSERT_FAIL: u8 = 1;
const EXIT_CONFIG_ERROR: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

const RESULT_SCHEMA_VERSION: &str = "1.0";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "LabWired PowerPC BSP Simulator",
    long_about = None,
    subcommand_negates_reqs = true
)]
struct Cli {
    /// Path to the board descriptor (YAML); the reference PowerPC ELF board if omitted
    #[arg(short, long)]
    board: Option<PathBuf>,

    /// Raw ROM image holding the load copies of .sdata2 and .data
    #[arg(short, long)]
    rom: Option<PathBuf>,

    /// Entry program run after bring-up (banner, echo, idle)
    #[arg(short, long, default_value = "banner")]
    program: Program,

    /// Bytes queued on the serial receiver before bring-up
    #[arg(long)]
    input: Option<String>,

    /// Status polls a serial wait may spend before it is abandoned
    #[arg(long, default_value = "10000")]
    max_polls: u64,

    /// Fallback spins after the stop code
    #[arg(long, default_value = "0")]
    halt_spins: u64,

    /// Force serial loopback regardless of the board descriptor
    #[arg(long)]
    loopback: bool,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,

    /// Write a peripheral snapshot (JSON) after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Disable serial stdout echo (still captured for the report)
    #[arg(long)]
    no_serial_stdout: bool,

    /// Enable register-level tracing
    #[arg(short, long, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Deterministic, CI-friendly runner mode driven by a run script (YAML).
    Test(TestArgs),
}

#[derive(Parser, Debug)]
struct TestArgs {
    /// Path to the run script (YAML)
    #[arg(short = 'c', long)]
    script: PathBuf,

    /// Directory to write test artifacts (result.json, serial.log)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Also echo serial output to stdout, ahead of the JSON result
    #[arg(long)]
    serial_stdout: bool,
}

#[derive(Debug, Serialize)]
struct AssertionResult {
    assertion: ScriptAssertion,
    passed: bool,
}

#[derive(Debug, Serialize)]
struct TestResult {
    result_schema_version: String,
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    rom_hash: String,
    report: Option<RunReport>,
    assertions: Vec<AssertionResult>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing with appropriate level based on --trace flag
    if cli.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Some(Commands::Test(ref args)) => run_test(args),
        None => run_interactive(&cli),
    }
}

fn load_board(path: Option<&Path>) -> anyhow::Result<BoardDescriptor> {
    match path {
        Some(p) => BoardDescriptor::from_file(p),
        None => Ok(BoardDescriptor::powerpc_elf()),
    }
}

fn read_rom(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    use anyhow::Context;
    match path {
        Some(p) => std::fs::read(p).with_context(|| format!("Failed to read ROM image: {:?}", p)),
        None => Ok(Vec::new()),
    }
}

fn rom_hash(rom: &[u8]) -> String {
    let digest = Sha256::digest(rom);
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

fn build_target(
    board: &BoardDescriptor,
    budget: PollBudget,
    rom: &[u8],
    input: Option<&str>,
    echo_stdout: bool,
) -> anyhow::Result<SimTarget> {
    let mut target = SimTarget::from_descriptor(board, budget)?;
    target.set_echo_stdout(echo_stdout);
    if !rom.is_empty() {
        target.load_rom(rom)?;
    }
    if let Some(input) = input {
        target.queue_serial_input(input.as_bytes());
    }
    Ok(target)
}

fn run_interactive(cli: &Cli) -> ExitCode {
    let mut board = match load_board(cli.board.as_deref()) {
        Ok(b) => b,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    if cli.loopback {
        board.io.serial.loopback = true;
    }

    let rom = match read_rom(cli.rom.as_deref()) {
        Ok(r) => r,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let budget = PollBudget::new(cli.max_polls).with_halt_spins(cli.halt_spins);
    let echo = !(cli.json || cli.no_serial_stdout);
    let mut target = match build_target(&board, budget, &rom, cli.input.as_deref(), echo) {
        Ok(t) => t,
        Err(e) => {
            error!("{:#}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    info!("Running program {:?} on '{}'", cli.program, board.name);
    let report = match target.run_program(cli.program) {
        Ok(r) => r,
        Err(e) => {
            error!("Simulation error: {}", e);
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    if let Some(path) = &cli.snapshot {
        match serde_json::to_string_pretty(&target.snapshot()) {
            Ok(json) => {
                if let Err(e) = std::fs::write(path, json) {
                    error!("Failed to write snapshot: {}", e);
                }
            }
            Err(e) => error!("Failed to serialize snapshot: {}", e),
        }
    }

    if cli.json {
        match serde_json::to_string(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => error!("Failed to serialize report: {}", e),
        }
    } else {
        info!(
            "Phase: {}, stop codes: {:?}, serial bytes: {}, stalled waits: {}",
            report.phase, report.stop_codes, report.serial_tx_bytes, report.stalled_waits
        );
    }

    if report.halted {
        ExitCode::from(EXIT_PASS)
    } else {
        warn!("Board never wrote its stop code");
        ExitCode::from(EXIT_RUNTIME_ERROR)
    }
}

fn evaluate(assertion: &ScriptAssertion, target: &SimTarget, report: &RunReport) -> bool {
    match assertion {
        ScriptAssertion::SerialContains { serial_contains } => {
            report.serial_output.contains(serial_contains.as_str())
        }
        ScriptAssertion::SerialEquals { serial_equals } => &report.serial_output == serial_equals,
        ScriptAssertion::Halted { halted } => report.halted == *halted,
        ScriptAssertion::StopCode { stop_code } => report.stop_codes.last() == Some(stop_code),
        ScriptAssertion::MemoryValue { memory_value } => {
            target.memory.read_u8(memory_value.address).ok() == Some(memory_value.expected_value)
        }
    }
}

fn write_result(output_dir: Option<&Path>, result: &TestResult, serial: &[u8]) {
    match serde_json::to_string(result) {
        Ok(json) => println!("{}", json),
        Err(e) => error!("Failed to serialize result: {}", e),
    }

    let Some(dir) = output_dir else {
        return;
    };
    if let Err(e) = std::fs::create_dir_all(dir) {
        error!("Failed to create output directory {:?}: {}", dir, e);
        return;
    }
    match serde_json::to_string_pretty(result) {
        Ok(json) => {
            if let Err(e) = std::fs::write(dir.join("result.json"), json) {
                error!("Failed to write result.json: {}", e);
            }
        }
        Err(e) => error!("Failed to serialize result: {}", e),
    }
    if let Err(e) = std::fs::write(dir.join("serial.log"), serial) {
        error!("Failed to write serial.log: {}", e);
    }
}

fn config_error(args: &TestArgs, message: String) -> ExitCode {
    error!("{}", message);
    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: "error".to_string(),
        message: Some(message),
        rom_hash: String::new(),
        report: None,
        assertions: Vec::new(),
    };
    write_result(args.output_dir.as_deref(), &result, &[]);
    ExitCode::from(EXIT_CONFIG_ERROR)
}

fn run_test(args: &TestArgs) -> ExitCode {
    let script = match RunScript::from_file(&args.script) {
        Ok(s) => s,
        Err(e) => return config_error(args, format!("{:#}", e)),
    };

    let program: Program = match script.inputs.program.parse() {
        Ok(p) => p,
        Err(e) => return config_error(args, e),
    };

    let board_path = script
        .inputs
        .board
        .as_deref()
        .map(|b| script.resolve(&args.script, b));
    let board = match load_board(board_path.as_deref()) {
        Ok(b) => b,
        Err(e) => return config_error(args, format!("{:#}", e)),
    };

    let rom_path = script
        .inputs
        .rom
        .as_deref()
        .map(|r| script.resolve(&args.script, r));
    let rom = match read_rom(rom_path.as_deref()) {
        Ok(r) => r,
        Err(e) => return config_error(args, format!("{:#}", e)),
    };

    let budget = PollBudget::new(script.limits.max_polls).with_halt_spins(script.limits.halt_spins);
    let mut target = match build_target(
        &board,
        budget,
        &rom,
        script.inputs.serial_input.as_deref(),
        args.serial_stdout,
    ) {
        Ok(t) => t,
        Err(e) => return config_error(args, format!("{:#}", e)),
    };

    let report = match target.run_program(program) {
        Ok(r) => r,
        Err(e) => {
            error!("Simulation error: {}", e);
            let result = TestResult {
                result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
                status: "error".to_string(),
                message: Some(e.to_string()),
                rom_hash: rom_hash(&rom),
                report: None,
                assertions: Vec::new(),
            };
            write_result(args.output_dir.as_deref(), &result, &target.serial_output());
            return ExitCode::from(EXIT_RUNTIME_ERROR);
        }
    };

    let assertions: Vec<AssertionResult> = script
        .assertions
        .iter()
        .map(|a| AssertionResult {
            assertion: a.clone(),
            passed: evaluate(a, &target, &report),
        })
        .collect();
    let passed = assertions.iter().all(|a| a.passed);
    for a in assertions.iter().filter(|a| !a.passed) {
        warn!("Assertion failed: {:?}", a.assertion);
    }

    let result = TestResult {
        result_schema_version: RESULT_SCHEMA_VERSION.to_string(),
        status: if passed { "pass" } else { "fail" }.to_string(),
        message: None,
        rom_hash: rom_hash(&rom),
        report: Some(report),
        assertions,
    };
    write_result(args.output_dir.as_deref(), &result, &target.serial_output());

    if passed {
        ExitCode::from(EXIT_PASS)
    } else {
        ExitCode::from(EXIT_ASSERT_FAIL)
    }
}
