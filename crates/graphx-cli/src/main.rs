//! CLI entry point for the GraphX VM runner.
//!
//! `graphx <program.bin> [--debug] [--dump-memory]` loads a binary program
//! image, runs it to completion, and exits 0 on a clean halt or 1 on a load
//! error or VM fault.

use std::env;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use graphx_core::{disassemble_word, ProgramImage, Vm, VmObserver, VmStatus};
use log::{debug, error, info};

const HELP_TEXT: &str = "Usage: graphx <program.bin> [--debug] [--dump-memory] [--help]";

/// Side length of the data-memory dump grid (256 x 256 floats covers the
/// full 65536-cell memory, matching the PageRank-style workflows).
const DUMP_GRID: usize = 256;

#[derive(Debug, PartialEq, Eq)]
struct CliArgs {
    program: PathBuf,
    debug: bool,
    dump_memory: bool,
}

#[derive(Debug)]
enum ParseResult {
    Args(CliArgs),
    Help,
}

fn parse_args(args: impl Iterator<Item = OsString>) -> Result<ParseResult, String> {
    let mut program: Option<PathBuf> = None;
    let mut debug = false;
    let mut dump_memory = false;

    for arg in args {
        if arg == "--help" {
            return Ok(ParseResult::Help);
        }

        if arg == "--debug" {
            debug = true;
            continue;
        }

        if arg == "--dump-memory" {
            dump_memory = true;
            continue;
        }

        if arg.to_string_lossy().starts_with('-') {
            return Err(format!("unknown option: {}", arg.to_string_lossy()));
        }

        if program.is_some() {
            return Err(String::from("multiple program paths provided"));
        }
        program = Some(PathBuf::from(arg));
    }

    let program = program.ok_or_else(|| String::from("missing program path"))?;
    Ok(ParseResult::Args(CliArgs {
        program,
        debug,
        dump_memory,
    }))
}

/// Per-step trace printer installed under `--debug`.
struct TraceObserver;

impl VmObserver for TraceObserver {
    fn on_step(&mut self, vm: &Vm) {
        let pc = vm.last_pc();
        if let Some(word) = vm.program_word(pc) {
            debug!("{}", disassemble_word(pc, word).render());
        }
        debug!(
            "      flags={:#05b} clock={} frontier={}+{}",
            vm.regs().flags(),
            vm.clock(),
            vm.frontiers().current().len(),
            vm.frontiers().next().len()
        );
    }
}

fn run(args: &CliArgs) -> ExitCode {
    let bytes = match std::fs::read(&args.program) {
        Ok(bytes) => bytes,
        Err(source) => {
            error!("failed to read {}: {source}", args.program.display());
            return ExitCode::FAILURE;
        }
    };

    let image = match ProgramImage::from_bytes(&bytes) {
        Ok(image) => image,
        Err(source) => {
            error!("failed to load {}: {source}", args.program.display());
            return ExitCode::FAILURE;
        }
    };
    info!(
        "loaded {} program words, {} nodes, {} edges, {} memory words",
        image.code.len(),
        image.graph.node_count(),
        image.graph.edge_count(),
        image.memory.len()
    );

    let mut vm = match Vm::from_image(image) {
        Ok(vm) => vm,
        Err(source) => {
            error!("failed to install {}: {source}", args.program.display());
            return ExitCode::FAILURE;
        }
    };
    let status = if args.debug {
        vm.run_with(&mut TraceObserver)
    } else {
        vm.run()
    };

    match status {
        VmStatus::Halted => {
            println!("HALT after {} instructions", vm.clock());
            if args.dump_memory {
                dump_memory(&vm);
            }
            ExitCode::SUCCESS
        }
        VmStatus::Errored(fault) => {
            let pc = vm.last_pc();
            eprintln!("ERROR at pc {pc}: {fault}");
            if let Some(word) = vm.program_word(pc) {
                eprintln!("  {}", disassemble_word(pc, word).render());
            }
            ExitCode::FAILURE
        }
        // run() only returns once the VM has stopped.
        VmStatus::Running => ExitCode::FAILURE,
    }
}

/// Prints data memory as a 256 x 256 grid of floats.
fn dump_memory(vm: &Vm) {
    let cells = vm.memory().as_slice();
    for row in 0..DUMP_GRID {
        let line = cells[row * DUMP_GRID..(row + 1) * DUMP_GRID]
            .iter()
            .map(|cell| format!("{}", f32::from_bits(*cell as u32)))
            .collect::<Vec<_>>()
            .join(" ");
        println!("{line}");
    }
}

fn main() -> ExitCode {
    match parse_args(env::args_os().skip(1)) {
        Ok(ParseResult::Help) => {
            println!("{HELP_TEXT}");
            ExitCode::SUCCESS
        }
        Ok(ParseResult::Args(args)) => {
            let mut builder = env_logger::Builder::from_default_env();
            if args.debug {
                builder.filter_level(log::LevelFilter::Debug);
            }
            builder.init();
            run(&args)
        }
        Err(error) => {
            eprintln!("error: {error}");
            eprintln!("{HELP_TEXT}");
            ExitCode::FAILURE
        }
    }
}
