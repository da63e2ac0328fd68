//! Example host program for the GVM.
//!
//! Loads a bytecode file, runs it against a zeroed memory image with a
//! demonstration host hook, then dumps the registers and every non-zero
//! memory cell. The process exit status is the machine's termination code.
//!
//! # Usage
//! ```text
//! gvm <file> [--debug]
//! ```

use gvm::utils::log::{self, Level};
use gvm::virtual_machine::memory::{Memory, IO_SIZE, REG_SIZE};
use gvm::virtual_machine::vm::{HostHook, Vm, CODE_LIMIT, DEFAULT_OP_LIMIT};
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() < 2 { 1 } else { 0 });
    }

    let filename = &args[1];
    let mut debug = false;
    for arg in &args[2..] {
        match arg.as_str() {
            "--debug" => debug = true,
            other => {
                eprintln!("Unexpected argument: {other}\n");
                print_usage(&args[0]);
                process::exit(1);
            }
        }
    }

    if debug {
        log::init(Level::Debug);
    }

    let code = match fs::read(filename) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error opening file {filename}: {e}");
            process::exit(1);
        }
    };
    if code.len() > CODE_LIMIT {
        log::warn(&format!(
            "code is {} bytes; jump operands can only reach the first {CODE_LIMIT}",
            code.len()
        ));
    }

    let mut io = Memory::new();
    let status = {
        let hook: HostHook = Box::new(|io: &mut Memory| {
            log::info(&format!(
                "host hook called by the bytecode, pc = {}",
                io.pc()
            ));
        });
        let mut vm = Vm::with_host(&mut io, &code, hook);
        vm.set_trace(debug);
        let status = vm.run(DEFAULT_OP_LIMIT);
        println!(
            "vm.run() ended, term = {} ({}), opcode = {}",
            status.code(),
            status,
            vm.last_opcode()
        );
        status
    };

    dump(&io);
    process::exit(status.code() as i32);
}

/// Prints the register file and every non-zero memory cell, eliding runs of
/// zero cells. Register cells are marked with `*`.
fn dump(io: &Memory) {
    let mut skipped = false;
    for i in 0..IO_SIZE {
        let v = io[i];
        if v == 0 && i >= REG_SIZE {
            skipped = true;
            continue;
        }
        if skipped {
            skipped = false;
            println!("...");
        }
        let marker = if i < REG_SIZE { "*" } else { "" };
        if v == u64::MAX {
            println!("{marker}io[{i}] = (u64::MAX)");
        } else {
            println!("{marker}io[{i}] = {v}");
        }
    }
}

const USAGE: &str = "\
GVM bytecode virtual machine host

USAGE:
    {program} <file> [OPTIONS]

ARGS:
    <file>    GVM bytecode file to execute

OPTIONS:
    --debug       Trace every executed instruction to stderr
    -h, --help    Print this help message
";

fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
