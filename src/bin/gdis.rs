//! Disassembler CLI.
//!
//! Reads a GVM bytecode file and writes to stdout a GASM program that an
//! assembler can compile back to the same bytes.
//!
//! # Usage
//! ```text
//! gdis <file>
//! ```

use gvm::virtual_machine::disassembler;
use std::env;
use std::fs;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() != 2 || args[1] == "--help" || args[1] == "-h" {
        print_usage(&args[0]);
        process::exit(if args.len() == 2 { 0 } else { 1 });
    }

    let filename = &args[1];
    let code = match fs::read(filename) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error opening file {filename}: {e}");
            process::exit(1);
        }
    };

    match disassembler::disassemble(&code) {
        Ok(text) => print!("{text}"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

const USAGE: &str = "\
GVM bytecode disassembler

USAGE:
    {program} <file>

ARGS:
    <file>    GVM bytecode file to disassemble

OPTIONS:
    -h, --help    Print this help message
";

fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
