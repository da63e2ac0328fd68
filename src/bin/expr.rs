//! Expression compiler CLI.
//!
//! Compiles an infix expression to a GASM stack program on stdout.
//!
//! # Usage
//! ```text
//! expr [expression words...]
//! ```
//!
//! The arguments are joined with spaces, so the expression can be quoted or
//! written bare. With no arguments a built-in default expression is used.

use gvm::expr;
use std::env;
use std::process;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 && (args[1] == "--help" || args[1] == "-h") {
        print_usage(&args[0]);
        process::exit(0);
    }

    let expression = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        expr::DEFAULT_EXPRESSION.to_string()
    };

    match expr::compile_text(&expression, true) {
        Ok(program) => println!("{program}"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

const USAGE: &str = "\
GASM expression compiler

USAGE:
    {program} [expression words...]

ARGS:
    [expression words...]    Infix expression; the words are joined with
                             spaces. Defaults to a built-in demo expression.

OPTIONS:
    -h, --help               Print this help message

EXAMPLES:
    {program} '1 + 2 * @3'
    {program} 1 == 1 '&&' 2 != 3
";

fn print_usage(program: &str) {
    eprintln!("{}", USAGE.replace("{program}", program));
}
