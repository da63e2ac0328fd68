//! GVM toolchain library.
//!
//! Provides the expression-to-assembly compiler, the bytecode virtual
//! machine, and the disassembler that recovers assembly text from bytecode.

pub mod expr;
pub mod utils;
pub mod virtual_machine;
