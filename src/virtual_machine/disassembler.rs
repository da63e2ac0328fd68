//! Bytecode disassembler.
//!
//! Linear scan over a code buffer, one instruction per line:
//!
//! ```text
//! L00000: PUSH 7
//! L00002: PUSH 5
//! L00004: ADD
//! L00005: POP @3
//! L00007: TERM
//! ```
//!
//! Every line starts with the instruction's byte offset zero-padded to five
//! digits. Operands carrying `REG_PTR` render as `@<value>`, jump targets as
//! `L<target>` labels, everything else as plain decimals. An instruction
//! with the `STACK` flag set renders as its bare mnemonic (the operand count
//! tells the two forms apart), except `JT`/`JF`, which keep their inline
//! jump target. The output is exactly what the canonical encoder reproduces
//! byte-for-byte, which is what makes disassembly round-trips faithful.

use crate::virtual_machine::errors::MachineError;
use crate::virtual_machine::isa::{Opcode, OPCODE_MASK, STACK};
use crate::virtual_machine::operand;
use std::fmt::Write;

/// Disassembles a whole code buffer into its textual program.
///
/// Unknown opcodes render as `UNKNOWN_OPCODE_<n>` and the scan continues at
/// the next byte; a truncated operand is a hard error carrying the offset.
pub fn disassemble(code: &[u8]) -> Result<String, MachineError> {
    let mut out = String::new();
    let mut pc = 0;
    while pc < code.len() {
        let (line, next) = instruction_at(code, pc)?;
        // String formatting does not fail on a String sink.
        let _ = writeln!(out, "{line}");
        pc = next;
    }
    Ok(out)
}

/// Renders the single instruction starting at `pc`.
///
/// Returns the rendered line (including its `L<pc5>:` prefix) and the offset
/// of the next instruction. Also used by the VM's `--debug` trace.
pub fn instruction_at(code: &[u8], pc: usize) -> Result<(String, usize), MachineError> {
    let byte = *code
        .get(pc)
        .ok_or(MachineError::OutOfCode { offset: pc })?;
    let mut line = format!("L{pc:05}: ");
    let mut at = pc + 1;

    let stacked = byte & STACK != 0;
    let op = match Opcode::try_from(byte & OPCODE_MASK) {
        Ok(op) => op,
        Err(unknown) => {
            let _ = write!(line, "UNKNOWN_OPCODE_{unknown}");
            return Ok((line, at));
        }
    };

    line.push_str(op.mnemonic());

    let mut remaining = op.inline_operands();
    if stacked && op.has_stack_form() {
        // Stack-form operands come off the operand stack; only the jump
        // target of JT/JF stays inline.
        remaining = if op.trailing_jump() { 1 } else { 0 };
    }

    for slot in 0..remaining {
        let last = slot + 1 == remaining;
        if last && op.trailing_jump() {
            let (addr, consumed) = operand::decode_jump(code, at)?;
            let _ = write!(line, " L{addr:05}");
            at += consumed;
        } else {
            let (decoded, consumed) = operand::decode(code, at)?;
            if decoded.indirect {
                let _ = write!(line, " @{}", decoded.value);
            } else {
                let _ = write!(line, " {}", decoded.value);
            }
            at += consumed;
        }
    }

    Ok((line, at))
}
