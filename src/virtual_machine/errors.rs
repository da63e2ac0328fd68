use thiserror::Error;

/// Errors surfaced by the bytecode codec and the disassembler.
///
/// Machine *faults* (division by zero, segfault, ...) are not errors in this
/// sense; they are reported through the VM's termination
/// [`Status`](super::vm::Status) field.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MachineError {
    /// An operand decode ran past the end of the code buffer.
    #[error("unexpected end of code at offset {offset}")]
    OutOfCode { offset: usize },
    /// A jump target does not fit the 2-byte jump operand encoding.
    #[error("jump target {target} exceeds the 16-bit code address space")]
    JumpOutOfRange { target: u64 },
}
