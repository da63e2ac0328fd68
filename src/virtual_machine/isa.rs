//! Instruction Set Architecture (ISA) definitions.
//!
//! The [`for_each_opcode!`](crate::for_each_opcode) macro holds the canonical
//! opcode table and invokes a callback macro for code generation, so the VM,
//! the disassembler, and the expression compiler all draw their mnemonics and
//! operand arities from a single definition list.
//!
//! This module generates:
//! - The [`Opcode`] enum with its byte values
//! - `TryFrom<u8>` for decoding the low 7 bits of a dispatch byte
//! - `mnemonic()`, `inline_operands()`, and `has_stack_form()` lookups
//!
//! # Dispatch byte layout
//!
//! Bit 7 of the dispatch byte is the [`STACK`] flag: set on a stack-capable
//! opcode, the instruction takes its operands from the operand stack and
//! pushes its result back, instead of decoding inline operands. The low
//! 7 bits ([`OPCODE_MASK`]) select the opcode; valid values occupy `[0, 34]`.

/// Stack-form flag in the dispatch byte.
pub const STACK: u8 = 0x80;

/// Mask selecting the opcode number from a dispatch byte.
pub const OPCODE_MASK: u8 = 0x7F;

/// Invokes a callback macro with the complete opcode definition list.
///
/// Each row is `Variant = code, "MNEMONIC" => [inline_operands, stack_form]`.
#[macro_export]
macro_rules! for_each_opcode {
    ($callback:ident) => {
        $callback! {
            // =========================
            // Machine control
            // =========================
            /// NOP ; no effect
            Nop = 0, "NOP" => [0, false],
            /// TERM ; PC = u64::MAX, halting the machine cleanly
            Term = 1, "TERM" => [0, false],
            /// SET dst, src ; io[dst] = src
            Set = 2, "SET" => [2, false],
            /// JMP addr ; PC = addr
            Jmp = 3, "JMP" => [1, false],
            // =========================
            // Arithmetic (result into R, wrapping)
            // =========================
            /// ADD a, b ; R = a + b
            Add = 4, "ADD" => [2, true],
            /// SUB a, b ; R = a - b, faults NegNum when a < b
            Sub = 5, "SUB" => [2, true],
            /// MUL a, b ; R = a * b
            Mul = 6, "MUL" => [2, true],
            /// DIV a, b ; R = a / b, faults DivZero when b == 0
            Div = 7, "DIV" => [2, true],
            /// MOD a, b ; R = a % b, faults DivZero when b == 0
            Mod = 8, "MOD" => [2, true],
            // =========================
            // Bitwise and logical
            // =========================
            /// OR a, b ; R = a | b (bitwise)
            Or = 9, "OR" => [2, true],
            /// ANDL a, b ; R = (a != 0 && b != 0) as 0/1
            Andl = 10, "ANDL" => [2, true],
            /// XOR a, b ; R = a ^ b
            Xor = 11, "XOR" => [2, true],
            /// NOT a ; R = (a == 0) as 0/1
            Not = 12, "NOT" => [1, true],
            /// SHL a, b ; R = a << b
            Shl = 13, "SHL" => [2, true],
            /// SHR a, b ; R = a >> b
            Shr = 14, "SHR" => [2, true],
            // =========================
            // Memory cells and operand stack
            // =========================
            /// INC dst ; io[dst] += 1
            Inc = 15, "INC" => [1, false],
            /// DEC dst ; io[dst] -= 1, no underflow check
            Dec = 16, "DEC" => [1, false],
            /// PUSH v ; push v onto the operand stack
            Push = 17, "PUSH" => [1, false],
            /// POP dst ; pop the operand stack into io[dst]
            Pop = 18, "POP" => [1, false],
            /// AND a, b ; R = a & b (bitwise)
            And = 19, "AND" => [2, true],
            /// HOST ; invoke the host hook with the memory image
            Host = 20, "HOST" => [0, false],
            /// VPUSH ptr, v ; p = io[ptr]; io[ptr] = p + 1; io[p + 1] = v
            Vpush = 21, "VPUSH" => [2, false],
            /// VPOP ptr, dst ; io[dst] = io[io[ptr]]; io[ptr] -= 1
            Vpop = 22, "VPOP" => [2, false],
            // =========================
            // Control flow
            // =========================
            /// CALL addr ; snapshot the registers, PC = addr
            Call = 23, "CALL" => [1, false],
            /// RET v ; restore the top snapshot, then R = v
            Ret = 24, "RET" => [1, false],
            /// JF cond, addr ; PC = addr when cond == 0
            Jf = 25, "JF" => [2, true],
            /// JT cond, addr ; PC = addr when cond != 0
            Jt = 26, "JT" => [2, true],
            // =========================
            // Comparisons (0/1 into R)
            // =========================
            /// EQ a, b ; R = (a == b)
            Eq = 27, "EQ" => [2, true],
            /// NE a, b ; R = (a != b)
            Ne = 28, "NE" => [2, true],
            /// GT a, b ; R = (a > b)
            Gt = 29, "GT" => [2, true],
            /// LT a, b ; R = (a < b)
            Lt = 30, "LT" => [2, true],
            /// GE a, b ; R = (a >= b)
            Ge = 31, "GE" => [2, true],
            /// LE a, b ; R = (a <= b)
            Le = 32, "LE" => [2, true],
            /// NEG a ; R = !a (bitwise complement)
            Neg = 33, "NEG" => [1, true],
            /// ORL a, b ; R = (a != 0 || b != 0) as 0/1
            Orl = 34, "ORL" => [2, true],
        }
    };
}

#[macro_export]
macro_rules! define_opcodes {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $code:literal, $mnemonic:literal => [
                $operands:expr, $stack:expr
            ]
        ),* $(,)?
    ) => {
        /// One opcode of the instruction set, identified by the low 7 bits
        /// of the dispatch byte.
        #[repr(u8)]
        #[derive(Copy, Clone, Debug, Eq, PartialEq)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $code,
            )*
        }

        impl TryFrom<u8> for Opcode {
            type Error = u8;

            /// Decodes an opcode number. The rejected byte is handed back as
            /// the error so callers can report or render it.
            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $code => Ok(Opcode::$name), )*
                    other => Err(other),
                }
            }
        }

        impl Opcode {
            /// Returns the assembly mnemonic for this opcode.
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the number of inline operands in the register form.
            pub const fn inline_operands(self) -> usize {
                match self {
                    $( Opcode::$name => $operands, )*
                }
            }

            /// Returns true when the opcode accepts the [`STACK`] dispatch flag.
            pub const fn has_stack_form(self) -> bool {
                match self {
                    $( Opcode::$name => $stack, )*
                }
            }
        }
    };
}

for_each_opcode!(define_opcodes);

impl Opcode {
    /// Returns true when the last inline operand is an absolute code address
    /// encoded as a bare 2-byte jump operand.
    pub const fn trailing_jump(self) -> bool {
        matches!(self, Opcode::Jmp | Opcode::Call | Opcode::Jf | Opcode::Jt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_try_from_valid_range() {
        for code in 0..=34u8 {
            let op = Opcode::try_from(code).expect("valid opcode");
            assert_eq!(op as u8, code);
        }
    }

    #[test]
    fn opcode_try_from_invalid() {
        assert_eq!(Opcode::try_from(35), Err(35));
        assert_eq!(Opcode::try_from(0x7F), Err(0x7F));
    }

    #[test]
    fn mnemonic_lookup() {
        assert_eq!(Opcode::Nop.mnemonic(), "NOP");
        assert_eq!(Opcode::Andl.mnemonic(), "ANDL");
        assert_eq!(Opcode::Orl.mnemonic(), "ORL");
        assert_eq!(Opcode::Neg.mnemonic(), "NEG");
    }

    #[test]
    fn stack_capability() {
        assert!(Opcode::Add.has_stack_form());
        assert!(Opcode::Jt.has_stack_form());
        assert!(Opcode::Neg.has_stack_form());
        assert!(!Opcode::Set.has_stack_form());
        assert!(!Opcode::Push.has_stack_form());
        assert!(!Opcode::Call.has_stack_form());
    }

    #[test]
    fn jump_operand_positions() {
        assert!(Opcode::Jmp.trailing_jump());
        assert!(Opcode::Call.trailing_jump());
        assert!(Opcode::Jf.trailing_jump());
        assert!(Opcode::Jt.trailing_jump());
        assert!(!Opcode::Set.trailing_jump());
        assert!(!Opcode::Ret.trailing_jump());
    }

    #[test]
    fn stack_flag_is_disjoint_from_opcode_numbers() {
        for code in 0..=34u8 {
            assert_eq!(code & STACK, 0);
            assert_eq!(code & OPCODE_MASK, code);
        }
    }
}
