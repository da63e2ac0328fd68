use thiserror::Error;

/// Errors raised while compiling an infix expression.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A character the lexer does not recognize.
    #[error("unexpected character `{ch}` in expression")]
    UnexpectedCharacter { ch: char },
    /// `-` used in a unary position; the machine has no signed values.
    #[error("`{op}` is not a unary operator")]
    NotUnary { op: char },
    /// `~` or `!` used between two operands.
    #[error("`{op}` is not a binary operator")]
    NotBinary { op: char },
    /// `@` with no digits after it.
    #[error("`@` must be followed by a memory cell number")]
    EmptyReference,
    /// Parentheses do not pair up.
    #[error("mismatched parentheses")]
    MismatchedParentheses,
    /// An operator in the postfix walk had too few operands.
    #[error("operator `{op}` is missing an operand")]
    MissingOperand { op: String },
    /// An operator token with no assembly mapping reached emission.
    #[error("unknown operator `{op}`")]
    UnknownOperator { op: String },
    /// The postfix walk did not reduce to a single value.
    #[error("malformed expression: {values} values left on the stack")]
    Unbalanced { values: usize },
}
