/// Classification of an expression token.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// Decimal number literal.
    Number,
    /// `@`-prefixed memory cell reference; the lexeme is the digits only.
    Register,
    /// Unary or binary operator.
    Operator,
    LeftParen,
    RightParen,
}

/// One lexed token with the operator attributes the shunting-yard needs.
///
/// Precedence, associativity and the unary flag are only meaningful for
/// [`TokenKind::Operator`]; operands and parentheses leave them at their
/// defaults.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub precedence: u8,
    /// Kept for completeness; no operator in the current grammar uses it.
    pub right_assoc: bool,
    pub unary: bool,
}

impl Token {
    /// Creates a number literal token.
    pub fn number(text: impl Into<String>) -> Self {
        Self::operand(TokenKind::Number, text)
    }

    /// Creates a memory cell reference token.
    pub fn register(text: impl Into<String>) -> Self {
        Self::operand(TokenKind::Register, text)
    }

    /// Creates a binary operator token at the given precedence.
    pub fn binary(text: impl Into<String>, precedence: u8) -> Self {
        Self {
            kind: TokenKind::Operator,
            text: text.into(),
            precedence,
            right_assoc: false,
            unary: false,
        }
    }

    /// Creates a unary operator token at the given precedence.
    pub fn unary(text: impl Into<String>, precedence: u8) -> Self {
        Self {
            kind: TokenKind::Operator,
            text: text.into(),
            precedence,
            right_assoc: false,
            unary: true,
        }
    }

    /// Creates a parenthesis token.
    pub fn paren(kind: TokenKind, text: impl Into<String>) -> Self {
        Self::operand(kind, text)
    }

    fn operand(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            precedence: 0,
            right_assoc: false,
            unary: false,
        }
    }
}
