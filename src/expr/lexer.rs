//! Expression lexer.
//!
//! Scans left to right, skipping spaces and tabs. Two-character operators
//! win over their one-character prefixes (`<<` before `<`). The characters
//! `~` and `!` are unary only, `-` is binary only; which reading applies is
//! decided from the preceding token, so the lexer owns unary disambiguation
//! and the parser never sees an ambiguous operator.

use crate::expr::errors::CompileError;
use crate::expr::token::{Token, TokenKind};

/// Precedence of the unary operators `~` and `!`, above every binary level.
pub const UNARY_PRECEDENCE: u8 = 11;

/// Splits an expression into tokens.
pub fn tokenize(expr: &str) -> Result<Vec<Token>, CompileError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == ' ' || c == '\t' {
            i += 1;
            continue;
        }

        if c == '@' {
            let digits = digit_run(&chars, i + 1);
            if digits.is_empty() {
                return Err(CompileError::EmptyReference);
            }
            i += 1 + digits.len();
            tokens.push(Token::register(digits));
            continue;
        }

        if c.is_ascii_digit() {
            let digits = digit_run(&chars, i);
            i += digits.len();
            tokens.push(Token::number(digits));
            continue;
        }

        if c == '(' {
            tokens.push(Token::paren(TokenKind::LeftParen, "("));
            i += 1;
            continue;
        }
        if c == ')' {
            tokens.push(Token::paren(TokenKind::RightParen, ")"));
            i += 1;
            continue;
        }

        // Two-character operators, longest match first.
        if let Some((text, precedence)) = two_char_operator(c, chars.get(i + 1).copied()) {
            tokens.push(Token::binary(text, precedence));
            i += 2;
            continue;
        }

        tokens.push(single_char_operator(c, &tokens)?);
        i += 1;
    }

    Ok(tokens)
}

fn digit_run(chars: &[char], start: usize) -> String {
    chars[start..]
        .iter()
        .take_while(|c| c.is_ascii_digit())
        .collect()
}

fn two_char_operator(c: char, next: Option<char>) -> Option<(&'static str, u8)> {
    match (c, next?) {
        ('&', '&') => Some(("&&", 2)),
        ('|', '|') => Some(("||", 1)),
        ('<', '<') => Some(("<<", 8)),
        ('>', '>') => Some((">>", 8)),
        ('<', '=') => Some(("<=", 7)),
        ('>', '=') => Some((">=", 7)),
        ('=', '=') => Some(("==", 6)),
        ('!', '=') => Some(("!=", 6)),
        _ => None,
    }
}

fn single_char_operator(c: char, tokens: &[Token]) -> Result<Token, CompileError> {
    match c {
        '~' | '!' => {
            if unary_position(tokens) {
                Ok(Token::unary(c, UNARY_PRECEDENCE))
            } else {
                Err(CompileError::NotBinary { op: c })
            }
        }
        '-' => {
            // Everything is an unsigned word; a leading minus has no meaning.
            if unary_position(tokens) {
                Err(CompileError::NotUnary { op: c })
            } else {
                Ok(Token::binary(c, 9))
            }
        }
        '*' | '/' | '%' => Ok(Token::binary(c, 10)),
        '+' => Ok(Token::binary(c, 9)),
        '<' | '>' => Ok(Token::binary(c, 7)),
        '&' => Ok(Token::binary(c, 5)),
        '^' => Ok(Token::binary(c, 4)),
        '|' => Ok(Token::binary(c, 3)),
        other => Err(CompileError::UnexpectedCharacter { ch: other }),
    }
}

/// True when the next operator would be in a unary position: at the start
/// of the expression, after another operator, or after a left paren.
fn unary_position(tokens: &[Token]) -> bool {
    match tokens.last() {
        None => true,
        Some(t) => matches!(t.kind, TokenKind::Operator | TokenKind::LeftParen),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(expr: &str) -> Vec<String> {
        tokenize(expr)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.text)
            .collect()
    }

    #[test]
    fn numbers_registers_and_operators() {
        assert_eq!(texts("12 + @34"), ["12", "+", "34"]);
        let tokens = tokenize("12 + @34").unwrap();
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[2].kind, TokenKind::Register);
    }

    #[test]
    fn whitespace_is_insignificant() {
        assert_eq!(texts("1+2"), texts("  1 \t+ 2 "));
    }

    #[test]
    fn longest_match_wins() {
        assert_eq!(texts("1<<2<=3<4"), ["1", "<<", "2", "<=", "3", "<", "4"]);
        assert_eq!(texts("1&&2&3"), ["1", "&&", "2", "&", "3"]);
    }

    #[test]
    fn tilde_and_bang_are_unary_after_operators_and_parens() {
        let tokens = tokenize("~1 + (!2)").unwrap();
        assert!(tokens[0].unary);
        assert_eq!(tokens[0].precedence, UNARY_PRECEDENCE);
        assert!(tokens[4].unary);
    }

    #[test]
    fn tilde_in_binary_position_is_an_error() {
        assert_eq!(tokenize("5 ~ 3"), Err(CompileError::NotBinary { op: '~' }));
        assert_eq!(tokenize("5 ! 3"), Err(CompileError::NotBinary { op: '!' }));
    }

    #[test]
    fn minus_in_unary_position_is_an_error() {
        assert_eq!(tokenize("-5"), Err(CompileError::NotUnary { op: '-' }));
        assert_eq!(tokenize("1 + -5"), Err(CompileError::NotUnary { op: '-' }));
        assert_eq!(tokenize("(-5)"), Err(CompileError::NotUnary { op: '-' }));
    }

    #[test]
    fn bare_at_sign_is_an_error() {
        assert_eq!(tokenize("@ + 1"), Err(CompileError::EmptyReference));
    }

    #[test]
    fn unknown_characters_are_rejected() {
        assert_eq!(
            tokenize("1 = 2"),
            Err(CompileError::UnexpectedCharacter { ch: '=' })
        );
        assert_eq!(
            tokenize("a"),
            Err(CompileError::UnexpectedCharacter { ch: 'a' })
        );
    }
}
