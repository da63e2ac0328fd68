//! Shunting-yard conversion from infix tokens to a postfix queue.

use crate::expr::errors::CompileError;
use crate::expr::token::{Token, TokenKind};
use std::collections::VecDeque;

/// Reorders an infix token stream into postfix.
///
/// Operands go straight to the output queue; operators wait on a stack until
/// an operator of lower precedence (or, for the hypothetical right-associative
/// case, lower-or-equal precedence) arrives. Parentheses only ever live on
/// the stack and are gone from the output.
pub fn shunting_yard(tokens: Vec<Token>) -> Result<VecDeque<Token>, CompileError> {
    let mut queue = VecDeque::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    for token in tokens {
        match token.kind {
            TokenKind::Number | TokenKind::Register => queue.push_back(token),

            TokenKind::Operator => {
                while yields_to_top(&token, stack.last()) {
                    if let Some(top) = stack.pop() {
                        queue.push_back(top);
                    }
                }
                stack.push(token);
            }

            TokenKind::LeftParen => stack.push(token),

            TokenKind::RightParen => loop {
                match stack.pop() {
                    Some(top) if top.kind == TokenKind::LeftParen => break,
                    Some(top) => queue.push_back(top),
                    None => return Err(CompileError::MismatchedParentheses),
                }
            },
        }
    }

    while let Some(top) = stack.pop() {
        if top.kind == TokenKind::LeftParen {
            return Err(CompileError::MismatchedParentheses);
        }
        queue.push_back(top);
    }

    Ok(queue)
}

/// True when `incoming` must let the operator on top of the stack pop first.
fn yields_to_top(incoming: &Token, top: Option<&Token>) -> bool {
    let Some(top) = top else {
        return false;
    };
    if top.kind != TokenKind::Operator {
        return false;
    }
    if incoming.right_assoc {
        incoming.precedence < top.precedence
    } else {
        incoming.precedence <= top.precedence
    }
}
