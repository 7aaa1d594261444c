// cluster-test-orchestrator: scenario-driven orchestration, stat ingestion
// and offline analysis for gossip-membership cluster tests.
// Copyright (C) 2026 the project contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//! Hand-rolled recursive-descent evaluator for the tiny arithmetic grammar
//! used in assertion bounds:
//!
//! ```text
//! expr   := term  (('+'|'-') term)*
//! term   := factor (('*'|'/') factor)*
//! factor := number | '(' expr ')'
//! ```
//!
//! Only `+ - * /` over `f64` literals. Division by zero is an error, not
//! `±∞`. Anything else (identifiers, unit suffixes like `1s`) is a syntax
//! error: duration literals are parsed separately (see `value.rs`), and the
//! `parseValue` ordering (eval first, duration second) depends on this
//! evaluator rejecting non-numeric input cleanly rather than panicking.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EvalError {
    #[error("eval error for expression \"{0}\"")]
    Syntax(String),
    #[error("division by zero in expression \"{0}\"")]
    DivisionByZero(String),
}

/// Evaluate `expression` to an `f64`. Never panics, even on truncated input
/// like `"2+(3*4"` or `"(1.5+)*(3+4)"`.
pub fn eval(expression: &str) -> Result<f64, EvalError> {
    let tokens = tokenize(expression)
        .ok_or_else(|| EvalError::Syntax(expression.to_string()))?;
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        source: expression,
    };
    let value = parser.parse_expr()?;
    if parser.pos != parser.tokens.len() {
        return Err(EvalError::Syntax(expression.to_string()));
    }
    Ok(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Option<Vec<Token>> {
    let mut tokens = Vec::new();
    let bytes: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                let mut seen_dot = c == '.';
                i += 1;
                while i < bytes.len() {
                    let c = bytes[i];
                    if c.is_ascii_digit() {
                        i += 1;
                    } else if c == '.' && !seen_dot {
                        seen_dot = true;
                        i += 1;
                    } else {
                        break;
                    }
                }
                let text: String = bytes[start..i].iter().collect();
                let value: f64 = text.parse().ok()?;
                tokens.push(Token::Number(value));
            }
            _ => return None,
        }
    }
    Some(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    source: &'a str,
}

impl<'a> Parser<'a> {
    fn syntax_err(&self) -> EvalError {
        EvalError::Syntax(self.source.to_string())
    }

    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<Token> {
        let t = self.peek();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    fn parse_expr(&mut self) -> Result<f64, EvalError> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.advance();
                    value += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.advance();
                    value -= self.parse_term()?;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_term(&mut self) -> Result<f64, EvalError> {
        let mut value = self.parse_factor()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.advance();
                    value *= self.parse_factor()?;
                }
                Some(Token::Slash) => {
                    self.advance();
                    let rhs = self.parse_factor()?;
                    if rhs == 0.0 {
                        return Err(EvalError::DivisionByZero(self.source.to_string()));
                    }
                    value /= rhs;
                }
                _ => break,
            }
        }
        Ok(value)
    }

    fn parse_factor(&mut self) -> Result<f64, EvalError> {
        match self.advance() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.parse_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(self.syntax_err()),
                }
            }
            _ => Err(self.syntax_err()),
        }
    }
}
