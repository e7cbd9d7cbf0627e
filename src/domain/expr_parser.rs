//! Recursive-descent parser for rule conditions.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr       := and_expr ( "||" and_expr )*
//! and_expr   := not_expr ( "&&" not_expr )*
//! not_expr   := "!" not_expr | comparison
//! comparison := additive ( ("<" | "<=" | ">" | ">=" | "==" | "!=") additive )?
//! additive   := term ( ("+" | "-") term )*
//! term       := factor ( ("*" | "/") factor )*
//! factor     := number | ident | "-" factor | "(" expr ")"
//! ident      := name ( "." name )*
//! ```
//!
//! Comparisons do not chain: `a < b < c` is rejected.

use crate::domain::error::ParseError;
use crate::domain::expr::{BinaryOp, Expr, UnaryOp};

/// Parse a condition string into an expression tree. The whole input must
/// be consumed; trailing characters are an error.
pub fn parse_expr(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    let expr = parser.parse_or()?;
    parser.skip_whitespace();
    if !parser.eof() {
        return Err(parser.error("unexpected trailing input"));
    }
    Ok(expr)
}

struct Parser {
    input: Vec<char>,
    pos: usize,
}

impl Parser {
    fn new(input: &str) -> Self {
        Parser {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> ParseError {
        ParseError {
            message: message.to_string(),
            position: self.pos,
        }
    }

    /// Consume `symbol` if it appears next (after whitespace). Two-char
    /// symbols must match fully, so `<` does not swallow the `<` of `<=`.
    fn eat_symbol(&mut self, symbol: &str) -> bool {
        self.skip_whitespace();
        let chars: Vec<char> = symbol.chars().collect();
        for (k, &c) in chars.iter().enumerate() {
            if self.peek_at(k) != Some(c) {
                return false;
            }
        }
        // `==` must not be matched when probing for a single `=` and the
        // like; extend the probe by one char for operator prefixes.
        if chars.len() == 1 {
            let next = self.peek_at(1);
            match (chars[0], next) {
                ('<', Some('=')) | ('>', Some('=')) | ('!', Some('=')) => return false,
                _ => {}
            }
        }
        self.pos += chars.len();
        true
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        while self.eat_symbol("||") {
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;
        while self.eat_symbol("&&") {
            let right = self.parse_not()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.eat_symbol("!") {
            let operand = self.parse_not()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_additive()?;
        let op = if self.eat_symbol("<=") {
            BinaryOp::Le
        } else if self.eat_symbol(">=") {
            BinaryOp::Ge
        } else if self.eat_symbol("==") {
            BinaryOp::Eq
        } else if self.eat_symbol("!=") {
            BinaryOp::Ne
        } else if self.eat_symbol("<") {
            BinaryOp::Lt
        } else if self.eat_symbol(">") {
            BinaryOp::Gt
        } else {
            return Ok(left);
        };
        let right = self.parse_additive()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_additive(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            let op = if self.eat_symbol("+") {
                BinaryOp::Add
            } else if self.eat_symbol("-") {
                BinaryOp::Sub
            } else {
                return Ok(left);
            };
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_factor()?;
        loop {
            let op = if self.eat_symbol("*") {
                BinaryOp::Mul
            } else if self.eat_symbol("/") {
                BinaryOp::Div
            } else {
                return Ok(left);
            };
            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let expr = self.parse_or()?;
                self.skip_whitespace();
                if self.peek() != Some(')') {
                    return Err(self.error("expected ')'"));
                }
                self.advance();
                Ok(expr)
            }
            Some('-') => {
                self.advance();
                let operand = self.parse_factor()?;
                Ok(Expr::Unary {
                    op: UnaryOp::Neg,
                    operand: Box::new(operand),
                })
            }
            Some(c) if c.is_ascii_digit() => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.parse_ident(),
            Some(_) => Err(self.error("expected number, identifier, or '('")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn parse_number(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            if !matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
                return Err(self.error("expected digit after decimal point"));
            }
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }
        let text: String = self.input[start..self.pos].iter().collect();
        let value = text.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number '{}'", text),
            position: start,
        })?;
        Ok(Expr::Number(value))
    }

    fn parse_ident(&mut self) -> Result<Expr, ParseError> {
        let start = self.pos;
        loop {
            while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
                self.advance();
            }
            if self.peek() == Some('.') {
                match self.peek_at(1) {
                    Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                        self.advance();
                    }
                    _ => return Err(self.error("expected name after '.'")),
                }
            } else {
                break;
            }
        }
        let name: String = self.input[start..self.pos].iter().collect();
        Ok(Expr::Ident(name))
    }
}
