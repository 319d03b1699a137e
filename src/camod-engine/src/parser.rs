// Copyright 2025 The Camod Authors. All rights reserved.
// Use of this source code is governed by the Apache License,
// Version 2.0, that can be found in the LICENSE file.

//! Hand-written recursive descent parser for model equations.
//!
//! Carbon-allocation models are written in plain arithmetic: sums of
//! flux terms, products with allocation fractions, exponentials.  The
//! grammar is deliberately small; there are no conditionals.

use crate::ast::{BinaryOp, Expr, Loc, UnaryOp};
use crate::common::{EquationError, ErrorCode};
use crate::token::{Lexer, Spanned, Token};

/// TokenKind discriminant for efficient peek comparisons without payload matching
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TokenKind {
    Exp,
    Plus,
    Minus,
    Mul,
    Div,
    LParen,
    RParen,
    Comma,
    Ident,
    Num,
}

impl<'a> From<&Token<'a>> for TokenKind {
    fn from(token: &Token<'a>) -> Self {
        match token {
            Token::Exp => TokenKind::Exp,
            Token::Plus => TokenKind::Plus,
            Token::Minus => TokenKind::Minus,
            Token::Mul => TokenKind::Mul,
            Token::Div => TokenKind::Div,
            Token::LParen => TokenKind::LParen,
            Token::RParen => TokenKind::RParen,
            Token::Comma => TokenKind::Comma,
            Token::Ident(_) => TokenKind::Ident,
            Token::Num(_) => TokenKind::Num,
        }
    }
}

/// Parser state holding tokenized input
struct Parser<'input> {
    tokens: Vec<Spanned<Token<'input>>>,
    pos: usize,
}

impl<'input> Parser<'input> {
    /// Create a new parser from a lexer, collecting all tokens up front.
    /// Returns an error if the lexer produces any errors.
    fn new(lexer: Lexer<'input>) -> Result<Self, EquationError> {
        let mut tokens = Vec::new();
        for result in lexer {
            match result {
                Ok(tok) => tokens.push(tok),
                Err(e) => return Err(e),
            }
        }
        Ok(Parser { tokens, pos: 0 })
    }

    fn peek(&self) -> Option<&Spanned<Token<'input>>> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|(_, tok, _)| TokenKind::from(tok))
    }

    fn advance(&mut self) -> Option<&Spanned<Token<'input>>> {
        if self.pos < self.tokens.len() {
            let tok = &self.tokens[self.pos];
            self.pos += 1;
            Some(tok)
        } else {
            None
        }
    }

    /// Expect the current token to match the expected kind, returning an error if not
    fn expect(&mut self, expected: TokenKind) -> Result<&Spanned<Token<'input>>, EquationError> {
        if self.peek_kind() == Some(expected) {
            Ok(self.advance().unwrap())
        } else if let Some((start, _, end)) = self.peek() {
            Err(EquationError {
                start: *start as u16,
                end: *end as u16,
                code: ErrorCode::UnrecognizedToken,
            })
        } else {
            let pos = self.eof_position();
            Err(EquationError {
                start: pos as u16,
                end: (pos + 1) as u16,
                code: ErrorCode::UnrecognizedEof,
            })
        }
    }

    fn eof_position(&self) -> usize {
        if let Some((_, _, end)) = self.tokens.last() {
            *end
        } else {
            0
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Parse an equation from the token stream.
    /// Returns Ok(None) for empty input or comment-only input.
    fn parse_equation(&mut self) -> Result<Option<Expr>, EquationError> {
        if self.is_at_end() {
            return Ok(None);
        }

        let expr = self.parse_expr()?;

        // Check for extra tokens after the expression
        if let Some((start, _, end)) = self.peek() {
            return Err(EquationError {
                start: *start as u16,
                end: *end as u16,
                code: ErrorCode::ExtraToken,
            });
        }

        Ok(Some(expr))
    }

    /// Parse additive operators (+, -) - lowest precedence
    fn parse_expr(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            let loc = Loc::new(left.get_loc().start as usize, right.get_loc().end as usize);
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        Ok(left)
    }

    /// Parse multiplicative operators (*, /)
    fn parse_multiplicative(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek_kind() {
                Some(TokenKind::Mul) => BinaryOp::Mul,
                Some(TokenKind::Div) => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            let loc = Loc::new(left.get_loc().start as usize, right.get_loc().end as usize);
            left = Expr::Op2(op, Box::new(left), Box::new(right), loc);
        }

        Ok(left)
    }

    /// Parse unary operators (+, -)
    fn parse_unary(&mut self) -> Result<Expr, EquationError> {
        match self.peek_kind() {
            Some(TokenKind::Plus) => {
                let (lpos, _, _) = *self.advance().unwrap();
                let operand = self.parse_exponentiation()?;
                let rpos = operand.get_loc().end as usize;
                Ok(Expr::Op1(
                    UnaryOp::Positive,
                    Box::new(operand),
                    Loc::new(lpos, rpos),
                ))
            }
            Some(TokenKind::Minus) => {
                let (lpos, _, _) = *self.advance().unwrap();
                let operand = self.parse_exponentiation()?;
                let rpos = operand.get_loc().end as usize;
                Ok(Expr::Op1(
                    UnaryOp::Negative,
                    Box::new(operand),
                    Loc::new(lpos, rpos),
                ))
            }
            _ => self.parse_exponentiation(),
        }
    }

    /// Parse exponentiation operator (^) - left associative
    fn parse_exponentiation(&mut self) -> Result<Expr, EquationError> {
        let mut left = self.parse_app()?;

        while self.peek_kind() == Some(TokenKind::Exp) {
            self.advance();
            let right = self.parse_app()?;
            let loc = Loc::new(left.get_loc().start as usize, right.get_loc().end as usize);
            left = Expr::Op2(BinaryOp::Exp, Box::new(left), Box::new(right), loc);
        }

        Ok(left)
    }

    /// Parse function application: id(args)
    fn parse_app(&mut self) -> Result<Expr, EquationError> {
        if self.peek_kind() == Some(TokenKind::Ident)
            && self.pos + 1 < self.tokens.len()
            && TokenKind::from(&self.tokens[self.pos + 1].1) == TokenKind::LParen
        {
            let (lpos, tok, _) = *self.advance().unwrap();
            let name = if let Token::Ident(s) = tok {
                s.to_string()
            } else {
                unreachable!()
            };

            self.advance(); // consume '('
            let args = self.parse_comma_separated_exprs()?;
            let (_, _, rpos) = *self.expect(TokenKind::RParen)?;

            return Ok(Expr::App(name, args, Loc::new(lpos, rpos)));
        }

        self.parse_atom()
    }

    /// Parse an atomic expression (number, identifier, parenthesized expression)
    fn parse_atom(&mut self) -> Result<Expr, EquationError> {
        match self.peek_kind() {
            Some(TokenKind::Num) => {
                let (lpos, tok, rpos) = *self.advance().unwrap();
                if let Token::Num(s) = tok {
                    match s.parse::<f64>() {
                        Ok(n) => Ok(Expr::Const(s.to_string(), n, Loc::new(lpos, rpos))),
                        Err(_) => Err(EquationError {
                            start: lpos as u16,
                            end: rpos as u16,
                            code: ErrorCode::ExpectedNumber,
                        }),
                    }
                } else {
                    unreachable!()
                }
            }
            Some(TokenKind::Ident) => {
                let (lpos, tok, rpos) = *self.advance().unwrap();
                if let Token::Ident(s) = tok {
                    Ok(Expr::Var(s.to_string(), Loc::new(lpos, rpos)))
                } else {
                    unreachable!()
                }
            }
            Some(TokenKind::LParen) => {
                self.advance(); // consume '('
                let expr = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(expr)
            }
            Some(_) => {
                let (start, _, end) = self.peek().unwrap();
                Err(EquationError {
                    start: *start as u16,
                    end: *end as u16,
                    code: ErrorCode::UnrecognizedToken,
                })
            }
            None => {
                let pos = self.eof_position();
                Err(EquationError {
                    start: pos as u16,
                    end: (pos + 1) as u16,
                    code: ErrorCode::UnrecognizedEof,
                })
            }
        }
    }

    /// Parse comma-separated expressions (for function arguments)
    fn parse_comma_separated_exprs(&mut self) -> Result<Vec<Expr>, EquationError> {
        let mut exprs = Vec::new();

        // Handle empty list
        if self.peek_kind() == Some(TokenKind::RParen) {
            return Ok(exprs);
        }

        exprs.push(self.parse_expr()?);

        while self.peek_kind() == Some(TokenKind::Comma) {
            self.advance(); // consume ','

            // Handle trailing comma
            if self.peek_kind() == Some(TokenKind::RParen) {
                break;
            }

            exprs.push(self.parse_expr()?);
        }

        Ok(exprs)
    }
}

/// Parse an equation string into an AST.
///
/// Returns:
/// - `Ok(Some(expr))` for valid equations
/// - `Ok(None)` for empty or comment-only input
/// - `Err(error)` for lex or parse errors
pub fn parse(input: &str) -> Result<Option<Expr>, EquationError> {
    let lexer = Lexer::new(input);
    let mut parser = Parser::new(lexer)?;
    parser.parse_equation()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::print_eqn;

    fn parsed(input: &str) -> Expr {
        parse(input).unwrap().unwrap().strip_loc()
    }

    fn var(id: &str) -> Expr {
        Expr::Var(id.to_string(), Loc::default())
    }

    fn num(s: &str, n: f64) -> Expr {
        Expr::Const(s.to_string(), n, Loc::default())
    }

    fn op2(op: BinaryOp, l: Expr, r: Expr) -> Expr {
        Expr::Op2(op, Box::new(l), Box::new(r), Loc::default())
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            op2(
                BinaryOp::Add,
                var("a"),
                op2(BinaryOp::Mul, var("b"), var("c"))
            ),
            parsed("a + b*c"),
        );
        assert_eq!(
            op2(
                BinaryOp::Mul,
                op2(BinaryOp::Add, var("a"), var("b")),
                var("c")
            ),
            parsed("(a + b)*c"),
        );
        assert_eq!(
            op2(
                BinaryOp::Mul,
                var("u"),
                op2(BinaryOp::Exp, var("B"), num("2", 2.0))
            ),
            parsed("u * B^2"),
        );
    }

    #[test]
    fn test_left_associativity() {
        assert_eq!(
            op2(
                BinaryOp::Sub,
                op2(BinaryOp::Sub, var("a"), var("b")),
                var("c")
            ),
            parsed("a - b - c"),
        );
    }

    #[test]
    fn test_unary() {
        assert_eq!(
            Expr::Op1(UnaryOp::Negative, Box::new(var("k")), Loc::default()),
            parsed("-k"),
        );
        // unary binds before the enclosing product is extended
        assert_eq!(
            op2(
                BinaryOp::Mul,
                Expr::Op1(UnaryOp::Negative, Box::new(var("k")), Loc::default()),
                var("t")
            ),
            parsed("-k * t"),
        );
    }

    #[test]
    fn test_app() {
        assert_eq!(
            Expr::App(
                "exp".to_string(),
                vec![op2(
                    BinaryOp::Mul,
                    Expr::Op1(UnaryOp::Negative, Box::new(var("k")), Loc::default()),
                    var("t")
                )],
                Loc::default()
            ),
            parsed("exp(-k*t)"),
        );
        assert_eq!(
            Expr::App("f".to_string(), vec![], Loc::default()),
            parsed("f()"),
        );
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(Ok(None), parse(""));
        assert_eq!(Ok(None), parse("   "));
        assert_eq!(Ok(None), parse("{ only a comment }"));
    }

    #[test]
    fn test_errors() {
        let err = parse("a +").unwrap_err();
        assert_eq!(ErrorCode::UnrecognizedEof, err.code);

        let err = parse("a b").unwrap_err();
        assert_eq!(ErrorCode::ExtraToken, err.code);

        let err = parse("(a").unwrap_err();
        assert_eq!(ErrorCode::UnrecognizedEof, err.code);
    }

    #[test]
    fn test_roundtrip_printing() {
        // print_eqn parenthesizes explicitly; reparsing preserves shape
        let e = parsed("(u + f_v) * C_f / C_r");
        let printed = print_eqn(&e);
        assert_eq!(e, parsed(&printed));
    }
}
