//! Condition recursive descent parser.
//!
//! Precedence, loosest first:
//! `OR` → `AND` → `NOT` → comparison → `+ -` → `* / %` → unary minus → primary.
//! Comparisons do not chain: `a < b < c` is a syntax error.
//!
//! Conditions are bounded: at most [`MAX_TOKENS`] tokens and
//! [`MAX_DEPTH`] levels of parentheses or prefix operators. Anything larger
//! is a syntax error, so parsing and evaluation never recurse without limit.

use crate::{Error, Result};
use super::ast::*;
use super::lexer::{Token, TokenKind};

/// Longest accepted condition, end-of-input token excluded.
pub const MAX_TOKENS: usize = 256;

/// Deepest accepted nesting of `(`, `NOT` and unary signs.
pub const MAX_DEPTH: usize = 64;

/// Parser state — wraps a token slice with cursor.
struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Parser<'t> {
    fn new(tokens: &'t [Token]) -> Self {
        Self { tokens, pos: 0, depth: 0 }
    }

    /// Run `f` one nesting level deeper.
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_DEPTH {
            return Err(self.error(format!("Condition nests deeper than {MAX_DEPTH} levels")));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn advance(&mut self) -> &Token {
        let tok = &self.tokens[self.pos.min(self.tokens.len() - 1)];
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: TokenKind) -> Result<&Token> {
        let tok = self.peek();
        if tok.kind == kind {
            Ok(self.advance())
        } else {
            Err(self.error(format!("Expected {:?}, got {:?} '{}'", kind, tok.kind, tok.text)))
        }
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error(&self, msg: String) -> Error {
        Error::SyntaxError {
            position: self.peek().span.start,
            message: msg,
        }
    }
}

/// Parse a complete condition from tokens.
pub fn parse_condition(tokens: &[Token]) -> Result<Expr> {
    if tokens.is_empty() {
        return Err(Error::SyntaxError { position: 0, message: "Empty token stream".into() });
    }
    if let Some(tok) = tokens.get(MAX_TOKENS).filter(|t| t.kind != TokenKind::Eof) {
        return Err(Error::SyntaxError {
            position: tok.span.start,
            message: format!("Condition longer than {MAX_TOKENS} tokens"),
        });
    }
    let mut p = Parser::new(tokens);
    if p.at(TokenKind::Eof) {
        return Err(p.error("Empty condition".into()));
    }

    let expr = parse_expr(&mut p)?;

    if !p.at(TokenKind::Eof) {
        return Err(p.error(format!("Unexpected token after condition: {:?} '{}'", p.peek_kind(), p.peek().text)));
    }

    Ok(expr)
}

// ============================================================================
// Expression parsing (precedence climbing)
// ============================================================================

fn parse_expr(p: &mut Parser) -> Result<Expr> {
    parse_or_expr(p)
}

fn parse_or_expr(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_and_expr(p)?;
    while p.eat(TokenKind::Or) {
        let right = parse_and_expr(p)?;
        left = Expr::BinaryOp { left: Box::new(left), op: BinaryOp::Or, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_and_expr(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_not_expr(p)?;
    while p.eat(TokenKind::And) {
        let right = parse_not_expr(p)?;
        left = Expr::BinaryOp { left: Box::new(left), op: BinaryOp::And, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_not_expr(p: &mut Parser) -> Result<Expr> {
    if p.eat(TokenKind::Not) {
        let expr = p.nested(parse_not_expr)?;
        Ok(Expr::UnaryOp { op: UnaryOp::Not, expr: Box::new(expr) })
    } else {
        parse_comparison(p)
    }
}

fn comparison_op(kind: TokenKind) -> Option<BinaryOp> {
    match kind {
        TokenKind::Eq => Some(BinaryOp::Eq),
        TokenKind::Neq => Some(BinaryOp::Neq),
        TokenKind::Lt => Some(BinaryOp::Lt),
        TokenKind::Lte => Some(BinaryOp::Lte),
        TokenKind::Gt => Some(BinaryOp::Gt),
        TokenKind::Gte => Some(BinaryOp::Gte),
        _ => None,
    }
}

fn parse_comparison(p: &mut Parser) -> Result<Expr> {
    let left = parse_addition(p)?;

    let Some(op) = comparison_op(p.peek_kind()) else {
        return Ok(left);
    };
    p.advance();
    let right = parse_addition(p)?;

    if comparison_op(p.peek_kind()).is_some() {
        return Err(p.error("Chained comparisons are not supported; combine with AND".into()));
    }

    Ok(Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) })
}

fn parse_addition(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_multiplication(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            _ => break,
        };
        p.advance();
        let right = parse_multiplication(p)?;
        left = Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_multiplication(p: &mut Parser) -> Result<Expr> {
    let mut left = parse_unary(p)?;
    loop {
        let op = match p.peek_kind() {
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            _ => break,
        };
        p.advance();
        let right = parse_unary(p)?;
        left = Expr::BinaryOp { left: Box::new(left), op, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_unary(p: &mut Parser) -> Result<Expr> {
    if p.eat(TokenKind::Minus) {
        let expr = p.nested(parse_unary)?;
        Ok(Expr::UnaryOp { op: UnaryOp::Negate, expr: Box::new(expr) })
    } else if p.eat(TokenKind::Plus) {
        p.nested(parse_unary)
    } else {
        parse_primary(p)
    }
}

fn parse_primary(p: &mut Parser) -> Result<Expr> {
    match p.peek_kind() {
        TokenKind::Number => {
            let tok = p.advance();
            let val = tok.text.parse::<f64>().map_err(|_| {
                Error::SyntaxError { position: tok.span.start, message: "Invalid number".into() }
            })?;
            Ok(Expr::Literal(Literal::Number(val)))
        }
        TokenKind::StringLiteral => {
            let tok = p.advance();
            Ok(Expr::Literal(Literal::String(tok.text.clone())))
        }
        TokenKind::True => {
            p.advance();
            Ok(Expr::Literal(Literal::Bool(true)))
        }
        TokenKind::False => {
            p.advance();
            Ok(Expr::Literal(Literal::Bool(false)))
        }
        TokenKind::Identifier => {
            let tok = p.advance();
            Ok(Expr::Variable(tok.text.clone()))
        }
        TokenKind::LParen => {
            p.advance();
            let expr = p.nested(parse_expr)?;
            p.expect(TokenKind::RParen)?;
            Ok(expr)
        }
        _ => Err(p.error(format!("Unexpected token in condition: {:?} '{}'", p.peek_kind(), p.peek().text))),
    }
}
