//! Expression parser for statement tags.
//!
//! Precedence, lowest first: `??`, `||`, `&&`, `== !=`, `< <= > >=`, `+ -`,
//! `* / %`, unary `! -`, postfix `.name` / `[index]`.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::error::{EvalError, EvalResult};
use crate::lexer::{tokenize, Spanned, Token};
use serde_json::Value;

/// Header of a `foreach` tag: `iterable as item` or `iterable as key => item`
#[derive(Debug, Clone, PartialEq)]
pub struct ForeachHeader {
    pub iterable: Expr,
    pub key: Option<String>,
    pub item: String,
}

/// Header of a `for` tag: `i in start..end` or `i in start..=end`
#[derive(Debug, Clone, PartialEq)]
pub struct RangeHeader {
    pub variable: String,
    pub start: Expr,
    pub end: Expr,
    pub inclusive: bool,
}

/// Parse a standalone expression. `base` is added to reported offsets.
pub fn parse_expression(source: &str, base: usize) -> EvalResult<Expr> {
    let mut parser = ExprParser::new(source, base)?;
    let expr = parser.parse_expression()?;
    parser.expect_end()?;
    Ok(expr)
}

pub fn parse_foreach_header(source: &str, base: usize) -> EvalResult<ForeachHeader> {
    let mut parser = ExprParser::new(source, base)?;
    let iterable = parser.parse_expression()?;
    parser.expect(Token::As)?;
    let first = parser.expect_ident()?;
    let (key, item) = if parser.match_token(Token::FatArrow) {
        (Some(first), parser.expect_ident()?)
    } else {
        (None, first)
    };
    parser.expect_end()?;
    Ok(ForeachHeader {
        iterable,
        key,
        item,
    })
}

pub fn parse_range_header(source: &str, base: usize) -> EvalResult<RangeHeader> {
    let mut parser = ExprParser::new(source, base)?;
    let variable = parser.expect_ident()?;
    parser.expect(Token::In)?;
    let start = parser.parse_additive()?;
    let inclusive = if parser.match_token(Token::DotDotEq) {
        true
    } else {
        parser.expect(Token::DotDot)?;
        false
    };
    let end = parser.parse_additive()?;
    parser.expect_end()?;
    Ok(RangeHeader {
        variable,
        start,
        end,
        inclusive,
    })
}

/// `name = expr`
pub fn parse_assignment(source: &str, base: usize) -> EvalResult<(String, Expr)> {
    let mut parser = ExprParser::new(source, base)?;
    let name = parser.expect_ident()?;
    parser.expect(Token::Assign)?;
    let value = parser.parse_expression()?;
    parser.expect_end()?;
    Ok((name, value))
}

struct ExprParser<'src> {
    tokens: Vec<Spanned<'src>>,
    pos: usize,
    base: usize,
    len: usize,
}

impl<'src> ExprParser<'src> {
    fn new(source: &'src str, base: usize) -> EvalResult<Self> {
        let tokens = tokenize(source)
            .map_err(|offset| EvalError::syntax(base + offset, "Unexpected character"))?;
        Ok(Self {
            tokens,
            pos: 0,
            base,
            len: source.len(),
        })
    }

    fn parse_expression(&mut self) -> EvalResult<Expr> {
        self.parse_coalesce()
    }

    fn parse_coalesce(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_or()?;
        while self.match_token(Token::Coalesce) {
            let right = self.parse_or()?;
            left = binary(left, BinaryOp::Coalesce, right);
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_and()?;
        while self.match_token(Token::OrOr) {
            let right = self.parse_and()?;
            left = binary(left, BinaryOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.match_token(Token::AndAnd) {
            let right = self.parse_equality()?;
            left = binary(left, BinaryOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_comparison()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Eq) => BinaryOp::Equals,
                Some(Token::NotEq) => BinaryOp::NotEquals,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_additive()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Lt) => BinaryOp::LessThan,
                Some(Token::LtEq) => BinaryOp::LessThanOrEqual,
                Some(Token::Gt) => BinaryOp::GreaterThan,
                Some(Token::GtEq) => BinaryOp::GreaterThanOrEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let operator = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                Some(Token::Percent) => BinaryOp::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = binary(left, operator, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let operator = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        Ok(Expr::Unary {
            operator,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> EvalResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.match_token(Token::Dot) {
                expr = match self.advance_token() {
                    Some(Token::Ident(name)) => Expr::Member {
                        object: Box::new(expr),
                        property: name.to_string(),
                    },
                    // `items.0`
                    Some(Token::Number(n)) => Expr::Member {
                        object: Box::new(expr),
                        property: n.to_string(),
                    },
                    Some(token) => return Err(self.unexpected_previous("property name", &token)),
                    None => return Err(self.unexpected_end("property name")),
                };
            } else if self.match_token(Token::LBracket) {
                let index = self.parse_expression()?;
                self.expect(Token::RBracket)?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        match self.advance_token() {
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::Number(n)) => {
                let value = parse_number(n)
                    .ok_or_else(|| EvalError::syntax(self.previous_pos(), "Invalid number"))?;
                Ok(Expr::Literal(value))
            }
            Some(Token::String(s)) => Ok(Expr::Literal(Value::String(unquote(s)))),
            Some(Token::Ident(name)) => {
                if self.match_token(Token::LParen) {
                    let arguments = self.parse_arguments()?;
                    return Ok(Expr::Call {
                        name: name.to_string(),
                        arguments,
                    });
                }
                Ok(Expr::Variable(name.to_string()))
            }
            Some(Token::LParen) => {
                let expr = self.parse_expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(token) => Err(self.unexpected_previous("expression", &token)),
            None => Err(self.unexpected_end("expression")),
        }
    }

    fn parse_arguments(&mut self) -> EvalResult<Vec<Expr>> {
        let mut arguments = Vec::new();
        if self.match_token(Token::RParen) {
            return Ok(arguments);
        }
        loop {
            arguments.push(self.parse_expression()?);
            if self.match_token(Token::RParen) {
                return Ok(arguments);
            }
            self.expect(Token::Comma)?;
        }
    }

    // Helper methods

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn advance_token(&mut self) -> Option<Token<'src>> {
        let token = self.peek().cloned();
        self.pos += 1;
        token
    }

    fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    fn match_token(&mut self, token: Token) -> bool {
        if self.check(&token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> EvalResult<()> {
        if self.match_token(token.clone()) {
            return Ok(());
        }
        match self.peek().cloned() {
            Some(found) => Err(EvalError::syntax(
                self.current_pos(),
                format!("Expected {}, found {}", token, found),
            )),
            None => Err(self.unexpected_end(&token.to_string())),
        }
    }

    fn expect_ident(&mut self) -> EvalResult<String> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(name.to_string())
            }
            Some(found) => Err(EvalError::syntax(
                self.current_pos(),
                format!("Expected identifier, found {}", found),
            )),
            None => Err(self.unexpected_end("identifier")),
        }
    }

    fn expect_end(&self) -> EvalResult<()> {
        match self.peek() {
            None => Ok(()),
            Some(found) => Err(EvalError::syntax(
                self.current_pos(),
                format!("Unexpected {} after expression", found),
            )),
        }
    }

    fn current_pos(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, span)| self.base + span.start)
            .unwrap_or(self.base + self.len)
    }

    fn previous_pos(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|index| self.tokens.get(index))
            .map(|(_, span)| self.base + span.start)
            .unwrap_or(self.base)
    }

    fn unexpected_previous(&self, expected: &str, found: &Token) -> EvalError {
        EvalError::syntax(
            self.previous_pos(),
            format!("Expected {}, found {}", expected, found),
        )
    }

    fn unexpected_end(&self, expected: &str) -> EvalError {
        EvalError::syntax(
            self.base + self.len,
            format!("Expected {}, found end of expression", expected),
        )
    }
}

fn binary(left: Expr, operator: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        operator,
        right: Box::new(right),
    }
}

fn parse_number(text: &str) -> Option<Value> {
    if let Ok(int) = text.parse::<i64>() {
        return Some(Value::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn unquote(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
