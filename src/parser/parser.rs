//! Reader turning tokens into expression trees.
//!
//! The grammar is the usual one for s-expressions: an atom, or `(` followed
//! by expressions and a closing `)`. `true` and `false` read as booleans.

use crate::{
    ast::ast::Expr,
    errors::errors::{Error, ErrorImpl},
    lexer::{
        lexer::tokenize,
        tokens::{Token, TokenKind},
    },
};

pub struct Parser {
    /// The list of tokens to parse
    tokens: Vec<Token>,
    /// Current position in the token stream
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn at_eof(&self) -> bool {
        self.current()
            .map_or(true, |token| token.kind == TokenKind::EOF)
    }

    fn advance(&mut self) -> Result<Token, Error> {
        let token = self.current().cloned().ok_or_else(|| self.unexpected_end())?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(token: &Token) -> Error {
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: token.value.clone(),
            },
            token.span.start.clone(),
        )
    }

    fn unexpected_end(&self) -> Error {
        let position = self
            .tokens
            .last()
            .map(|token| token.span.end.clone())
            .unwrap_or_else(crate::Position::null);
        Error::new(
            ErrorImpl::UnexpectedToken {
                token: String::from("EOF"),
            },
            position,
        )
    }

    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        let token = self.advance()?;

        match token.kind {
            TokenKind::Number => token
                .value
                .parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| Self::unexpected(&token)),
            TokenKind::String => Ok(Expr::String(token.value)),
            TokenKind::Boolean => Ok(Expr::Boolean(token.value == "true")),
            TokenKind::Symbol => Ok(Expr::Symbol(token.value)),
            TokenKind::OpenParen => {
                let mut items = vec![];
                loop {
                    match self.current().map(|next| next.kind) {
                        Some(TokenKind::CloseParen) => {
                            self.pos += 1;
                            return Ok(Expr::List(items));
                        }
                        Some(TokenKind::EOF) | None => return Err(self.unexpected_end()),
                        Some(_) => items.push(self.parse_expr()?),
                    }
                }
            }
            TokenKind::CloseParen => Err(Self::unexpected(&token)),
            TokenKind::EOF => Err(self.unexpected_end()),
        }
    }
}

/// Reads every top-level expression from the token stream.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Expr>, Error> {
    let mut parser = Parser::new(tokens);
    let mut expressions = vec![];

    while !parser.at_eof() {
        expressions.push(parser.parse_expr()?);
    }

    Ok(expressions)
}

/// Reads a source file as a program: all top-level forms wrapped in `(begin ...)`.
pub fn parse_program(source: &str, file: Option<String>) -> Result<Expr, Error> {
    let tokens = tokenize(source.to_string(), file)?;
    let mut program = vec![Expr::symbol("begin")];
    program.extend(parse(tokens)?);
    Ok(Expr::List(program))
}
