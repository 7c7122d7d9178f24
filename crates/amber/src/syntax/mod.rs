//! Syntax service: lexing and parsing of callable source text.
//!
//! The serializer core only ever consumes this module through
//! [`parse_expression`] and [`parse_program`] plus the AST types, so a host
//! embedding a different parser can substitute its own front end by mapping
//! into the same AST. The bundled implementation is a hand-written lexer
//! and recursive-descent parser for the ECMAScript subset captured
//! callables use in practice.

pub mod ast;
pub mod lexer;
pub mod parser;

pub use ast::{Expr, ExprKind, Span, Stmt, StmtKind};
pub use parser::{parse_expression, parse_program};

/// First diagnostic from a failed lex or parse.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message} (at offset {offset})")]
pub struct SyntaxError {
    pub message: String,
    /// Byte offset into the parsed text.
    pub offset: u32,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, offset: u32) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}
