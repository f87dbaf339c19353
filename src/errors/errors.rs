use std::fmt::Display;

use thiserror::Error;

use crate::{ast::ast::Expr, Position};

/// A checking or reading failure together with the context it was raised in.
///
/// Reader errors point at a byte offset in the source, checker errors carry the
/// rendered expression that could not be typed.
#[derive(Error, Debug, Clone)]
#[error("{internal_error}")]
pub struct Error {
    internal_error: ErrorImpl,
    context: ErrorContext,
}

#[derive(Debug, Clone)]
pub enum ErrorContext {
    Position(Position),
    Expression(String),
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            context: ErrorContext::Position(position),
        }
    }

    pub fn in_expr(error_impl: ErrorImpl, expr: &Expr) -> Self {
        Error {
            internal_error: error_impl,
            context: ErrorContext::Expression(expr.to_string()),
        }
    }

    pub fn get_impl(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_context(&self) -> &ErrorContext {
        &self.context
    }

    pub fn get_position(&self) -> Option<&Position> {
        match &self.context {
            ErrorContext::Position(position) => Some(position),
            ErrorContext::Expression(_) => None,
        }
    }

    pub fn get_expression(&self) -> Option<&str> {
        match &self.context {
            ErrorContext::Expression(expression) => Some(expression),
            ErrorContext::Position(_) => None,
        }
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => "UnrecognisedToken",
            ErrorImpl::UnexpectedToken { .. } => "UnexpectedToken",
            ErrorImpl::UnknownExpression => "UnknownExpression",
            ErrorImpl::TypeMismatch { .. } => "TypeMismatch",
            ErrorImpl::ArityMismatch { .. } => "ArityMismatch",
            ErrorImpl::UnresolvedReference { .. } => "UnresolvedReference",
            ErrorImpl::Redeclaration { .. } => "RedeclarationError",
            ErrorImpl::UnknownOperator { .. } => "UnknownOperator",
            ErrorImpl::UnknownType { .. } => "UnknownType",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnrecognisedToken { .. } => ErrorTip::None,
            ErrorImpl::UnexpectedToken { token } => ErrorTip::Suggestion(format!(
                "Unexpected token: `{}`, are the parentheses balanced?",
                token
            )),
            ErrorImpl::UnknownExpression => ErrorTip::Suggestion(String::from(
                "This expression does not match any known form",
            )),
            ErrorImpl::TypeMismatch { expected, received } => ErrorTip::Suggestion(format!(
                "Expected type `{}`, received `{}`",
                expected, received
            )),
            ErrorImpl::ArityMismatch {
                construct,
                expected,
                received,
            } => ErrorTip::Suggestion(format!(
                "`{}` expects {} operands, received {}",
                construct, expected, received
            )),
            ErrorImpl::UnresolvedReference { name } => {
                ErrorTip::Suggestion(format!("`{}` is not defined", name))
            }
            ErrorImpl::Redeclaration { name } => {
                ErrorTip::Suggestion(format!("Type `{}` is already declared", name))
            }
            ErrorImpl::UnknownOperator { operator } => {
                ErrorTip::Suggestion(format!("Operator `{}` is not supported", operator))
            }
            ErrorImpl::UnknownType { type_ } => {
                ErrorTip::Suggestion(format!("Unknown type `{}` found", type_))
            }
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("unrecognised token: {token:?}")]
    UnrecognisedToken { token: String },
    #[error("unexpected token: {token:?}")]
    UnexpectedToken { token: String },
    #[error("unknown expression")]
    UnknownExpression,
    #[error("types do not match: expected {expected:?}, received {received:?}")]
    TypeMismatch { expected: String, received: String },
    #[error("{construct:?} expects {expected} operands, received {received}")]
    ArityMismatch {
        construct: String,
        expected: usize,
        received: usize,
    },
    #[error("{name:?} is not defined")]
    UnresolvedReference { name: String },
    #[error("type {name:?} already declared")]
    Redeclaration { name: String },
    #[error("unknown operator {operator:?}")]
    UnknownOperator { operator: String },
    #[error("unknown type {type_} found")]
    UnknownType { type_: String },
}
