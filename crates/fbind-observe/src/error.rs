#![forbid(unsafe_code)]

//! Errors raised while compiling expressions and installing bindings.
//!
//! All of these are programmer errors in the syntax handed to the compiler.
//! They surface synchronously from `compile`/`define`; runtime propagation
//! never fails.

use fbind_core::UnobservableTarget;
use thiserror::Error;

use crate::syntax::Syntax;

/// A syntax tree could not be turned into an observer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Neither a known node kind, a collection construct, nor an operator.
    #[error("unknown syntax node type `{}`", .node.kind)]
    UnknownNode { node: Box<Syntax> },

    #[error("`{kind}` expects {expected} argument(s), found {found}")]
    Arity {
        kind: String,
        expected: usize,
        found: usize,
    },

    #[error("`{kind}` node is missing its `{field}`")]
    MissingField { kind: String, field: &'static str },
}

/// A binding could not be installed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Two-way or target position requested through an expression with no inverse.
    #[error("cannot bind through non-invertible `{kind}` expression")]
    NonInvertible { kind: String },

    #[error(transparent)]
    Unobservable(#[from] UnobservableTarget),
}
