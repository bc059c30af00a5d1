//! Parser front end for the Structurizr architecture-description DSL.
//!
//! This crate provides the compilation pipeline described by the language
//! reference, minus the parts that belong to a downstream workspace
//! builder:
//! - `lexer` - byte stream to token stream
//! - `token` - the closed token-kind set and literal values
//! - `ast` - the typed AST produced by a successful (or partial) parse
//! - `context` - the parser-owned Context Stack
//! - `parser` - the top-level `Parser` facade and its sub-parsers
//!   (element, relationship, model, views, include)
//!
//! The `Parser` never panics and never returns a `Result` from `parse()`:
//! syntax and semantic problems are collected as `Diagnostic`s and the
//! call always returns the best partial `WorkspaceNode` it could build.

pub mod ast;
pub mod context;
pub mod lexer;
pub mod parser;
pub mod token;

pub use parser::{FileLoader, Parser};

/// Errors that can abort an entire parse outright, as opposed to the
/// recoverable syntax/semantic problems that accumulate in `Diagnostics`.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Nested blocks (groups, deployment nodes, includes) exceeded the
    /// configured recursion limit.
    #[error("recursion limit exceeded")]
    RecursionLimitExceeded,

    /// An `!include` directive named a file the configured `FileLoader`
    /// could not read.
    #[error("failed to load included file: {0}")]
    Io(String),
}

/// Result type for operations that can fail outright rather than degrade
/// to a diagnostic.
pub type Result<T> = std::result::Result<T, Error>;
