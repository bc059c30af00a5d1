//! Core data structures shared by the Structurizr DSL front end.
//!
//! This crate carries no parsing logic. It is the vocabulary the lexer,
//! parser, and (eventually) a host's workspace builder share: source
//! positions, diagnostics, and severities.

mod diagnostics;
mod position;

pub use diagnostics::{Diagnostic, DiagnosticBuilder, Diagnostics, DiagnosticsPrinter, Severity};
pub use position::{LineIndex, SourcePosition};
