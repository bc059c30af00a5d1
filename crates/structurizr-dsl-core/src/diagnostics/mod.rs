//! Diagnostic collection, severities, and rendering.

mod message;
mod printer;

#[cfg(test)]
mod tests;

pub use message::{Diagnostic, Severity};
pub use printer::DiagnosticsPrinter;

use crate::SourcePosition;

/// Accumulates [`Diagnostic`]s from lexing and parsing, capped at a
/// configurable maximum so a badly malformed input cannot grow the report
/// without bound.
#[derive(Debug, Clone)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
    max_error_count: usize,
}

/// Builder for constructing a diagnostic before it is recorded.
#[must_use = "diagnostic not recorded, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: Diagnostic,
    accepted: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Diagnostics {
    pub fn new(max_error_count: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_error_count,
        }
    }

    fn report_builder(&mut self, message: Diagnostic) -> DiagnosticBuilder<'_> {
        let accepted = self.count() < self.max_error_count;
        DiagnosticBuilder {
            diagnostics: self,
            message,
            accepted,
        }
    }

    pub fn info(&mut self, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        self.report_builder(Diagnostic::new(Severity::Info, message))
    }

    pub fn warning(&mut self, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        self.report_builder(Diagnostic::new(Severity::Warning, message))
    }

    pub fn error(&mut self, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        self.report_builder(Diagnostic::new(Severity::Error, message))
    }

    pub fn fatal(&mut self, message: impl Into<String>) -> DiagnosticBuilder<'_> {
        self.report_builder(Diagnostic::new(Severity::Fatal, message))
    }

    /// Records an already-built diagnostic directly. Returns `false` and
    /// discards it once `max_error_count` has been reached.
    pub fn report(&mut self, diagnostic: Diagnostic) -> bool {
        if self.messages.len() >= self.max_error_count {
            return false;
        }
        self.messages.push(diagnostic);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.messages
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages
            .iter()
            .filter(|d| matches!(d.severity, Severity::Error | Severity::Fatal))
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.messages
            .iter()
            .any(|d| matches!(d.severity, Severity::Error | Severity::Fatal))
    }

    pub fn has_fatal_errors(&self) -> bool {
        self.messages.iter().any(|d| d.severity == Severity::Fatal)
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn count(&self) -> usize {
        self.messages.len()
    }

    pub fn max_error_count(&self) -> usize {
        self.max_error_count
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn extend(&mut self, other: Diagnostics) {
        for message in other.messages {
            if self.report(message) {
                continue;
            }
            break;
        }
    }

    pub fn printer<'a>(&'a self, source: &'a str) -> DiagnosticsPrinter<'a> {
        DiagnosticsPrinter::new(&self.messages, source)
    }
}

impl<'a> DiagnosticBuilder<'a> {
    pub fn at(mut self, position: SourcePosition) -> Self {
        self.message.position = Some(position);
        self
    }

    pub fn context_path(mut self, path: impl Into<String>) -> Self {
        self.message.context_path = Some(path.into());
        self
    }

    pub fn file_path(mut self, path: impl Into<String>) -> Self {
        self.message.file_path = Some(path.into());
        self
    }

    pub fn snippet(mut self, snippet: impl Into<String>) -> Self {
        self.message.source_snippet = Some(snippet.into());
        self
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.message.expected = Some(expected.into());
        self
    }

    pub fn found(mut self, found: impl Into<String>) -> Self {
        self.message.found = Some(found.into());
        self
    }

    /// Records the diagnostic. Returns whether it was accepted (`false`
    /// once `max_error_count` was already reached when this builder was
    /// created).
    pub fn emit(self) -> bool {
        if !self.accepted {
            return false;
        }
        self.diagnostics.messages.push(self.message);
        true
    }
}
