//! Builder-pattern printer for rendering diagnostics.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};

use super::message::{Diagnostic, Severity};

/// Renders a slice of [`Diagnostic`]s against a source string.
pub struct DiagnosticsPrinter<'d> {
    diagnostics: &'d [Diagnostic],
    source: &'d str,
    path: Option<&'d str>,
    colored: bool,
}

impl<'d> DiagnosticsPrinter<'d> {
    pub fn new(diagnostics: &'d [Diagnostic], source: &'d str) -> Self {
        Self {
            diagnostics,
            source,
            path: None,
            colored: false,
        }
    }

    pub fn path(mut self, path: &'d str) -> Self {
        self.path = Some(path);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        if self.diagnostics.is_empty() {
            return Ok(());
        }

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            let range = diag
                .position
                .map(|p| {
                    let start = p.offset as usize;
                    start..(start + 1).min(self.source.len())
                })
                .unwrap_or(0..0.min(self.source.len()));

            let mut snippet = Snippet::source(self.source)
                .line_start(1)
                .annotation(AnnotationKind::Primary.span(range).label(&diag.message));

            if let Some(path) = self.path.or(diag.file_path.as_deref()) {
                snippet = snippet.path(path);
            }

            let level = severity_to_level(diag.severity);
            let title_group = level.primary_title(&diag.message).element(snippet);

            let report: Vec<Group> = vec![title_group];

            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Info => Level::NOTE,
        Severity::Warning => Level::WARNING,
        Severity::Error | Severity::Fatal => Level::ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Diagnostics, SourcePosition};

    #[test]
    fn render_does_not_panic_on_eof_positioned_diagnostic() {
        let source = r#"workspace "W" {"#;
        let mut diagnostics = Diagnostics::default();
        diagnostics
            .error("Expected '}'")
            .at(SourcePosition::new(1, source.len() as u32 + 1, source.len() as u32))
            .emit();

        let rendered = diagnostics.printer(source).render();
        assert!(rendered.contains("Expected '}'"));
    }
}
