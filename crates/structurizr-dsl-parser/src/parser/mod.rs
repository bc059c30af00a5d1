//! The top-level `Parser` facade: owns the token cursor, the Context
//! Stack, and the Error Reporter, and orchestrates the sub-parsers.

mod element;
mod include;
mod model;
mod relationship;
mod views;

pub use include::FileLoader;

use std::collections::HashSet;
use std::rc::Rc;

use structurizr_dsl_core::{Diagnostics, LineIndex, SourcePosition};

use crate::ast::{IdentifierScheme, WorkspaceNode};
use crate::context::{Context, ContextStack};
use crate::lexer::lex;
use crate::token::{Token, TokenKind};
use crate::Error;

/// Keyword tokens that may legally start a new top-level or model-level
/// statement. Panic-mode recovery synchronizes to the first of these, or to
/// a `}` at the depth recovery began, whichever comes first.
const SYNC_KEYWORDS: &[TokenKind] = &[
    TokenKind::KwWorkspace,
    TokenKind::KwModel,
    TokenKind::KwPerson,
    TokenKind::KwSoftwareSystem,
    TokenKind::KwContainer,
    TokenKind::KwComponent,
    TokenKind::KwDeploymentEnvironment,
    TokenKind::KwDeploymentNode,
    TokenKind::KwInfrastructureNode,
    TokenKind::KwContainerInstance,
    TokenKind::KwGroup,
    TokenKind::KwEnterprise,
    TokenKind::KwViews,
    TokenKind::KwStyles,
    TokenKind::KwThemes,
    TokenKind::KwBranding,
    TokenKind::KwTerminology,
    TokenKind::KwConfiguration,
    TokenKind::KwDocumentation,
    TokenKind::KwDecisions,
    TokenKind::KwRelationship,
];

/// Default cap on nested block depth (groups, deployment nodes, and the
/// like may nest arbitrarily per the grammar; this guards against a
/// pathological or adversarial input exhausting the call stack).
const DEFAULT_RECURSION_LIMIT: u32 = 512;

pub struct Parser {
    source: String,
    line_index: LineIndex,
    tokens: Vec<Token>,
    pos: usize,
    context: ContextStack,
    diagnostics: Diagnostics,
    depth: u32,
    recursion_limit: u32,
    identifier_scheme: IdentifierScheme,
    file_loader: Option<Rc<dyn FileLoader>>,
    visited_includes: HashSet<String>,
    include_stack: Vec<String>,
    fatal: Option<Error>,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self {
            source: String::new(),
            line_index: LineIndex::new(""),
            tokens: Vec::new(),
            pos: 0,
            context: ContextStack::new(),
            diagnostics: Diagnostics::default(),
            depth: 0,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            identifier_scheme: IdentifierScheme::Flat,
            file_loader: None,
            visited_includes: HashSet::new(),
            include_stack: Vec::new(),
            fatal: None,
        }
    }

    pub fn with_max_error_count(mut self, max_error_count: usize) -> Self {
        self.diagnostics = Diagnostics::new(max_error_count);
        self
    }

    pub fn with_file_loader(mut self, loader: Box<dyn FileLoader>) -> Self {
        self.file_loader = Some(Rc::from(loader));
        self
    }

    pub fn with_identifier_scheme(mut self, scheme: IdentifierScheme) -> Self {
        self.identifier_scheme = scheme;
        self
    }

    pub fn with_recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Drops all per-parse state, restoring the instance to its
    /// just-constructed condition (minus configuration knobs). Required
    /// before reusing a `Parser` for a second `parse()` call.
    pub fn reset(&mut self) {
        self.source.clear();
        self.line_index = LineIndex::new("");
        self.tokens.clear();
        self.pos = 0;
        self.context.clear();
        self.diagnostics.reset();
        self.depth = 0;
        self.visited_includes.clear();
        self.include_stack.clear();
        self.fatal = None;
    }

    pub fn errors(&self) -> &[structurizr_dsl_core::Diagnostic] {
        self.diagnostics.all()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub(super) fn diagnostics_mut(&mut self) -> &mut Diagnostics {
        &mut self.diagnostics
    }

    fn prepare(&mut self, source: &str) {
        if !self.tokens.is_empty() || !self.diagnostics.is_empty() || !self.context.is_empty() {
            self.reset();
        }
        self.source = source.to_string();
        self.line_index = LineIndex::new(&self.source);
        self.tokens = lex(&self.source, &mut self.diagnostics);
        self.pos = 0;
    }

    /// Parses `source` into a `WorkspaceNode`. Always terminates and always
    /// returns a tree, even one built entirely from recovery, leaving the
    /// Context Stack empty.
    pub fn parse(&mut self, source: &str) -> WorkspaceNode {
        self.prepare(source);
        let workspace = model::parse_workspace(self);
        debug_assert!(
            self.context.is_empty(),
            "context stack leaked frames: {}",
            self.context.path()
        );
        self.context.clear();
        workspace
    }

    /// Parses `source` as a bare fragment rather than a full `workspace {
    /// ... }` document: used internally to expand `!include`d files, which
    /// conventionally hold a handful of statements (a few `person`/
    /// `softwareSystem` declarations, another `!include`) rather than a
    /// complete workspace wrapper. A fragment that *does* start with
    /// `workspace` is parsed exactly like [`Parser::parse`]; otherwise no
    /// diagnostic is raised for the missing envelope, unlike a top-level
    /// `parse()` call on the same bare input.
    pub(crate) fn parse_fragment(&mut self, source: &str) -> WorkspaceNode {
        self.prepare(source);
        let workspace = model::parse_fragment(self);
        debug_assert!(
            self.context.is_empty(),
            "context stack leaked frames: {}",
            self.context.path()
        );
        self.context.clear();
        workspace
    }

    // ---- token cursor primitives ----------------------------------------

    pub(super) fn nth(&self, lookahead: usize) -> TokenKind {
        self.tokens
            .get(self.pos + lookahead)
            .map_or(TokenKind::Eof, |t| t.kind)
    }

    pub(super) fn current(&self) -> TokenKind {
        self.nth(0)
    }

    /// The token at the cursor. `lex` always appends a trailing `Eof`
    /// token, so this is defined for every position the cursor can reach.
    pub(super) fn current_token(&self) -> &Token {
        &self.tokens[self.pos]
    }

    pub(super) fn position(&self) -> SourcePosition {
        self.current_token().position
    }

    pub(super) fn eof(&self) -> bool {
        self.pos >= self.tokens.len() || self.current() == TokenKind::Eof
    }

    pub(super) fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    pub(super) fn at_set(&self, set: &[TokenKind]) -> bool {
        set.contains(&self.current())
    }

    pub(super) fn bump(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    pub(super) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(super) fn text(&self, token: &Token) -> &str {
        token.text(&self.source)
    }

    /// Emits an "expected X, found Y" error at the current position without
    /// consuming the offending token, so the caller's recovery can inspect
    /// it.
    pub(super) fn expect(&mut self, kind: TokenKind, what: &str) -> Option<Token> {
        if self.at(kind) {
            return Some(self.bump());
        }
        let found = format!("{:?}", self.current());
        self.error(format!("Expected {}", what))
            .expected(format!("{:?}", kind))
            .found(found)
            .emit();
        None
    }

    pub(super) fn error(
        &mut self,
        message: impl Into<String>,
    ) -> structurizr_dsl_core::DiagnosticBuilder<'_> {
        let position = self.position();
        self.error_at(message, position)
    }

    /// Like [`Parser::error`] but anchored at a caller-supplied position
    /// rather than the current cursor, for diagnostics about a token that
    /// was consumed earlier (e.g. an unmatched opening brace).
    pub(super) fn error_at(
        &mut self,
        message: impl Into<String>,
        position: SourcePosition,
    ) -> structurizr_dsl_core::DiagnosticBuilder<'_> {
        let path = self.context.path();
        let snippet = self.line_index.snippet(&self.source, position);
        self.diagnostics
            .error(message)
            .at(position)
            .context_path(path)
            .snippet(snippet)
    }

    /// Expects the `}` closing a block opened at `open_brace_pos`. Unlike
    /// `expect(TokenKind::RBrace, ..)`, a missing brace is reported at the
    /// opening `{` rather than wherever the cursor ends up after recovery.
    pub(super) fn expect_close_brace(&mut self, open_brace_pos: SourcePosition) -> Option<Token> {
        if self.at(TokenKind::RBrace) {
            return Some(self.bump());
        }
        let found = format!("{:?}", self.current());
        self.error_at("Expected '}'", open_brace_pos)
            .expected("RBrace".to_string())
            .found(found)
            .emit();
        None
    }

    pub(super) fn warning(
        &mut self,
        message: impl Into<String>,
    ) -> structurizr_dsl_core::DiagnosticBuilder<'_> {
        let position = self.position();
        let path = self.context.path();
        let snippet = self.line_index.snippet(&self.source, position);
        self.diagnostics
            .warning(message)
            .at(position)
            .context_path(path)
            .snippet(snippet)
    }

    pub(super) fn context(&self) -> &ContextStack {
        &self.context
    }

    pub(super) fn context_mut(&mut self) -> &mut ContextStack {
        &mut self.context
    }

    /// Panic-mode recovery: discards tokens until a `}` at the brace depth
    /// recorded when recovery began, or a top-level/model-level keyword,
    /// or EOF — whichever comes first.
    pub(super) fn synchronize(&mut self) {
        if self.eof() || self.at_set(SYNC_KEYWORDS) || self.at(TokenKind::RBrace) {
            return;
        }
        let mut depth = 0i32;
        while !self.eof() {
            match self.current() {
                TokenKind::LBrace => {
                    depth += 1;
                    self.bump();
                }
                TokenKind::RBrace => {
                    if depth == 0 {
                        return;
                    }
                    depth -= 1;
                    self.bump();
                }
                kind if depth == 0 && SYNC_KEYWORDS.contains(&kind) => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    pub(super) fn enter_recursion(&mut self) -> bool {
        if self.depth >= self.recursion_limit {
            if self.fatal.is_none() {
                self.fatal = Some(Error::RecursionLimitExceeded);
                self.diagnostics.fatal("Recursion limit exceeded").at(self.position()).emit();
            }
            return false;
        }
        self.depth += 1;
        true
    }

    pub(super) fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(super) fn has_fatal(&self) -> bool {
        self.fatal.is_some()
    }

    pub(super) fn identifier_scheme(&self) -> IdentifierScheme {
        self.context.identifier_scheme().unwrap_or(self.identifier_scheme)
    }

    /// Derives an element id from a display name per the "strip all Unicode
    /// whitespace" rule (`"Web Application"` → `"WebApplication"`).
    pub(super) fn derive_id(name: &str) -> String {
        name.chars().filter(|c| !c.is_whitespace()).collect()
    }
}

/// A `Parser` borrowed for the duration of one pushed [`Context`] frame:
/// dereferences to `Parser` so sub-parsers can keep calling ordinary
/// cursor methods, and pops the frame on `Drop` so the push/pop discipline
/// holds even if a future change adds an early return between enter and
/// the matching close brace.
pub(super) struct ScopedContext<'a> {
    parser: &'a mut Parser,
}

impl<'a> ScopedContext<'a> {
    pub(super) fn enter(parser: &'a mut Parser, ctx: Context) -> Self {
        parser.context.push(ctx);
        Self { parser }
    }
}

impl std::ops::Deref for ScopedContext<'_> {
    type Target = Parser;
    fn deref(&self) -> &Parser {
        self.parser
    }
}

impl std::ops::DerefMut for ScopedContext<'_> {
    fn deref_mut(&mut self) -> &mut Parser {
        self.parser
    }
}

impl Drop for ScopedContext<'_> {
    fn drop(&mut self) {
        self.parser.context.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_restores_empty_state() {
        let mut parser = Parser::new();
        parser.parse(r#"workspace "Test" { }"#);
        assert!(!parser.tokens.is_empty());
        parser.reset();
        assert!(parser.tokens.is_empty());
        assert!(parser.diagnostics.is_empty());
        assert!(parser.context.is_empty());
    }

    #[test]
    fn reparsing_without_explicit_reset_still_starts_clean() {
        let mut parser = Parser::new();
        let first = parser.parse(r#"workspace "First" { }"#);
        assert_eq!(first.name, "First");
        let second = parser.parse(r#"workspace "Second" { }"#);
        assert_eq!(second.name, "Second");
        assert!(parser.context.is_empty());
    }

    #[test]
    fn scoped_context_pops_on_drop() {
        let mut parser = Parser::new();
        parser.parse("");
        {
            let _scope = ScopedContext::enter(&mut parser, Context::new("model"));
            assert_eq!(parser_path(&_scope), "model");
        }
        assert!(parser.context.is_empty());
    }

    fn parser_path(scope: &ScopedContext<'_>) -> String {
        scope.context.path()
    }

    #[test]
    fn derive_id_strips_all_whitespace() {
        assert_eq!(Parser::derive_id("Web Application"), "WebApplication");
        assert_eq!(Parser::derive_id("A\tB\nC"), "ABC");
    }

    #[test]
    fn diagnostics_carry_a_source_snippet() {
        let mut parser = Parser::new();
        parser.parse("workspace \"W\" {\n    model {\n        person\n    }\n}");
        let error = parser
            .errors()
            .iter()
            .find(|d| d.message == "Expected person name")
            .expect("expected diagnostic");
        let snippet = error.source_snippet.as_deref().expect("snippet present");
        assert!(snippet.contains("person"));
        assert!(snippet.lines().count() >= 2);
    }
}
