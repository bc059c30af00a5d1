//! Include Resolver (§4.8): expands `!include` file directives
//! transitively, detects cycles, and merges a nested parse's AST into the
//! including `WorkspaceNode`.
//!
//! View-level `include <pattern>` / `exclude <pattern>` statements are a
//! different thing entirely — kept as [`crate::ast::IncludeNode`]/
//! [`crate::ast::ExcludeNode`] AST nodes by the views parser, never
//! expanded here.

use std::path::{Path, PathBuf};

use structurizr_dsl_core::{Diagnostics, SourcePosition};

use crate::ast::{ModelNode, StylesNode, ViewsNode, WorkspaceNode};

use super::Parser;

/// Abstracts the file I/O the include resolver needs. Implementations are
/// free to enforce sandboxing, caching, or mock behaviour; the resolver
/// assumes only that `canonicalize` is idempotent and that `load` has no
/// side effects on parser state.
///
/// `is_directory`/`list_dir` support the directory-include extension: an
/// `!include` naming a directory expands every file the loader reports
/// back, in the order given. Implementations that only ever load single
/// files can ignore these and keep the default `false`/`None`.
pub trait FileLoader {
    fn load(&self, path: &str) -> Option<String>;
    fn canonicalize(&self, path: &str) -> String;

    fn is_directory(&self, _path: &str) -> bool {
        false
    }

    fn list_dir(&self, _path: &str) -> Option<Vec<String>> {
        None
    }
}

/// A [`FileLoader`] backed by the real filesystem, rooted at a base
/// directory. Paths in `!include` directives are resolved relative to
/// that root. Directory includes expand every `.dsl` file found, in
/// filename order.
pub struct FsFileLoader {
    root: PathBuf,
}

impl FsFileLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl FileLoader for FsFileLoader {
    fn load(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(self.root.join(path)).ok()
    }

    fn canonicalize(&self, path: &str) -> String {
        let joined = self.root.join(path);
        std::fs::canonicalize(&joined)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| normalize_lexically(&joined))
    }

    fn is_directory(&self, path: &str) -> bool {
        self.root.join(path).is_dir()
    }

    fn list_dir(&self, path: &str) -> Option<Vec<String>> {
        let abs = self.root.join(path);
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&abs).ok()? {
            let entry = entry.ok()?;
            if entry.file_type().ok()?.is_file() {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".dsl") {
                    files.push(format!("{}/{}", path.trim_end_matches('/'), name));
                }
            }
        }
        files.sort();
        Some(files)
    }
}

/// Collapses `.`/`..` components without touching the filesystem, used
/// when a path doesn't exist yet (so `std::fs::canonicalize` would fail)
/// but still needs a stable, idempotent identity for cycle detection.
fn normalize_lexically(path: &Path) -> String {
    use std::path::Component;
    let mut out = Vec::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    out.join(std::path::MAIN_SEPARATOR_STR)
}

/// Expands a single `!include <raw_path>` directive, recursing through
/// directory includes and transitively through the included file's own
/// `!include`s. Returns the nested parse's `WorkspaceNode`, or `None` when
/// there is no `FileLoader` configured (the host explicitly opted out, no
/// diagnostic), the path is circular, or the load failed (diagnostic
/// emitted in the latter two cases).
pub(super) fn expand_file_include(
    parser: &mut Parser,
    raw_path: &str,
    position: SourcePosition,
) -> Option<WorkspaceNode> {
    let loader = parser.file_loader.clone()?;
    let canonical = loader.canonicalize(raw_path);

    if parser.include_stack.contains(&canonical) {
        parser
            .error("Circular include detected")
            .at(position)
            .found(canonical)
            .emit();
        return None;
    }

    if loader.is_directory(raw_path) {
        let files = loader.list_dir(raw_path).unwrap_or_default();
        parser.visited_includes.insert(canonical);
        let mut merged: Option<WorkspaceNode> = None;
        for file in &files {
            if let Some(child) = expand_file_include(parser, file, position) {
                match merged.as_mut() {
                    Some(target) => merge_workspace_into(target, &mut parser.diagnostics, child),
                    None => merged = Some(child),
                }
            }
        }
        return merged;
    }

    if parser.visited_includes.contains(&canonical) {
        // Idempotent re-run: the same file was already fully expanded
        // somewhere else in the tree. Contributes nothing further.
        return None;
    }

    let Some(content) = loader.load(raw_path) else {
        parser
            .error(format!("Failed to load included file: {raw_path}"))
            .at(position)
            .emit();
        parser.visited_includes.insert(canonical);
        return None;
    };

    parser.visited_includes.insert(canonical.clone());
    parser.include_stack.push(canonical);

    let mut nested = Parser::new();
    nested.file_loader = parser.file_loader.clone();
    nested.identifier_scheme = parser.identifier_scheme;
    nested.recursion_limit = parser.recursion_limit;
    nested.diagnostics = Diagnostics::new(parser.diagnostics.max_error_count());
    nested.visited_includes = parser.visited_includes.clone();
    nested.include_stack = parser.include_stack.clone();

    let child = nested.parse_fragment(&content);

    parser.diagnostics.extend(nested.diagnostics);
    parser.visited_includes.extend(nested.visited_includes);
    parser.include_stack.pop();

    Some(child)
}

/// Merges `child` (the result of expanding one `!include`) into `target`:
/// people, software systems, relationships, views, styles, and
/// documentation sections are appended in encounter order; duplicate
/// element ids are resolved first-definition-wins with a diagnostic.
pub(super) fn merge_workspace_into(
    target: &mut WorkspaceNode,
    diagnostics: &mut Diagnostics,
    mut child: WorkspaceNode,
) {
    if let Some(child_model) = child.model.take() {
        let target_model = target.model.get_or_insert_with(ModelNode::default);
        merge_model_into(target_model, diagnostics, child_model);
    }

    if let Some(child_views) = child.views.take() {
        let target_views = target.views.get_or_insert_with(ViewsNode::default);
        merge_views_into(target_views, child_views);
    }

    if let Some(child_styles) = child.styles.take() {
        let target_styles = target.styles.get_or_insert_with(StylesNode::default);
        target_styles.elements.extend(child_styles.elements);
        target_styles.relationships.extend(child_styles.relationships);
    }

    target.themes.extend(child.themes);
    if target.branding.is_none() {
        target.branding = child.branding;
    }
    if target.terminology.is_none() {
        target.terminology = child.terminology;
    }
    match (&mut target.documentation, child.documentation) {
        (Some(base), Some(extra)) => {
            base.push_str("\n\n");
            base.push_str(&extra);
        }
        (target_doc @ None, Some(extra)) => *target_doc = Some(extra),
        _ => {}
    }
    target.decisions.extend(child.decisions);
    for (key, value) in child.configuration {
        target.configuration.entry(key).or_insert(value);
    }
    target.directives.extend(child.directives);
    target.includes.extend(child.includes);
}

pub(super) fn merge_model_into(target: &mut ModelNode, diagnostics: &mut Diagnostics, child: ModelNode) {
    merge_by_id(&mut target.people, child.people, diagnostics, |p| &p.id);
    merge_by_id(
        &mut target.software_systems,
        child.software_systems,
        diagnostics,
        |s| &s.id,
    );
    merge_by_id(
        &mut target.deployment_environments,
        child.deployment_environments,
        diagnostics,
        |d| &d.id,
    );
    target.groups.extend(child.groups);
    target.relationships.extend(child.relationships);
    if let Some(enterprise) = child.enterprise {
        if target.enterprise.is_none() {
            target.enterprise = Some(enterprise);
        }
    }
}

fn merge_views_into(target: &mut ViewsNode, child: ViewsNode) {
    target.system_landscape_views.extend(child.system_landscape_views);
    target.system_context_views.extend(child.system_context_views);
    target.container_views.extend(child.container_views);
    target.component_views.extend(child.component_views);
    target.dynamic_views.extend(child.dynamic_views);
    target.deployment_views.extend(child.deployment_views);
    target.filtered_views.extend(child.filtered_views);
    target.custom_views.extend(child.custom_views);
    target.image_views.extend(child.image_views);
    for (key, value) in child.configuration {
        target.configuration.entry(key).or_insert(value);
    }
}

fn merge_by_id<T>(
    target: &mut Vec<T>,
    child: Vec<T>,
    diagnostics: &mut Diagnostics,
    id_of: impl Fn(&T) -> &String,
) {
    for item in child {
        if target.iter().any(|existing| id_of(existing) == id_of(&item)) {
            diagnostics
                .warning(format!(
                    "Duplicate element id '{}' from include ignored (first definition wins)",
                    id_of(&item)
                ))
                .emit();
        } else {
            target.push(item);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::IdentifierScheme;
    use std::collections::HashMap;

    struct MapFileLoader {
        files: HashMap<String, String>,
        dirs: HashMap<String, Vec<String>>,
    }

    impl MapFileLoader {
        fn new(files: &[(&str, &str)]) -> Self {
            Self {
                files: files.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
                dirs: HashMap::new(),
            }
        }

        fn with_dir(mut self, dir: &str, entries: &[&str]) -> Self {
            self.dirs
                .insert(dir.to_string(), entries.iter().map(|s| s.to_string()).collect());
            self
        }
    }

    impl FileLoader for MapFileLoader {
        fn load(&self, path: &str) -> Option<String> {
            self.files.get(path).cloned()
        }

        fn canonicalize(&self, path: &str) -> String {
            path.to_string()
        }

        fn is_directory(&self, path: &str) -> bool {
            self.dirs.contains_key(path)
        }

        fn list_dir(&self, path: &str) -> Option<Vec<String>> {
            self.dirs.get(path).cloned()
        }
    }

    #[test]
    fn simple_include_merges_people_into_model() {
        let loader = MapFileLoader::new(&[("people.dsl", "person \"User\"\n")]);
        let mut parser = Parser::new().with_file_loader(Box::new(loader));
        let workspace = parser.parse(r#"workspace "W" { model { !include "people.dsl" } }"#);
        assert!(!parser.diagnostics().has_errors(), "{:?}", parser.errors());
        let model = workspace.model.expect("model present");
        assert_eq!(model.people.len(), 1);
        assert_eq!(model.people[0].id, "User");
    }

    #[test]
    fn circular_include_is_detected_and_terminates() {
        let loader = MapFileLoader::new(&[
            ("a.dsl", "!include \"b.dsl\"\n"),
            ("b.dsl", "!include \"a.dsl\"\n"),
        ]);
        let mut parser = Parser::new().with_file_loader(Box::new(loader));
        let _workspace = parser.parse(r#"workspace "X" { model { !include "a.dsl" } }"#);
        let circular_count = parser
            .errors()
            .iter()
            .filter(|d| d.message == "Circular include detected")
            .count();
        assert_eq!(circular_count, 1);
    }

    #[test]
    fn duplicate_element_id_from_include_is_first_definition_wins() {
        let loader = MapFileLoader::new(&[("dup.dsl", "person \"User\"\n")]);
        let mut parser = Parser::new().with_file_loader(Box::new(loader));
        let workspace = parser.parse(
            r#"workspace "W" { model { user = person "User" "original" !include "dup.dsl" } }"#,
        );
        let model = workspace.model.unwrap();
        assert_eq!(model.people.len(), 1);
        assert_eq!(model.people[0].description.as_deref(), Some("original"));
        assert!(parser.diagnostics().warnings().any(|w| w.message.contains("Duplicate element id")));
    }

    #[test]
    fn directory_include_expands_every_dsl_file_in_order() {
        let loader = MapFileLoader::new(&[
            ("people/a.dsl", "person \"Alice\"\n"),
            ("people/b.dsl", "person \"Bob\"\n"),
        ])
        .with_dir("people", &["people/a.dsl", "people/b.dsl"]);
        let mut parser = Parser::new().with_file_loader(Box::new(loader));
        let workspace = parser.parse(r#"workspace "W" { model { !include "people" } }"#);
        let model = workspace.model.unwrap();
        assert_eq!(model.people.len(), 2);
        assert_eq!(model.people[0].id, "Alice");
        assert_eq!(model.people[1].id, "Bob");
    }

    #[test]
    fn missing_file_loader_leaves_include_unexpanded_without_diagnostic() {
        let mut parser = Parser::new();
        let workspace = parser.parse(r#"workspace "W" { model { !include "missing.dsl" } }"#);
        assert!(!parser.diagnostics().has_errors());
        assert_eq!(workspace.model.unwrap().people.len(), 0);
    }

    #[test]
    fn missing_included_file_reports_an_error() {
        let loader = MapFileLoader::new(&[]);
        let mut parser = Parser::new().with_file_loader(Box::new(loader));
        parser.parse(r#"workspace "W" { model { !include "nope.dsl" } }"#);
        assert!(parser.diagnostics().has_errors());
    }

    #[test]
    fn fs_file_loader_round_trips_a_real_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("people.dsl"), "person \"User\"\n").unwrap();
        let loader = FsFileLoader::new(dir.path());
        let mut parser = Parser::new().with_file_loader(Box::new(loader));
        let workspace = parser.parse(r#"workspace "W" { model { !include "people.dsl" } }"#);
        assert_eq!(workspace.model.unwrap().people.len(), 1);
    }

    #[test]
    fn reparsing_same_root_is_idempotent() {
        let loader = MapFileLoader::new(&[("people.dsl", "person \"User\"\n")]);
        let mut parser = Parser::new().with_file_loader(Box::new(loader));
        let source = r#"workspace "W" { model { !include "people.dsl" } }"#;
        let first = parser.parse(source);
        let first_errors = parser.errors().len();
        let second = parser.parse(source);
        assert_eq!(first.model.unwrap().people.len(), second.model.unwrap().people.len());
        assert_eq!(first_errors, parser.errors().len());
    }

    #[test]
    fn identifier_scheme_propagates_into_nested_includes() {
        let loader = MapFileLoader::new(&[("x.dsl", "person \"User\"\n")]);
        let mut parser = Parser::new()
            .with_file_loader(Box::new(loader))
            .with_identifier_scheme(IdentifierScheme::Hierarchical);
        let workspace = parser.parse(r#"workspace "W" { model { !include "x.dsl" } }"#);
        assert_eq!(workspace.model.unwrap().identifier_scheme, IdentifierScheme::Flat);
    }
}
