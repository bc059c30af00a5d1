//! Workspace envelope and Model Parser: the `workspace "name" { ... }`
//! entry point, its top-level block dispatch (`model`, `views`, `styles`,
//! `themes`, `branding`, `terminology`, `configuration`, `documentation`,
//! `decisions`, `!include`), and the `model { ... }` block itself.

use crate::ast::*;
use crate::context::Context;
use crate::token::{Literal, Token, TokenKind};

use super::element::{parse_deployment_environment, parse_person, parse_software_system};
use super::include;
use super::relationship::{self, parse_group, parse_relationship};
use super::views;
use super::{Parser, ScopedContext};

// ============================================================================
// Entry points
// ============================================================================

/// The public [`Parser::parse`] entry point: requires the `workspace`
/// envelope, emitting a diagnostic (but still degrading gracefully) if it's
/// missing.
pub(super) fn parse_workspace(parser: &mut Parser) -> WorkspaceNode {
    let position = parser.position();

    if !parser.at(TokenKind::KwWorkspace) {
        parser
            .error("Expected 'workspace'")
            .found(format!("{:?}", parser.current()))
            .emit();
        let mut node = WorkspaceNode::empty(String::new(), position);
        let mut scope = ScopedContext::enter(parser, Context::new("workspace"));
        parse_workspace_statements(&mut scope, &mut node);
        return node;
    }
    parser.bump();

    let name = match parser.expect(TokenKind::StringLiteral, "workspace name") {
        Some(tok) => string_literal_value(parser, &tok),
        None => String::new(),
    };

    let mut node = WorkspaceNode::empty(name, position);

    if parser.at(TokenKind::StringLiteral) {
        let tok = parser.bump();
        node.description = Some(string_literal_value(parser, &tok));
    }

    if let Some(open_brace) = parser.expect(TokenKind::LBrace, "'{'") {
        let mut scope = ScopedContext::enter(parser, Context::new("workspace"));
        parse_workspace_statements(&mut scope, &mut node);
        scope.expect_close_brace(open_brace.position);
    }

    node
}

/// Used internally to expand `!include`d files: if the content starts with
/// `workspace`, identical to [`parse_workspace`]. Otherwise the content is
/// a bare fragment — either a run of workspace-level blocks, or (the
/// common case for a file included from inside `model { ... }`) a run of
/// bare model statements (`person`, `softwareSystem -> ...`, `!include`
/// chains of their own) — and is dispatched accordingly, with no
/// diagnostic for the missing envelope.
pub(super) fn parse_fragment(parser: &mut Parser) -> WorkspaceNode {
    let position = parser.position();

    if parser.at(TokenKind::KwWorkspace) {
        return parse_workspace(parser);
    }

    if is_bare_model_content(parser) {
        let mut node = WorkspaceNode::empty(String::new(), position);
        let mut model = ModelNode::default();
        let mut directives = Vec::new();
        let mut bubbled = Vec::new();
        {
            let mut scope = ScopedContext::enter(parser, Context::new("model"));
            parse_model_body_statements(&mut scope, &mut model, &mut directives, &mut bubbled);
        }
        node.model = Some(model);
        node.directives = directives;
        for mut child in bubbled {
            child.model = None;
            include::merge_workspace_into(&mut node, parser.diagnostics_mut(), child);
        }
        return node;
    }

    let mut node = WorkspaceNode::empty(String::new(), position);
    let mut scope = ScopedContext::enter(parser, Context::new("workspace"));
    parse_workspace_statements(&mut scope, &mut node);
    node
}

/// Heuristic used only to classify a fragment with no `workspace` wrapper:
/// `true` when the cursor sits on something that can only legally appear
/// inside a `model { ... }` block, as opposed to a workspace-level block
/// keyword (`model`, `views`, `styles`, ...).
fn is_bare_model_content(parser: &Parser) -> bool {
    matches!(
        parser.current(),
        TokenKind::KwPerson
            | TokenKind::KwSoftwareSystem
            | TokenKind::KwDeploymentEnvironment
            | TokenKind::KwGroup
            | TokenKind::KwEnterprise
            | TokenKind::KwRelationship
    ) || (parser.at(TokenKind::Bang)
        && matches!(parser.nth(1), TokenKind::KwIdentifiers | TokenKind::KwInclude))
        || (parser.at(TokenKind::Identifier)
            && (parser.nth(1) == TokenKind::Equals || relationship::starts_relationship(parser)))
}

// ============================================================================
// Workspace body
// ============================================================================

fn parse_workspace_statements(parser: &mut Parser, node: &mut WorkspaceNode) {
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        match parser.current() {
            TokenKind::KwModel => {
                let (model, directives, bubbled) = parse_model_block(parser);
                node.model = Some(model);
                node.directives.extend(directives);
                for mut child in bubbled {
                    child.model = None;
                    include::merge_workspace_into(node, parser.diagnostics_mut(), child);
                }
            }
            TokenKind::KwViews => {
                node.views = Some(views::parse_views_block(parser));
            }
            TokenKind::KwStyles => {
                node.styles = Some(parse_styles_block(parser));
            }
            TokenKind::KwThemes => {
                node.themes.extend(parse_themes(parser));
            }
            TokenKind::KwBranding => {
                node.branding = Some(parse_branding_block(parser));
            }
            TokenKind::KwTerminology => {
                node.terminology = Some(parse_terminology_block(parser));
            }
            TokenKind::KwConfiguration => {
                parse_configuration_block(parser, &mut node.configuration);
            }
            TokenKind::KwDocumentation => {
                node.documentation = parse_documentation_block(parser);
            }
            TokenKind::KwDecisions => {
                node.decisions.extend(parse_decisions_block(parser));
            }
            TokenKind::Identifier
                if parser.text(parser.current_token()) == "properties"
                    && parser.nth(1) == TokenKind::LBrace =>
            {
                parser.bump();
                let mut properties = node.properties.take().unwrap_or_default();
                parse_property_block_into(parser, &mut properties);
                node.properties = Some(properties);
            }
            TokenKind::Bang if parser.nth(1) == TokenKind::KwInclude => {
                parser.bump();
                parser.bump();
                if let Some(path_tok) = parser.expect(TokenKind::StringLiteral, "include path") {
                    let path = string_literal_value(parser, &path_tok);
                    let position = path_tok.position;
                    node.includes.push(FileIncludeNode::new(path.clone(), position));
                    if let Some(child) = include::expand_file_include(parser, &path, position) {
                        node.includes.last_mut().unwrap().resolved = true;
                        include::merge_workspace_into(node, parser.diagnostics_mut(), child);
                    }
                }
            }
            _ => {
                let found = format!("{:?}", parser.current());
                parser.error("Unexpected token in workspace block").found(found).emit();
                parser.synchronize();
                if !parser.at(TokenKind::RBrace) && !parser.eof() {
                    parser.bump();
                }
            }
        }
    }
}

fn string_literal_value(parser: &Parser, token: &Token) -> String {
    match &token.literal {
        Some(Literal::String(s)) => s.clone(),
        _ => parser.text(token).to_string(),
    }
}

fn parse_generic_value(parser: &mut Parser) -> String {
    match parser.current() {
        TokenKind::StringLiteral => {
            let tok = parser.bump();
            string_literal_value(parser, &tok)
        }
        TokenKind::Number => {
            let tok = parser.bump();
            match &tok.literal {
                Some(Literal::Number(n)) => n.to_string(),
                _ => parser.text(&tok).to_string(),
            }
        }
        TokenKind::Identifier => {
            let tok = parser.bump();
            parser.text(&tok).to_string()
        }
        _ => {
            let found = format!("{:?}", parser.current());
            parser.error("Expected property value").found(found).emit();
            String::new()
        }
    }
}

fn parse_property_block_into(parser: &mut Parser, target: &mut Properties) {
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return;
    }
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        if parser.at(TokenKind::Identifier) {
            let key_tok = parser.bump();
            let key = parser.text(&key_tok).to_string();
            parser.eat(TokenKind::Equals);
            let value = parse_generic_value(parser);
            target.insert(key, value);
        } else {
            let found = format!("{:?}", parser.current());
            parser.error("Unexpected token in properties block").found(found).emit();
            parser.synchronize();
            if !parser.at(TokenKind::RBrace) && !parser.eof() {
                parser.bump();
            }
        }
    }
    parser.expect_close_brace(open_brace_pos);
}

fn parse_themes(parser: &mut Parser) -> Vec<String> {
    parser.bump(); // 'themes'
    let mut themes = Vec::new();
    let open_brace_pos = parser.position();
    let block = parser.eat(TokenKind::LBrace);
    while parser.at(TokenKind::StringLiteral) {
        let tok = parser.bump();
        themes.push(string_literal_value(parser, &tok));
    }
    if block {
        parser.expect_close_brace(open_brace_pos);
    }
    themes
}

fn parse_styles_block(parser: &mut Parser) -> StylesNode {
    parser.bump(); // 'styles'
    let mut node = StylesNode::default();
    let Some(open_brace) = parser.expect(TokenKind::LBrace, "'{'") else {
        return node;
    };
    let mut scope = ScopedContext::enter(parser, Context::new("styles"));
    while !scope.eof() && !scope.at(TokenKind::RBrace) {
        match scope.current() {
            TokenKind::KwElement => {
                let position = scope.position();
                scope.bump();
                let tag = scope
                    .expect(TokenKind::StringLiteral, "style tag")
                    .map(|t| string_literal_value(&scope, &t))
                    .unwrap_or_default();
                let properties = parse_style_property_block(&mut scope);
                node.elements.push(ElementStyleNode {
                    tag,
                    properties,
                    source_position: position,
                });
            }
            TokenKind::KwRelationship => {
                let position = scope.position();
                scope.bump();
                let tag = scope
                    .expect(TokenKind::StringLiteral, "style tag")
                    .map(|t| string_literal_value(&scope, &t))
                    .unwrap_or_default();
                let properties = parse_style_property_block(&mut scope);
                node.relationships.push(RelationshipStyleNode {
                    tag,
                    properties,
                    source_position: position,
                });
            }
            _ => {
                let found = format!("{:?}", scope.current());
                scope.error("Unexpected token in styles block").found(found).emit();
                scope.synchronize();
                if !scope.at(TokenKind::RBrace) && !scope.eof() {
                    scope.bump();
                }
            }
        }
    }
    scope.expect_close_brace(open_brace.position);
    node
}

fn parse_style_property_block(parser: &mut Parser) -> Properties {
    let mut properties = Properties::new();
    parse_property_block_into(parser, &mut properties);
    properties
}

fn parse_branding_block(parser: &mut Parser) -> BrandingNode {
    parser.bump(); // 'branding'
    let mut node = BrandingNode::default();
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return node;
    }
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        if parser.at(TokenKind::Identifier) {
            let key_tok = parser.bump();
            let key = parser.text(&key_tok).to_string();
            parser.eat(TokenKind::Equals);
            let value = parse_generic_value(parser);
            match key.as_str() {
                "logo" => node.logo = Some(value),
                "font" => node.font = Some(value),
                _ => {
                    node.properties.insert(key, value);
                }
            }
        } else {
            let found = format!("{:?}", parser.current());
            parser.error("Unexpected token in branding block").found(found).emit();
            parser.synchronize();
            if !parser.at(TokenKind::RBrace) && !parser.eof() {
                parser.bump();
            }
        }
    }
    parser.expect_close_brace(open_brace_pos);
    node
}

fn parse_terminology_block(parser: &mut Parser) -> TerminologyNode {
    parser.bump(); // 'terminology'
    let mut node = TerminologyNode::default();
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return node;
    }
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        let key_tok = parser.bump();
        let key = parser.text(&key_tok).to_string();
        if parser.at(TokenKind::StringLiteral) {
            let value_tok = parser.bump();
            let value = string_literal_value(parser, &value_tok);
            node.terms.insert(key, value);
        } else {
            let found = format!("{:?}", parser.current());
            parser.error("Expected terminology override string").found(found).emit();
        }
    }
    parser.expect_close_brace(open_brace_pos);
    node
}

fn parse_configuration_block(parser: &mut Parser, target: &mut Properties) {
    parser.bump(); // 'configuration'
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return;
    }
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        if parser.at(TokenKind::Identifier) {
            let key_tok = parser.bump();
            let key = parser.text(&key_tok).to_string();
            parser.eat(TokenKind::Equals);
            let value = parse_generic_value(parser);
            target.insert(key, value);
        } else {
            let found = format!("{:?}", parser.current());
            parser.error("Unexpected token in configuration block").found(found).emit();
            parser.synchronize();
            if !parser.at(TokenKind::RBrace) && !parser.eof() {
                parser.bump();
            }
        }
    }
    parser.expect_close_brace(open_brace_pos);
}

fn parse_documentation_block(parser: &mut Parser) -> Option<String> {
    parser.bump(); // 'documentation'
    if parser.at(TokenKind::StringLiteral) {
        let tok = parser.bump();
        return Some(string_literal_value(parser, &tok));
    }
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return None;
    }
    let mut sections = Vec::new();
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        if parser.at(TokenKind::StringLiteral) {
            let tok = parser.bump();
            sections.push(string_literal_value(parser, &tok));
        } else {
            parser.bump();
        }
    }
    parser.expect_close_brace(open_brace_pos);
    if sections.is_empty() {
        None
    } else {
        Some(sections.join("\n\n"))
    }
}

fn parse_decisions_block(parser: &mut Parser) -> Vec<DecisionNode> {
    parser.bump(); // 'decisions'
    let mut decisions = Vec::new();
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return decisions;
    }
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        if parser.at(TokenKind::StringLiteral) {
            let position = parser.position();
            let id_tok = parser.bump();
            let id = string_literal_value(parser, &id_tok);
            let title = if parser.at(TokenKind::StringLiteral) {
                let t = parser.bump();
                Some(string_literal_value(parser, &t))
            } else {
                None
            };
            let content = if parser.at(TokenKind::StringLiteral) {
                let t = parser.bump();
                Some(string_literal_value(parser, &t))
            } else if parser.at(TokenKind::LBrace) {
                let content_brace_pos = parser.position();
                parser.bump();
                let mut parts = Vec::new();
                while !parser.eof() && !parser.at(TokenKind::RBrace) {
                    if parser.at(TokenKind::StringLiteral) {
                        let t = parser.bump();
                        parts.push(string_literal_value(parser, &t));
                    } else {
                        parser.bump();
                    }
                }
                parser.expect_close_brace(content_brace_pos);
                if parts.is_empty() {
                    None
                } else {
                    Some(parts.join("\n"))
                }
            } else {
                None
            };
            decisions.push(DecisionNode {
                id,
                title,
                content,
                source_position: position,
            });
        } else {
            let found = format!("{:?}", parser.current());
            parser.error("Unexpected token in decisions block").found(found).emit();
            parser.synchronize();
            if !parser.at(TokenKind::RBrace) && !parser.eof() {
                parser.bump();
            }
        }
    }
    parser.expect_close_brace(open_brace_pos);
    decisions
}

// ============================================================================
// Model block
// ============================================================================

/// Parses `model { ... }`, returning the model itself, any `!identifiers`
/// directives seen (also recorded on the model directly), and any
/// workspace-level content bubbled up from a non-model-only `!include`
/// encountered inside the block (views/styles/etc. defined by a file
/// included from within `model { ... }`).
pub(super) fn parse_model_block(parser: &mut Parser) -> (ModelNode, Vec<Directive>, Vec<WorkspaceNode>) {
    let mut node = ModelNode::default();
    let mut directives = Vec::new();
    let mut bubbled = Vec::new();

    parser.expect(TokenKind::KwModel, "'model'");
    if let Some(open_brace) = parser.expect(TokenKind::LBrace, "'{'") {
        let mut scope = ScopedContext::enter(parser, Context::new("model"));
        parse_model_body_statements(&mut scope, &mut node, &mut directives, &mut bubbled);
        scope.expect_close_brace(open_brace.position);
    }

    (node, directives, bubbled)
}

fn parse_model_body_statements(
    parser: &mut Parser,
    node: &mut ModelNode,
    directives: &mut Vec<Directive>,
    bubbled: &mut Vec<WorkspaceNode>,
) {
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        match parser.current() {
            TokenKind::Bang if parser.nth(1) == TokenKind::KwIdentifiers => {
                parser.bump();
                parser.bump();
                if let Some(tok) = parser.expect(TokenKind::Identifier, "'flat' or 'hierarchical'") {
                    let scheme = if parser.text(&tok) == "hierarchical" {
                        IdentifierScheme::Hierarchical
                    } else {
                        IdentifierScheme::Flat
                    };
                    node.identifier_scheme = scheme;
                    if let Some(ctx) = parser.context_mut().current_mut() {
                        ctx.data.identifier_scheme = Some(scheme);
                    }
                    directives.push(Directive::Identifiers(scheme));
                }
            }
            TokenKind::Bang if parser.nth(1) == TokenKind::KwInclude => {
                parser.bump();
                parser.bump();
                if let Some(path_tok) = parser.expect(TokenKind::StringLiteral, "include path") {
                    let path = string_literal_value(parser, &path_tok);
                    let position = path_tok.position;
                    if let Some(mut child) = include::expand_file_include(parser, &path, position) {
                        if let Some(child_model) = child.model.take() {
                            include::merge_model_into(node, parser.diagnostics_mut(), child_model);
                        }
                        bubbled.push(child);
                    }
                }
            }
            TokenKind::KwPerson => {
                if let Some(p) = parse_person(parser, None) {
                    node.people.push(p);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwSoftwareSystem => {
                if let Some(s) = parse_software_system(parser, None) {
                    node.software_systems.push(s);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwDeploymentEnvironment => {
                if let Some(d) = parse_deployment_environment(parser, None) {
                    node.deployment_environments.push(d);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwGroup => {
                if let Some(g) = parse_group(parser) {
                    node.groups.push(g);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwEnterprise => {
                if let Some(g) = parse_enterprise(parser) {
                    node.enterprise = Some(g);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::Identifier if parser.nth(1) == TokenKind::Equals => {
                let id_tok = parser.bump();
                let preset_id = parser.text(&id_tok).to_string();
                parser.bump(); // '='
                match parser.current() {
                    TokenKind::KwPerson => {
                        if let Some(p) = parse_person(parser, Some(preset_id)) {
                            node.people.push(p);
                        } else {
                            parser.synchronize();
                        }
                    }
                    TokenKind::KwSoftwareSystem => {
                        if let Some(s) = parse_software_system(parser, Some(preset_id)) {
                            node.software_systems.push(s);
                        } else {
                            parser.synchronize();
                        }
                    }
                    TokenKind::KwDeploymentEnvironment => {
                        if let Some(d) = parse_deployment_environment(parser, Some(preset_id)) {
                            node.deployment_environments.push(d);
                        } else {
                            parser.synchronize();
                        }
                    }
                    _ => {
                        let found = format!("{:?}", parser.current());
                        parser
                            .error("Expected an element keyword after '='")
                            .found(found)
                            .emit();
                        parser.synchronize();
                    }
                }
            }
            TokenKind::Identifier | TokenKind::KwThis if relationship::starts_relationship(parser) => {
                if let Some(r) = parse_relationship(parser) {
                    node.relationships.push(r);
                } else {
                    parser.synchronize();
                }
            }
            _ => {
                let found = format!("{:?}", parser.current());
                parser.error("Unexpected token in model block").found(found).emit();
                parser.synchronize();
                if !parser.at(TokenKind::RBrace) && !parser.eof() {
                    parser.bump();
                }
            }
        }
    }
}

/// Consumes `enterprise { ... }`: structurally a [`GroupNode`] without a
/// name, bounding which people/software systems are "internal".
fn parse_enterprise(parser: &mut Parser) -> Option<GroupNode> {
    if !parser.enter_recursion() {
        return None;
    }
    let result = (|| {
        let position = parser.position();
        parser.expect(TokenKind::KwEnterprise, "'enterprise'")?;
        let mut node = GroupNode {
            name: "Enterprise".to_string(),
            people: Vec::new(),
            software_systems: Vec::new(),
            groups: Vec::new(),
            relationships: Vec::new(),
            source_position: position,
        };
        let open_brace = parser.expect(TokenKind::LBrace, "'{'")?;
        {
            let mut scope = ScopedContext::enter(parser, Context::new("enterprise"));
            while !scope.eof() && !scope.at(TokenKind::RBrace) {
                match scope.current() {
                    TokenKind::KwPerson => {
                        if let Some(p) = parse_person(&mut scope, None) {
                            node.people.push(p);
                        } else {
                            scope.synchronize();
                        }
                    }
                    TokenKind::KwSoftwareSystem => {
                        if let Some(s) = parse_software_system(&mut scope, None) {
                            node.software_systems.push(s);
                        } else {
                            scope.synchronize();
                        }
                    }
                    TokenKind::KwGroup => {
                        if let Some(g) = parse_group(&mut scope) {
                            node.groups.push(g);
                        } else {
                            scope.synchronize();
                        }
                    }
                    TokenKind::Identifier | TokenKind::KwThis if relationship::starts_relationship(&scope) => {
                        if let Some(r) = parse_relationship(&mut scope) {
                            node.relationships.push(r);
                        } else {
                            scope.synchronize();
                        }
                    }
                    _ => {
                        let found = format!("{:?}", scope.current());
                        scope.error("Unexpected token in enterprise block").found(found).emit();
                        scope.synchronize();
                        if !scope.at(TokenKind::RBrace) && !scope.eof() {
                            scope.bump();
                        }
                    }
                }
            }
            scope.expect_close_brace(open_brace.position);
        }
        Some(node)
    })();
    parser.exit_recursion();
    result
}
