//! Views Parser (spec §4.7): the `views { ... }` block and its nine
//! per-kind view definitions.

use crate::ast::*;
use crate::context::Context;
use crate::token::{Literal, Token, TokenKind};

use super::{Parser, ScopedContext};

pub(super) fn parse_views_block(parser: &mut Parser) -> ViewsNode {
    parser.expect(TokenKind::KwViews, "'views'");
    let mut node = ViewsNode::default();
    let Some(open_brace) = parser.expect(TokenKind::LBrace, "'{'") else {
        return node;
    };
    let mut scope = ScopedContext::enter(parser, Context::new("views"));
    while !scope.eof() && !scope.at(TokenKind::RBrace) {
        match scope.current() {
            TokenKind::KwSystemLandscape => {
                node.system_landscape_views.push(parse_system_landscape_view(&mut scope));
            }
            TokenKind::KwSystemContext => {
                node.system_context_views.push(parse_system_context_view(&mut scope));
            }
            TokenKind::KwContainerView => {
                node.container_views.push(parse_container_view(&mut scope));
            }
            TokenKind::KwComponentView => {
                node.component_views.push(parse_component_view(&mut scope));
            }
            TokenKind::KwDynamic => {
                node.dynamic_views.push(parse_dynamic_view(&mut scope));
            }
            TokenKind::KwDeployment => {
                node.deployment_views.push(parse_deployment_view(&mut scope));
            }
            TokenKind::KwFiltered => {
                node.filtered_views.push(parse_filtered_view(&mut scope));
            }
            TokenKind::KwCustom => {
                node.custom_views.push(parse_custom_view(&mut scope));
            }
            TokenKind::KwImage => {
                node.image_views.push(parse_image_view(&mut scope));
            }
            TokenKind::KwConfiguration => {
                parse_views_configuration(&mut scope, &mut node.configuration);
            }
            _ => {
                let found = format!("{:?}", scope.current());
                scope.error("Unexpected token in views block").found(found).emit();
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

fn parse_views_configuration(parser: &mut Parser, target: &mut Properties) {
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
            let value = parse_value_token(parser);
            target.insert(key, value);
        } else {
            let found = format!("{:?}", parser.current());
            parser.error("Unexpected token in views configuration block").found(found).emit();
            parser.synchronize();
            if !parser.at(TokenKind::RBrace) && !parser.eof() {
                parser.bump();
            }
        }
    }
    parser.expect_close_brace(open_brace_pos);
}

// ============================================================================
// Shared helpers
// ============================================================================

fn string_literal_value(parser: &Parser, token: &Token) -> String {
    match &token.literal {
        Some(Literal::String(s)) => s.clone(),
        _ => parser.text(token).to_string(),
    }
}

fn parse_value_token(parser: &mut Parser) -> String {
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
        _ => {
            let tok = parser.bump();
            parser.text(&tok).to_string()
        }
    }
}

/// Consumes an identifier-or-`this` scope reference (the `<systemId>`,
/// `<containerId>`, `<scopeId>` positional argument that precedes the key
/// on most view kinds).
fn parse_scope_id(parser: &mut Parser) -> String {
    if parser.at(TokenKind::KwThis) {
        let tok = parser.bump();
        return parser.text(&tok).to_string();
    }
    match parser.expect(TokenKind::Identifier, "element identifier") {
        Some(tok) => parser.text(&tok).to_string(),
        None => String::new(),
    }
}

/// Consumes the trailing `"key" ["title"]` positionals common to every view
/// kind and builds the `ViewCommon` envelope, leaving the cursor at the
/// optional `{`.
fn parse_key_and_title(parser: &mut Parser) -> ViewCommon {
    let position = parser.position();
    let key = match parser.expect(TokenKind::StringLiteral, "view key") {
        Some(tok) => string_literal_value(parser, &tok),
        None => String::new(),
    };
    let mut common = ViewCommon::new(key, position);
    if parser.at(TokenKind::StringLiteral) {
        let tok = parser.bump();
        common.title = Some(string_literal_value(parser, &tok));
    }
    common
}

/// Parses the shared view body (`include`/`exclude`/`autoLayout`/
/// `animation`/`baseOn`/`title`/`description`/`properties`/generic
/// `name = value`), if a `{` follows. `base_view_key` receives a `baseOn
/// "key"` statement, relevant only to filtered views; other callers pass
/// `None` and ignore it.
fn parse_view_body(
    parser: &mut Parser,
    common: &mut ViewCommon,
    mut base_view_key: Option<&mut String>,
    mut image: Option<&mut Option<String>>,
) {
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return;
    }
    let mut scope = ScopedContext::enter(parser, Context::new("view"));
    while !scope.eof() && !scope.at(TokenKind::RBrace) {
        match scope.current() {
            TokenKind::KwInclude => {
                scope.bump();
                let expr = parse_include_exclude_expr(&mut scope);
                let position = scope.position();
                common.includes.push(IncludeNode {
                    expression: expr,
                    source_position: position,
                });
            }
            TokenKind::KwExclude => {
                scope.bump();
                let expr = parse_include_exclude_expr(&mut scope);
                let position = scope.position();
                common.excludes.push(ExcludeNode {
                    expression: expr,
                    source_position: position,
                });
            }
            TokenKind::KwAutoLayout => {
                scope.bump();
                common.auto_layout = Some(parse_auto_layout(&mut scope));
            }
            TokenKind::KwAnimation => {
                scope.bump();
                common.animations = parse_animation_block(&mut scope);
            }
            TokenKind::KwBaseOn => {
                scope.bump();
                let value = scope
                    .expect(TokenKind::StringLiteral, "base view key")
                    .map(|t| string_literal_value(&scope, &t))
                    .unwrap_or_default();
                if let Some(target) = base_view_key.as_deref_mut() {
                    *target = value;
                }
            }
            TokenKind::KwImage => {
                scope.bump();
                let value = if scope.at(TokenKind::StringLiteral) {
                    let tok = scope.bump();
                    Some(string_literal_value(&scope, &tok))
                } else {
                    None
                };
                if let Some(target) = image.as_deref_mut() {
                    *target = value;
                }
            }
            TokenKind::Identifier if scope.text(scope.current_token()) == "title" => {
                scope.bump();
                if scope.at(TokenKind::StringLiteral) {
                    let tok = scope.bump();
                    common.title = Some(string_literal_value(&scope, &tok));
                }
            }
            TokenKind::Identifier if scope.text(scope.current_token()) == "description" => {
                scope.bump();
                if scope.at(TokenKind::StringLiteral) {
                    let tok = scope.bump();
                    common.description = Some(string_literal_value(&scope, &tok));
                }
            }
            TokenKind::Identifier if scope.text(scope.current_token()) == "properties" => {
                scope.bump();
                parse_property_block_into(&mut scope, &mut common.properties);
            }
            TokenKind::Identifier if scope.nth(1) == TokenKind::Equals => {
                let key_tok = scope.bump();
                let key = scope.text(&key_tok).to_string();
                scope.bump(); // '='
                let value = parse_value_token(&mut scope);
                common.properties.insert(key, value);
            }
            _ => {
                let found = format!("{:?}", scope.current());
                scope.error("Unexpected token in view block").found(found).emit();
                scope.synchronize();
                if !scope.at(TokenKind::RBrace) && !scope.eof() {
                    scope.bump();
                }
            }
        }
    }
    scope.expect_close_brace(open_brace_pos);
}

/// Parses `include <pattern|*|id>` / `exclude <pattern|id>`'s argument: the
/// `*` token preserved verbatim, identifiers preserved as-is, string
/// literals stripped of quotes.
fn parse_include_exclude_expr(parser: &mut Parser) -> String {
    match parser.current() {
        TokenKind::Star => {
            parser.bump();
            "*".to_string()
        }
        TokenKind::StringLiteral => {
            let tok = parser.bump();
            string_literal_value(parser, &tok)
        }
        TokenKind::Identifier => {
            let tok = parser.bump();
            parser.text(&tok).to_string()
        }
        _ => {
            let found = format!("{:?}", parser.current());
            parser.error("Expected an include/exclude expression").found(found).emit();
            String::new()
        }
    }
}

fn parse_optional_number(parser: &mut Parser) -> Option<i64> {
    if parser.at(TokenKind::Number) {
        let tok = parser.bump();
        match tok.literal {
            Some(Literal::Number(n)) => Some(n),
            _ => None,
        }
    } else {
        None
    }
}

/// Parses `autoLayout [direction] [rankSep] [nodeSep]`: direction, if
/// present, is an identifier (`tb`, `bt`, `lr`, `rl`); the separations are
/// bare numbers.
fn parse_auto_layout(parser: &mut Parser) -> AutoLayout {
    let direction = if parser.at(TokenKind::Identifier) {
        let tok = parser.bump();
        Some(parser.text(&tok).to_string())
    } else {
        None
    };
    let rank_separation = parse_optional_number(parser);
    let node_separation = parse_optional_number(parser);
    AutoLayout {
        direction,
        rank_separation,
        node_separation,
    }
}

/// Parses `animation { identifier[,identifier...] ... }`, one
/// comma-separated identifier list per line/statement, numbering steps
/// 1..N in encounter order. A bare `{ a, b c, d }` with no separators
/// between groups is read as two steps since each new non-comma token
/// after a completed group starts the next one.
fn parse_animation_block(parser: &mut Parser) -> Vec<AnimationStep> {
    let mut steps = Vec::new();
    let open_brace_pos = parser.position();
    if !parser.eat(TokenKind::LBrace) {
        return steps;
    }
    let mut order = 1u32;
    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        let mut identifiers = Vec::new();
        loop {
            match parser.current() {
                TokenKind::Identifier => {
                    let tok = parser.bump();
                    identifiers.push(parser.text(&tok).to_string());
                }
                TokenKind::StringLiteral => {
                    let tok = parser.bump();
                    identifiers.push(string_literal_value(parser, &tok));
                }
                _ => break,
            }
            if parser.at(TokenKind::Comma) {
                parser.bump();
                continue;
            }
            break;
        }
        if identifiers.is_empty() {
            if !parser.at(TokenKind::RBrace) && !parser.eof() {
                let found = format!("{:?}", parser.current());
                parser.error("Expected an identifier in animation block").found(found).emit();
                parser.bump();
            }
            continue;
        }
        steps.push(AnimationStep { order, identifiers });
        order += 1;
    }
    parser.expect_close_brace(open_brace_pos);
    steps
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
            let value = parse_value_token(parser);
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

// ============================================================================
// Per-kind view parsers
// ============================================================================

fn parse_system_landscape_view(parser: &mut Parser) -> SystemLandscapeViewNode {
    parser.bump(); // 'systemLandscape'
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, None, None);
    SystemLandscapeViewNode { common }
}

fn parse_system_context_view(parser: &mut Parser) -> SystemContextViewNode {
    parser.bump(); // 'systemContext'
    let system_id = parse_scope_id(parser);
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, None, None);
    SystemContextViewNode { common, system_id }
}

fn parse_container_view(parser: &mut Parser) -> ContainerViewNode {
    parser.bump(); // 'containerView'
    let system_id = parse_scope_id(parser);
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, None, None);
    ContainerViewNode { common, system_id }
}

fn parse_component_view(parser: &mut Parser) -> ComponentViewNode {
    parser.bump(); // 'componentView'
    let container_id = parse_scope_id(parser);
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, None, None);
    ComponentViewNode { common, container_id }
}

fn parse_dynamic_view(parser: &mut Parser) -> DynamicViewNode {
    parser.bump(); // 'dynamic'
    let scope_id = parse_scope_id(parser);
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, None, None);
    DynamicViewNode { common, scope_id }
}

fn parse_deployment_view(parser: &mut Parser) -> DeploymentViewNode {
    parser.bump(); // 'deployment'
    let system_id = parse_scope_id(parser);
    let environment = match parser.expect(TokenKind::StringLiteral, "deployment environment name") {
        Some(tok) => string_literal_value(parser, &tok),
        None => String::new(),
    };
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, None, None);
    DeploymentViewNode {
        common,
        system_id,
        environment,
    }
}

fn parse_filtered_view(parser: &mut Parser) -> FilteredViewNode {
    parser.bump(); // 'filtered'
    let mut base_view_key = match parser.expect(TokenKind::StringLiteral, "base view key") {
        Some(tok) => string_literal_value(parser, &tok),
        None => String::new(),
    };
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, Some(&mut base_view_key), None);
    FilteredViewNode { common, base_view_key }
}

fn parse_custom_view(parser: &mut Parser) -> CustomViewNode {
    parser.bump(); // 'custom'
    let mut common = parse_key_and_title(parser);
    parse_view_body(parser, &mut common, None, None);
    CustomViewNode { common }
}

fn parse_image_view(parser: &mut Parser) -> ImageViewNode {
    parser.bump(); // 'image'
    let mut common = parse_key_and_title(parser);
    let mut image = None;
    parse_view_body(parser, &mut common, None, Some(&mut image));
    ImageViewNode { common, image }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use indoc::indoc;

    #[test]
    fn system_context_view_with_include_and_auto_layout() {
        let source = indoc! {r#"
            workspace "W" {
                views {
                    systemContext system "SC" {
                        include *
                        autoLayout tb 300 150
                    }
                }
            }
        "#};
        let mut parser = Parser::new();
        let workspace = parser.parse(source);
        assert!(!parser.diagnostics().has_errors(), "{:?}", parser.errors());
        let views = workspace.views.unwrap();
        assert_eq!(views.system_context_views.len(), 1);
        let view = &views.system_context_views[0];
        assert_eq!(view.system_id, "system");
        assert_eq!(view.common.key, "SC");
        assert_eq!(view.common.includes.len(), 1);
        assert_eq!(view.common.includes[0].expression, "*");
        assert_eq!(
            view.common.auto_layout,
            Some(AutoLayout {
                direction: Some("tb".to_string()),
                rank_separation: Some(300),
                node_separation: Some(150),
            })
        );
    }

    #[test]
    fn container_view_with_title_and_exclude() {
        let source = indoc! {r#"
            workspace "W" {
                views {
                    containerView system "Containers" "Container view" {
                        exclude "element.tag==Infrastructure"
                    }
                }
            }
        "#};
        let mut parser = Parser::new();
        let workspace = parser.parse(source);
        let views = workspace.views.unwrap();
        let view = &views.container_views[0];
        assert_eq!(view.system_id, "system");
        assert_eq!(view.common.key, "Containers");
        assert_eq!(view.common.title.as_deref(), Some("Container view"));
        assert_eq!(view.common.excludes.len(), 1);
    }

    #[test]
    fn dynamic_view_with_animation_steps() {
        let source = indoc! {r#"
            workspace "W" {
                views {
                    dynamic system "Dyn" {
                        animation {
                            a, b
                            c
                        }
                    }
                }
            }
        "#};
        let mut parser = Parser::new();
        let workspace = parser.parse(source);
        let views = workspace.views.unwrap();
        let view = &views.dynamic_views[0];
        assert_eq!(view.scope_id, "system");
        assert_eq!(view.common.animations.len(), 2);
        assert_eq!(view.common.animations[0].order, 1);
        assert_eq!(view.common.animations[0].identifiers, vec!["a", "b"]);
        assert_eq!(view.common.animations[1].order, 2);
        assert_eq!(view.common.animations[1].identifiers, vec!["c"]);
    }

    #[test]
    fn deployment_view_captures_environment() {
        let source = indoc! {r#"
            workspace "W" {
                views {
                    deployment system "Production" "Deploy" {
                        include *
                    }
                }
            }
        "#};
        let mut parser = Parser::new();
        let workspace = parser.parse(source);
        let views = workspace.views.unwrap();
        let view = &views.deployment_views[0];
        assert_eq!(view.system_id, "system");
        assert_eq!(view.environment, "Production");
        assert_eq!(view.common.key, "Deploy");
    }

    #[test]
    fn filtered_view_records_base_view_key() {
        let source = indoc! {r#"
            workspace "W" {
                views {
                    filtered "SC" "Filtered" {
                        baseOn "SC"
                    }
                }
            }
        "#};
        let mut parser = Parser::new();
        let workspace = parser.parse(source);
        let views = workspace.views.unwrap();
        let view = &views.filtered_views[0];
        assert_eq!(view.base_view_key, "SC");
        assert_eq!(view.common.key, "Filtered");
    }

    #[test]
    fn system_landscape_view_with_properties_block() {
        let source = indoc! {r#"
            workspace "W" {
                views {
                    systemLandscape "Landscape" {
                        properties {
                            structurizr.groupSeparator = "/"
                        }
                    }
                }
            }
        "#};
        let mut parser = Parser::new();
        let workspace = parser.parse(source);
        let views = workspace.views.unwrap();
        let view = &views.system_landscape_views[0];
        assert_eq!(
            view.common.properties.get("structurizr.groupSeparator").map(String::as_str),
            Some("/")
        );
    }

    #[test]
    fn views_configuration_block_is_captured() {
        let source = indoc! {r#"
            workspace "W" {
                views {
                    configuration {
                        theme default
                    }
                }
            }
        "#};
        let mut parser = Parser::new();
        let workspace = parser.parse(source);
        let views = workspace.views.unwrap();
        assert_eq!(views.configuration.get("theme").map(String::as_str), Some("default"));
    }
}
