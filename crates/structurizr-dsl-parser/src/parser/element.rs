//! Element Parser (§ workspace elements): `person`, `softwareSystem`,
//! `container`, `component`, and the deployment-environment family.
//!
//! Every entry point follows the same shape: keyword, required name
//! string, optional description string, optional third positional
//! (technology or tags depending on element kind), optional `{ ... }`
//! block. Errors at any step invoke panic-mode recovery rather than
//! aborting the enclosing parse.

use structurizr_dsl_core::SourcePosition;

use crate::ast::*;
use crate::context::Context;
use crate::parser::relationship;
use crate::token::{Literal, Token, TokenKind};

use super::{Parser, ScopedContext};

/// Splits a comma-separated tag string into trimmed, non-empty tags.
fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The three positional strings shared by `person "Name" "Desc" "Tags"` and
/// `container "Name" "Desc" "Tech"`, collected before the block is parsed.
struct Positionals {
    name: String,
    description: Option<String>,
    third: Option<String>,
    source_position: SourcePosition,
}

/// Consumes the name string (required) plus up to two optional trailing
/// strings, warning on and discarding anything further. Returns `None`
/// (with a diagnostic already emitted) if the name is missing or empty.
fn parse_positionals(parser: &mut Parser, what: &str) -> Option<Positionals> {
    let position = parser.position();
    let name_token = match parser.expect(TokenKind::StringLiteral, &format!("{} name", what)) {
        Some(t) => t,
        None => return None,
    };
    let name = string_value(parser, &name_token);
    if name.is_empty() {
        parser.error("Empty identifier").emit();
        return None;
    }

    let description = if parser.at(TokenKind::StringLiteral) {
        let t = parser.bump();
        Some(string_value(parser, &t))
    } else {
        None
    };

    let third = if parser.at(TokenKind::StringLiteral) {
        let t = parser.bump();
        Some(string_value(parser, &t))
    } else {
        None
    };

    while parser.at(TokenKind::StringLiteral) {
        let t = parser.bump();
        let extra = string_value(parser, &t);
        parser
            .warning("Unexpected extra positional argument")
            .found(extra)
            .emit();
    }

    Some(Positionals {
        name,
        description,
        third,
        source_position: position,
    })
}

fn string_value(parser: &Parser, token: &Token) -> String {
    match &token.literal {
        Some(Literal::String(s)) => s.clone(),
        _ => parser.text(token).to_string(),
    }
}

fn resolve_id(parser: &Parser, preset_id: Option<String>, name: &str) -> String {
    preset_id.unwrap_or_else(|| Parser::derive_id(name))
}

/// The mutable accumulator a block body (`parse_parent_child`) fills in;
/// shape depends on the enclosing element kind, so only the fields that
/// kind can legally carry are populated.
#[derive(Default)]
pub(super) struct ElementBlockBody {
    pub properties: Properties,
    pub relationships: Vec<RelationshipNode>,
    pub containers: Vec<ContainerNode>,
    pub components: Vec<ComponentNode>,
    pub deployment_nodes: Vec<DeploymentNodeNode>,
    pub infrastructure_nodes: Vec<InfrastructureNodeNode>,
    pub container_instances: Vec<ContainerInstanceNode>,
}

/// Interprets the body of an element's `{ ... }` block, requiring
/// `current_element_id` to already be set in the top context. Recognises
/// property assignments, relationships (`->` or a verb), and nested
/// element keywords valid under `parent_kind`.
pub(super) fn parse_parent_child(parser: &mut Parser, parent_kind: TokenKind) -> ElementBlockBody {
    let mut body = ElementBlockBody::default();
    let parent_id = parser
        .context()
        .current()
        .and_then(|c| c.data.current_element_id.clone());
    let Some(parent_id) = parent_id else {
        parser.error("No current element").emit();
        return body;
    };

    while !parser.eof() && !parser.at(TokenKind::RBrace) {
        match parser.current() {
            TokenKind::Identifier if parser.nth(1) == TokenKind::Equals => {
                let key = parser.bump();
                let key_text = parser.text(&key).to_string();
                parser.bump(); // '='
                let value = parse_property_value(parser);
                body.properties.insert(key_text, value);
            }
            TokenKind::Identifier | TokenKind::KwThis if relationship::starts_relationship(parser) => {
                if let Some(rel) = relationship::parse_relationship(parser) {
                    body.relationships.push(rel);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::Arrow => {
                if let Some(rel) = relationship::parse_nested_relationship(parser, &parent_id) {
                    body.relationships.push(rel);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwContainer if parent_kind == TokenKind::KwSoftwareSystem => {
                if let Some(node) = parse_container(parser, &parent_id, None) {
                    body.containers.push(node);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwComponent if parent_kind == TokenKind::KwContainer => {
                if let Some(node) = parse_component(parser, &parent_id, None) {
                    body.components.push(node);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwDeploymentNode if parent_kind == TokenKind::KwDeploymentNode => {
                if let Some(node) = parse_deployment_node(parser, &parent_id, None) {
                    body.deployment_nodes.push(node);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwInfrastructureNode if parent_kind == TokenKind::KwDeploymentNode => {
                if let Some(node) = parse_infrastructure_node(parser, &parent_id, None) {
                    body.infrastructure_nodes.push(node);
                } else {
                    parser.synchronize();
                }
            }
            TokenKind::KwContainerInstance if parent_kind == TokenKind::KwDeploymentNode => {
                if let Some(node) = parse_container_instance(parser, &parent_id, None) {
                    body.container_instances.push(node);
                } else {
                    parser.synchronize();
                }
            }
            _ => {
                let found = format!("{:?}", parser.current());
                parser
                    .error("Unexpected token in element block")
                    .found(found)
                    .emit();
                parser.synchronize();
                if !parser.at(TokenKind::RBrace) && !parser.eof() {
                    parser.bump();
                }
            }
        }
    }

    body
}

fn parse_property_value(parser: &mut Parser) -> String {
    match parser.current() {
        TokenKind::StringLiteral | TokenKind::Number | TokenKind::Identifier => {
            let token = parser.bump();
            match &token.literal {
                Some(Literal::String(s)) => s.clone(),
                Some(Literal::Number(n)) => n.to_string(),
                None => parser.text(&token).to_string(),
            }
        }
        _ => {
            parser
                .error("Expected property value")
                .found(format!("{:?}", parser.current()))
                .emit();
            String::new()
        }
    }
}

pub(super) fn parse_person(parser: &mut Parser, preset_id: Option<String>) -> Option<PersonNode> {
    parser.expect(TokenKind::KwPerson, "'person'")?;
    let positionals = parse_positionals(parser, "person")?;
    let id = resolve_id(parser, preset_id, &positionals.name);

    let mut node = PersonNode {
        id: id.clone(),
        name: positionals.name,
        description: positionals.description,
        tags: positionals.third.as_deref().map(split_tags).unwrap_or_default(),
        properties: Properties::new(),
        url: None,
        relationships: Vec::new(),
        source_position: positionals.source_position,
    };

    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        let mut scope = ScopedContext::enter(parser, Context::with_current_element("person", id));
        let body = parse_parent_child(&mut scope, TokenKind::KwPerson);
        node.properties = body.properties;
        node.relationships = body.relationships;
        scope.expect_close_brace(open_brace_pos);
    }

    Some(node)
}

pub(super) fn parse_software_system(
    parser: &mut Parser,
    preset_id: Option<String>,
) -> Option<SoftwareSystemNode> {
    parser.expect(TokenKind::KwSoftwareSystem, "'softwareSystem'")?;
    let positionals = parse_positionals(parser, "software system")?;
    let id = resolve_id(parser, preset_id, &positionals.name);

    let mut node = SoftwareSystemNode {
        id: id.clone(),
        name: positionals.name,
        description: positionals.description,
        tags: positionals.third.as_deref().map(split_tags).unwrap_or_default(),
        properties: Properties::new(),
        url: None,
        relationships: Vec::new(),
        containers: Vec::new(),
        source_position: positionals.source_position,
    };

    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        let mut scope =
            ScopedContext::enter(parser, Context::with_current_element("softwareSystem", id));
        let body = parse_parent_child(&mut scope, TokenKind::KwSoftwareSystem);
        node.properties = body.properties;
        node.relationships = body.relationships;
        node.containers = body.containers;
        scope.expect_close_brace(open_brace_pos);
    }

    Some(node)
}

pub(super) fn parse_container(
    parser: &mut Parser,
    parent_id: &str,
    preset_id: Option<String>,
) -> Option<ContainerNode> {
    parser.expect(TokenKind::KwContainer, "'container'")?;
    let positionals = parse_positionals(parser, "container")?;
    let id = resolve_id(parser, preset_id, &positionals.name);

    let mut node = ContainerNode {
        id: id.clone(),
        parent_id: parent_id.to_string(),
        name: positionals.name,
        description: positionals.description,
        // Tie-break: a container's third positional is technology, not tags.
        technology: positionals.third,
        tags: Vec::new(),
        properties: Properties::new(),
        url: None,
        relationships: Vec::new(),
        components: Vec::new(),
        source_position: positionals.source_position,
    };

    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        let mut scope = ScopedContext::enter(parser, Context::with_current_element("container", id));
        let body = parse_parent_child(&mut scope, TokenKind::KwContainer);
        node.properties = body.properties;
        node.relationships = body.relationships;
        node.components = body.components;
        scope.expect_close_brace(open_brace_pos);
    }

    Some(node)
}

pub(super) fn parse_component(
    parser: &mut Parser,
    parent_id: &str,
    preset_id: Option<String>,
) -> Option<ComponentNode> {
    parser.expect(TokenKind::KwComponent, "'component'")?;
    let positionals = parse_positionals(parser, "component")?;
    let id = resolve_id(parser, preset_id, &positionals.name);

    let mut node = ComponentNode {
        id: id.clone(),
        parent_id: parent_id.to_string(),
        name: positionals.name,
        description: positionals.description,
        technology: positionals.third,
        tags: Vec::new(),
        properties: Properties::new(),
        url: None,
        relationships: Vec::new(),
        source_position: positionals.source_position,
    };

    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        let mut scope = ScopedContext::enter(parser, Context::with_current_element("component", id));
        let body = parse_parent_child(&mut scope, TokenKind::KwComponent);
        node.properties = body.properties;
        node.relationships = body.relationships;
        scope.expect_close_brace(open_brace_pos);
    }

    Some(node)
}

pub(super) fn parse_deployment_environment(
    parser: &mut Parser,
    preset_id: Option<String>,
) -> Option<DeploymentEnvironmentNode> {
    parser.expect(TokenKind::KwDeploymentEnvironment, "'deploymentEnvironment'")?;
    let position = parser.position();
    let name_token = parser.expect(TokenKind::StringLiteral, "deployment environment name")?;
    let name = string_value(parser, &name_token);
    if name.is_empty() {
        parser.error("Empty identifier").emit();
        return None;
    }
    let id = resolve_id(parser, preset_id, &name);

    let mut node = DeploymentEnvironmentNode {
        id: id.clone(),
        name,
        deployment_nodes: Vec::new(),
        properties: Properties::new(),
        source_position: position,
    };

    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        let mut scope = ScopedContext::enter(
            parser,
            Context::with_current_element("deploymentEnvironment", id.clone()),
        );
        while !scope.eof() && !scope.at(TokenKind::RBrace) {
            if scope.at(TokenKind::KwDeploymentNode) {
                if let Some(dn) = parse_deployment_node(&mut scope, &id, None) {
                    node.deployment_nodes.push(dn);
                } else {
                    scope.synchronize();
                }
            } else if scope.at(TokenKind::Identifier) && scope.nth(1) == TokenKind::Equals {
                let key = scope.bump();
                let key_text = scope.text(&key).to_string();
                scope.bump();
                let value = parse_property_value(&mut scope);
                node.properties.insert(key_text, value);
            } else {
                scope
                    .error("Unexpected token in deploymentEnvironment block")
                    .found(format!("{:?}", scope.current()))
                    .emit();
                scope.synchronize();
                if !scope.at(TokenKind::RBrace) && !scope.eof() {
                    scope.bump();
                }
            }
        }
        scope.expect_close_brace(open_brace_pos);
    }

    Some(node)
}

pub(super) fn parse_deployment_node(
    parser: &mut Parser,
    parent_id: &str,
    preset_id: Option<String>,
) -> Option<DeploymentNodeNode> {
    if !parser.enter_recursion() {
        return None;
    }
    let result = (|| {
        parser.expect(TokenKind::KwDeploymentNode, "'deploymentNode'")?;
        let positionals = parse_positionals(parser, "deployment node")?;
        let id = resolve_id(parser, preset_id, &positionals.name);

        let mut node = DeploymentNodeNode {
            id: id.clone(),
            parent_id: parent_id.to_string(),
            name: positionals.name,
            description: positionals.description,
            technology: positionals.third,
            tags: Vec::new(),
            properties: Properties::new(),
            relationships: Vec::new(),
            deployment_nodes: Vec::new(),
            infrastructure_nodes: Vec::new(),
            container_instances: Vec::new(),
            source_position: positionals.source_position,
        };

        if parser.at(TokenKind::LBrace) {
            let open_brace_pos = parser.position();
            parser.bump();
            let mut scope =
                ScopedContext::enter(parser, Context::with_current_element("deploymentNode", id));
            let body = parse_parent_child(&mut scope, TokenKind::KwDeploymentNode);
            node.properties = body.properties;
            node.relationships = body.relationships;
            node.deployment_nodes = body.deployment_nodes;
            node.infrastructure_nodes = body.infrastructure_nodes;
            node.container_instances = body.container_instances;
            scope.expect_close_brace(open_brace_pos);
        }

        Some(node)
    })();
    parser.exit_recursion();
    result
}

pub(super) fn parse_infrastructure_node(
    parser: &mut Parser,
    parent_id: &str,
    preset_id: Option<String>,
) -> Option<InfrastructureNodeNode> {
    parser.expect(TokenKind::KwInfrastructureNode, "'infrastructureNode'")?;
    let positionals = parse_positionals(parser, "infrastructure node")?;
    let id = resolve_id(parser, preset_id, &positionals.name);

    let mut node = InfrastructureNodeNode {
        id: id.clone(),
        parent_id: parent_id.to_string(),
        name: positionals.name,
        description: positionals.description,
        technology: positionals.third,
        tags: Vec::new(),
        properties: Properties::new(),
        relationships: Vec::new(),
        source_position: positionals.source_position,
    };

    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        let mut scope =
            ScopedContext::enter(parser, Context::with_current_element("infrastructureNode", id));
        let body = parse_parent_child(&mut scope, TokenKind::KwInfrastructureNode);
        node.properties = body.properties;
        node.relationships = body.relationships;
        scope.expect_close_brace(open_brace_pos);
    }

    Some(node)
}

/// `containerInstance <containerId>` — unlike the other element kinds this
/// takes a bare identifier, not a name string.
pub(super) fn parse_container_instance(
    parser: &mut Parser,
    parent_id: &str,
    preset_id: Option<String>,
) -> Option<ContainerInstanceNode> {
    let position = parser.position();
    parser.expect(TokenKind::KwContainerInstance, "'containerInstance'")?;
    let container_token = parser.expect(TokenKind::Identifier, "container id")?;
    let container_id = parser.text(&container_token).to_string();
    let id = preset_id.unwrap_or_else(|| container_id.clone());

    let mut node = ContainerInstanceNode {
        id,
        parent_id: parent_id.to_string(),
        container_id,
        tags: Vec::new(),
        properties: Properties::new(),
        relationships: Vec::new(),
        source_position: position,
    };

    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        let mut scope = ScopedContext::enter(
            parser,
            Context::with_current_element("containerInstance", node.id.clone()),
        );
        let body = parse_parent_child(&mut scope, TokenKind::KwContainerInstance);
        node.properties = body.properties;
        node.relationships = body.relationships;
        scope.expect_close_brace(open_brace_pos);
    }

    Some(node)
}
