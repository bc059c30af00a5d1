//! Relationship Parser: recognises the explicit (`->`), implicit (verb),
//! and nested relationship surface forms, plus the `group { ... }`
//! subroutine, which is specified alongside relationships because a
//! group's body is mostly relationships and nested groups.

use structurizr_dsl_core::SourcePosition;

use crate::ast::{GroupNode, Properties, RelationshipNode};
use crate::context::Context;
use crate::token::{Literal, TokenKind};

use super::element::{parse_person, parse_software_system};
use super::{Parser, ScopedContext};

/// `true` when the token at the cursor starts a relationship: an
/// identifier or `this` immediately followed by `->` or a relationship
/// verb.
pub(super) fn starts_relationship(parser: &Parser) -> bool {
    matches!(parser.current(), TokenKind::Identifier | TokenKind::KwThis)
        && (parser.nth(1) == TokenKind::Arrow || parser.nth(1).is_relationship_verb())
}

/// Parses `sourceId -> destinationId ...` or `sourceId VERB destinationId
/// ...` starting at the source identifier, which may also be `this`.
pub(super) fn parse_relationship(parser: &mut Parser) -> Option<RelationshipNode> {
    let position = parser.position();
    if !matches!(parser.current(), TokenKind::Identifier | TokenKind::KwThis) {
        let found = format!("{:?}", parser.current());
        parser.error("Expected relationship source").found(found).emit();
        return None;
    }
    let source_token = parser.bump();
    let source_id = parser.text(&source_token).to_string();

    if parser.at(TokenKind::Arrow) {
        parser.bump();
        parse_relationship_tail(parser, source_id, None, position)
    } else if parser.current().is_relationship_verb() {
        let verb = consume_verb(parser);
        parse_relationship_tail(parser, source_id, Some(verb), position)
    } else {
        let found = format!("{:?}", parser.current());
        parser
            .error("Expected '->' or a relationship verb")
            .found(found)
            .emit();
        None
    }
}

/// Parses `-> destinationId ...` where the source is inherited from the
/// enclosing element (the nested form used inside element blocks).
pub(super) fn parse_nested_relationship(
    parser: &mut Parser,
    source_id: &str,
) -> Option<RelationshipNode> {
    let position = parser.position();
    if !parser.eat(TokenKind::Arrow) {
        let found = format!("{:?}", parser.current());
        parser.error("Expected '->'").found(found).emit();
        return None;
    }
    parse_relationship_tail(parser, source_id.to_string(), None, position)
}

/// Consumes the verb token(s) starting at the cursor, handling the
/// two-word `consists of` by greedily eating a following `of`.
fn consume_verb(parser: &mut Parser) -> &'static str {
    let first = parser.bump();
    if first.kind == TokenKind::VerbConsists && parser.at(TokenKind::VerbOf) {
        parser.bump();
    }
    first.kind.verb_text().unwrap_or("uses")
}

fn parse_relationship_tail(
    parser: &mut Parser,
    source_id: String,
    verb: Option<&'static str>,
    position: SourcePosition,
) -> Option<RelationshipNode> {
    if parser.eof() || parser.at(TokenKind::RBrace) || starts_relationship(parser) {
        let found = format!("{:?}", parser.current());
        parser.error("Expected relationship destination").found(found).emit();
        return None;
    }

    let destination_id = parse_destination(parser)?;

    let description = if parser.at(TokenKind::StringLiteral) {
        Some(string_literal_value(parser))
    } else {
        verb.map(title_case)
    };

    let technology = if description.is_some() && parser.at(TokenKind::StringLiteral) {
        Some(string_literal_value(parser))
    } else {
        None
    };

    let mut properties = Properties::new();
    let mut tags = Vec::new();
    if parser.at(TokenKind::LBrace) {
        let open_brace_pos = parser.position();
        parser.bump();
        while !parser.eof() && !parser.at(TokenKind::RBrace) {
            if parser.at(TokenKind::Identifier) && parser.nth(1) == TokenKind::Equals {
                let key = parser.bump();
                let key_text = parser.text(&key).to_string();
                parser.bump();
                let value = parser_property_value(parser);
                if key_text == "tags" {
                    tags = value.split(',').map(str::trim).filter(|s| !s.is_empty()).map(String::from).collect();
                } else {
                    properties.insert(key_text, value);
                }
            } else {
                let found = format!("{:?}", parser.current());
                parser
                    .error("Unexpected token in relationship block")
                    .found(found)
                    .emit();
                parser.synchronize();
                if !parser.at(TokenKind::RBrace) && !parser.eof() {
                    parser.bump();
                }
            }
        }
        parser.expect_close_brace(open_brace_pos);
    }

    Some(RelationshipNode {
        source_id,
        destination_id,
        description,
        technology,
        tags,
        properties,
        source_position: position,
    })
}

fn parser_property_value(parser: &mut Parser) -> String {
    match parser.current() {
        TokenKind::StringLiteral => string_literal_value(parser),
        TokenKind::Number | TokenKind::Identifier => {
            let token = parser.bump();
            match &token.literal {
                Some(Literal::Number(n)) => n.to_string(),
                _ => parser.text(&token).to_string(),
            }
        }
        _ => {
            let found = format!("{:?}", parser.current());
            parser.error("Expected property value").found(found).emit();
            String::new()
        }
    }
}

fn string_literal_value(parser: &mut Parser) -> String {
    let token = parser.bump();
    match &token.literal {
        Some(Literal::String(s)) => s.clone(),
        _ => parser.text(&token).to_string(),
    }
}

/// Consumes a destination, concatenating consecutive bare identifiers with
/// single spaces (an unquoted multi-word destination name such as
/// `Web Application`), or taking a single identifier/`this` otherwise.
fn parse_destination(parser: &mut Parser) -> Option<String> {
    if !matches!(parser.current(), TokenKind::Identifier | TokenKind::KwThis) {
        let found = format!("{:?}", parser.current());
        parser.error("Expected relationship destination").found(found).emit();
        return None;
    }
    let first = parser.bump();
    let mut parts = vec![parser.text(&first).to_string()];
    while parser.at(TokenKind::Identifier) && can_continue_destination(parser) {
        let next = parser.bump();
        parts.push(parser.text(&next).to_string());
    }
    Some(parts.join(" "))
}

/// Stops bare-word destination concatenation at anything that can start a
/// following clause: a description string, a property block, end of
/// statement, or a verb/keyword.
fn can_continue_destination(parser: &Parser) -> bool {
    !matches!(
        parser.nth(0),
        TokenKind::StringLiteral
            | TokenKind::LBrace
            | TokenKind::RBrace
            | TokenKind::Semicolon
            | TokenKind::Comma
            | TokenKind::Arrow
            | TokenKind::Eof
    ) && !parser.current().is_relationship_verb()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Consumes `group "Name" { ... }`: a context that may contain nested
/// people, software systems, relationships, and further nested groups.
pub(super) fn parse_group(parser: &mut Parser) -> Option<GroupNode> {
    if !parser.enter_recursion() {
        return None;
    }
    let result = (|| {
        let position = parser.position();
        parser.expect(TokenKind::KwGroup, "'group'")?;
        let name_token = parser.expect(TokenKind::StringLiteral, "group name")?;
        let name = string_literal_value_token(parser, &name_token);

        let mut node = GroupNode {
            name,
            people: Vec::new(),
            software_systems: Vec::new(),
            groups: Vec::new(),
            relationships: Vec::new(),
            source_position: position,
        };

        let open_brace = parser.expect(TokenKind::LBrace, "'{'")?;
        {
            let mut scope = ScopedContext::enter(parser, Context::new("group"));
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
                    TokenKind::Identifier | TokenKind::KwThis if starts_relationship(&scope) => {
                        if let Some(r) = parse_relationship(&mut scope) {
                            node.relationships.push(r);
                        } else {
                            scope.synchronize();
                        }
                    }
                    _ => {
                        let found = format!("{:?}", scope.current());
                        scope.error("Unexpected token in group block").found(found).emit();
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

fn string_literal_value_token(parser: &Parser, token: &crate::token::Token) -> String {
    match &token.literal {
        Some(Literal::String(s)) => s.clone(),
        _ => parser.text(token).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn fresh_parser(source: &str) -> Parser {
        let mut parser = Parser::new();
        parser.parse("");
        let mut diagnostics = structurizr_dsl_core::Diagnostics::default();
        parser.tokens = crate::lexer::lex(source, &mut diagnostics);
        parser.pos = 0;
        parser
    }

    #[test]
    fn explicit_relationship_with_description() {
        let mut parser = fresh_parser(r#"Web -> DB "reads""#);
        let rel = parse_relationship(&mut parser).unwrap();
        assert_eq!(rel.source_id, "Web");
        assert_eq!(rel.destination_id, "DB");
        assert_eq!(rel.description.as_deref(), Some("reads"));
    }

    #[test]
    fn implicit_relationship_defaults_to_title_cased_verb() {
        let mut parser = fresh_parser("user uses system");
        let rel = parse_relationship(&mut parser).unwrap();
        assert_eq!(rel.description.as_deref(), Some("Uses"));
    }

    #[test]
    fn two_word_verb_consists_of() {
        let mut parser = fresh_parser("container consists of component");
        let rel = parse_relationship(&mut parser).unwrap();
        assert_eq!(rel.destination_id, "component");
        assert_eq!(rel.description.as_deref(), Some("Consists of"));
    }

    #[test]
    fn multi_word_destination_concatenates_with_spaces() {
        let mut parser = fresh_parser(r#"user -> Web Application "reads""#);
        let rel = parse_relationship(&mut parser).unwrap();
        assert_eq!(rel.destination_id, "Web Application");
    }

    #[test]
    fn arrow_with_no_destination_is_an_error() {
        let mut parser = fresh_parser("user ->");
        let rel = parse_relationship(&mut parser);
        assert!(rel.is_none());
        assert!(parser.diagnostics().has_errors());
    }

    #[test]
    fn nested_group_with_relationship() {
        let mut parser = fresh_parser(r#"group "Team" { a -> b } "#);
        let group = parse_group(&mut parser).unwrap();
        assert_eq!(group.name, "Team");
        assert_eq!(group.relationships.len(), 1);
        assert!(parser.context().is_empty());
    }
}
