//! Lexer for the Structurizr DSL.
//!
//! Produces a finite, `Eof`-terminated token sequence from a UTF-8 source
//! string. The lexer never panics and never returns a `Result`: unterminated
//! strings and unrecognised bytes are reported as diagnostics and scanning
//! continues, per the language reference's failure semantics.
//!
//! Consecutive unrecognised bytes are coalesced into a single `Garbage`
//! token rather than producing one diagnostic per byte, the same way a
//! tokenizer built on `logos` typically handles lexer errors.

use logos::Logos;

use structurizr_dsl_core::{Diagnostics, LineIndex};

use crate::token::{Literal, Token, TokenKind};

/// Tokenizes `source`, reporting lexical errors into `diagnostics`.
pub fn lex(source: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let index = LineIndex::new(source);
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(source);
    let mut error_start: Option<usize> = None;

    while let Some(result) = lexer.next() {
        match result {
            Ok(kind) => {
                if let Some(start) = error_start.take() {
                    push_garbage(&mut tokens, diagnostics, source, &index, start, lexer.span().start);
                }
                push_token(&mut tokens, source, &index, kind, lexer.span());
            }
            Err(()) => {
                let span = lexer.span();
                if error_start.is_none() && source.as_bytes().get(span.start) == Some(&b'"') {
                    let line_end = source[span.start..]
                        .find('\n')
                        .map(|i| span.start + i)
                        .unwrap_or(source.len());
                    let position = index.position(span.start as u32);
                    diagnostics
                        .error("Unterminated string literal")
                        .at(position)
                        .snippet(index.snippet(source, position))
                        .emit();
                    tokens.push(Token {
                        kind: TokenKind::UnterminatedString,
                        span: span.start..line_end,
                        literal: None,
                        position,
                    });
                    let remaining = line_end.saturating_sub(span.end);
                    if remaining > 0 {
                        lexer.bump(remaining);
                    }
                } else if error_start.is_none() {
                    error_start = Some(span.start);
                }
            }
        }
    }

    if let Some(start) = error_start.take() {
        push_garbage(&mut tokens, diagnostics, source, &index, start, source.len());
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        span: source.len()..source.len(),
        literal: None,
        position: index.position(source.len() as u32),
    });

    tokens
}

fn push_token(
    tokens: &mut Vec<Token>,
    source: &str,
    index: &LineIndex,
    kind: TokenKind,
    span: std::ops::Range<usize>,
) {
    let position = index.position(span.start as u32);
    let literal = match kind {
        TokenKind::StringLiteral => {
            let text = &source[span.clone()];
            let content = &text[1..text.len() - 1];
            Some(Literal::String(unescape(content)))
        }
        TokenKind::Number => {
            let text = &source[span.clone()];
            text.parse::<i64>().ok().map(Literal::Number)
        }
        _ => None,
    };
    tokens.push(Token {
        kind,
        span,
        literal,
        position,
    });
}

fn push_garbage(
    tokens: &mut Vec<Token>,
    diagnostics: &mut Diagnostics,
    source: &str,
    index: &LineIndex,
    start: usize,
    end: usize,
) {
    let position = index.position(start as u32);
    diagnostics
        .error(format!("Unexpected character(s): {:?}", &source[start..end]))
        .at(position)
        .snippet(index.snippet(source, position))
        .emit();
    tokens.push(Token {
        kind: TokenKind::Garbage,
        span: start..end,
        literal: None,
        position,
    });
}

/// Interprets `\n`, `\t`, `\"`, `\\` escapes; every other byte (including
/// multi-byte Unicode sequences) passes through verbatim.
pub fn unescape(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use structurizr_dsl_core::Diagnostics;

    fn lex_ok(source: &str) -> Vec<Token> {
        let mut diagnostics = Diagnostics::default();
        let tokens = lex(source, &mut diagnostics);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {:?}", diagnostics.all());
        tokens
    }

    #[test]
    fn lexes_structural_tokens() {
        let tokens = lex_ok("{ } = -> * , ; !");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Equals,
                TokenKind::Arrow,
                TokenKind::Star,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_wins_over_identifier() {
        let tokens = lex_ok("container");
        assert_eq!(tokens[0].kind, TokenKind::KwContainer);
    }

    #[test]
    fn identifier_allows_dots_but_not_trailing_dot() {
        let tokens = lex_ok("a.b.c");
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].span, 0..5);
    }

    #[test]
    fn string_literal_strips_quotes_and_unescapes() {
        let mut diagnostics = Diagnostics::default();
        let tokens = lex(r#""hello\nworld""#, &mut diagnostics);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("hello\nworld".to_string()))
        );
    }

    #[test]
    fn unicode_passes_through_verbatim() {
        let mut diagnostics = Diagnostics::default();
        let tokens = lex(r#""héllo wörld 日本語""#, &mut diagnostics);
        assert_eq!(
            tokens[0].literal,
            Some(Literal::String("héllo wörld 日本語".to_string()))
        );
    }

    #[test]
    fn unterminated_string_recovers_at_next_line() {
        let mut diagnostics = Diagnostics::default();
        let tokens = lex("\"oops\nperson \"ok\"", &mut diagnostics);
        assert!(diagnostics.has_errors());
        assert_eq!(tokens[0].kind, TokenKind::UnterminatedString);
        assert_eq!(tokens[1].kind, TokenKind::KwPerson);
        assert_eq!(tokens[2].kind, TokenKind::StringLiteral);
    }

    #[test]
    fn unexpected_characters_coalesce_into_one_garbage_token() {
        let mut diagnostics = Diagnostics::default();
        let tokens = lex("@@@ person", &mut diagnostics);
        assert_eq!(diagnostics.count(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Garbage);
        assert_eq!(tokens[0].span, 0..3);
        assert_eq!(tokens[1].kind, TokenKind::KwPerson);
    }

    #[test]
    fn negative_number_literal() {
        let tokens = lex_ok("-150");
        assert_eq!(tokens[0].kind, TokenKind::Number);
        assert_eq!(tokens[0].literal, Some(Literal::Number(-150)));
    }

    #[test]
    fn line_comment_and_block_comment_are_skipped() {
        let tokens = lex_ok("// comment\nperson /* block */ \"x\"");
        let kinds: Vec<_> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::KwPerson, TokenKind::StringLiteral, TokenKind::Eof]
        );
    }

    #[test]
    fn very_long_identifier_parses_unchanged() {
        let long_name = "a".repeat(10_000);
        let tokens = lex_ok(&long_name);
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].span.len(), 10_000);
    }
}
