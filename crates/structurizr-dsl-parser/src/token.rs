//! Token kinds and the `Token` type produced by the lexer.

use logos::Logos;

/// The closed set of token kinds recognised by the DSL, per the language
/// reference: structural punctuation, literals, and keywords. Keyword
/// variants are matched case-sensitively before generic identifier
/// classification — every keyword token is given a higher lexing priority
/// than [`TokenKind::Identifier`] so `"container"` never lexes as a plain
/// identifier.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[logos(skip r"[ \t\r\n]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"#[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum TokenKind {
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("=")]
    Equals,
    #[token("->")]
    Arrow,
    #[token("*")]
    Star,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token("!")]
    Bang,

    /// A complete, well-formed `"..."` literal (escapes not yet interpreted;
    /// see [`crate::lexer::unescape`]).
    #[regex(r#""([^"\\\n]|\\.)*""#, priority = 20)]
    StringLiteral,

    #[regex(r"-?[0-9]+", priority = 15)]
    Number,

    // Keywords. Priority is set above Identifier's so an exact keyword
    // spelling always wins the tie against the generic identifier regex.
    #[token("workspace", priority = 10)]
    KwWorkspace,
    #[token("model", priority = 10)]
    KwModel,
    #[token("person", priority = 10)]
    KwPerson,
    #[token("softwareSystem", priority = 10)]
    KwSoftwareSystem,
    #[token("container", priority = 10)]
    KwContainer,
    #[token("component", priority = 10)]
    KwComponent,
    #[token("deploymentEnvironment", priority = 10)]
    KwDeploymentEnvironment,
    #[token("deploymentNode", priority = 10)]
    KwDeploymentNode,
    #[token("infrastructureNode", priority = 10)]
    KwInfrastructureNode,
    #[token("containerInstance", priority = 10)]
    KwContainerInstance,
    #[token("group", priority = 10)]
    KwGroup,
    #[token("enterprise", priority = 10)]
    KwEnterprise,
    #[token("views", priority = 10)]
    KwViews,
    #[token("systemLandscape", priority = 10)]
    KwSystemLandscape,
    #[token("systemContext", priority = 10)]
    KwSystemContext,
    #[token("containerView", priority = 10)]
    KwContainerView,
    #[token("componentView", priority = 10)]
    KwComponentView,
    #[token("dynamic", priority = 10)]
    KwDynamic,
    #[token("deployment", priority = 10)]
    KwDeployment,
    #[token("filtered", priority = 10)]
    KwFiltered,
    #[token("custom", priority = 10)]
    KwCustom,
    #[token("image", priority = 10)]
    KwImage,
    #[token("styles", priority = 10)]
    KwStyles,
    #[token("element", priority = 10)]
    KwElement,
    #[token("relationship", priority = 10)]
    KwRelationship,
    #[token("themes", priority = 10)]
    KwThemes,
    #[token("branding", priority = 10)]
    KwBranding,
    #[token("terminology", priority = 10)]
    KwTerminology,
    #[token("configuration", priority = 10)]
    KwConfiguration,
    #[token("documentation", priority = 10)]
    KwDocumentation,
    #[token("decisions", priority = 10)]
    KwDecisions,
    #[token("include", priority = 10)]
    KwInclude,
    #[token("exclude", priority = 10)]
    KwExclude,
    #[token("autoLayout", priority = 10)]
    KwAutoLayout,
    #[token("animation", priority = 10)]
    KwAnimation,
    #[token("baseOn", priority = 10)]
    KwBaseOn,
    #[token("this", priority = 10)]
    KwThis,
    #[token("identifiers", priority = 10)]
    KwIdentifiers,

    // Relationship verbs (implicit relationship syntax). `consists` and `of`
    // are separate tokens so the two-word verb `consists of` can be matched
    // greedily by the relationship parser.
    #[token("uses", priority = 10)]
    VerbUses,
    #[token("delivers", priority = 10)]
    VerbDelivers,
    #[token("influences", priority = 10)]
    VerbInfluences,
    #[token("consists", priority = 10)]
    VerbConsists,
    #[token("of", priority = 10)]
    VerbOf,
    #[token("calls", priority = 10)]
    VerbCalls,
    #[token("sends", priority = 10)]
    VerbSends,
    #[token("receives", priority = 10)]
    VerbReceives,
    #[token("reads", priority = 10)]
    VerbReads,
    #[token("writes", priority = 10)]
    VerbWrites,
    #[token("follows", priority = 10)]
    VerbFollows,
    #[token("manages", priority = 10)]
    VerbManages,
    #[token("serves", priority = 10)]
    VerbServes,
    #[token("subscribes", priority = 10)]
    VerbSubscribes,
    #[token("depends", priority = 10)]
    VerbDepends,
    #[token("extends", priority = 10)]
    VerbExtends,

    #[regex(r"[A-Za-z_][A-Za-z0-9_\-]*(\.[A-Za-z0-9_\-]+)*", priority = 1)]
    Identifier,

    /// A run of bytes the lexer could not classify, coalesced into a single
    /// token so malformed input does not produce one diagnostic per byte.
    Garbage,
    /// An opening quote with no closing quote before end of line.
    UnterminatedString,

    Eof,
}

impl TokenKind {
    /// `true` for any of the 21 relationship-verb tokens (`uses`,
    /// `delivers`, ..., `consists`/`of`).
    pub fn is_relationship_verb(self) -> bool {
        matches!(
            self,
            TokenKind::VerbUses
                | TokenKind::VerbDelivers
                | TokenKind::VerbInfluences
                | TokenKind::VerbConsists
                | TokenKind::VerbOf
                | TokenKind::VerbCalls
                | TokenKind::VerbSends
                | TokenKind::VerbReceives
                | TokenKind::VerbReads
                | TokenKind::VerbWrites
                | TokenKind::VerbFollows
                | TokenKind::VerbManages
                | TokenKind::VerbServes
                | TokenKind::VerbSubscribes
                | TokenKind::VerbDepends
                | TokenKind::VerbExtends
        )
    }

    /// The verb's lexeme, used to build the two-word `"consists of"` and as
    /// the basis for the default, title-cased relationship description.
    pub fn verb_text(self) -> Option<&'static str> {
        Some(match self {
            TokenKind::VerbUses => "uses",
            TokenKind::VerbDelivers => "delivers",
            TokenKind::VerbInfluences => "influences",
            TokenKind::VerbConsists => "consists of",
            TokenKind::VerbCalls => "calls",
            TokenKind::VerbSends => "sends",
            TokenKind::VerbReceives => "receives",
            TokenKind::VerbReads => "reads",
            TokenKind::VerbWrites => "writes",
            TokenKind::VerbFollows => "follows",
            TokenKind::VerbManages => "manages",
            TokenKind::VerbServes => "serves",
            TokenKind::VerbSubscribes => "subscribes",
            TokenKind::VerbDepends => "depends",
            TokenKind::VerbExtends => "extends",
            _ => return None,
        })
    }
}

/// Literal value carried by a [`StringLiteral`](TokenKind::StringLiteral)
/// or [`Number`](TokenKind::Number) token, with escapes already interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(i64),
}

/// A lexed token: kind, byte span, optional literal value, and resolved
/// source position of its first byte.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: std::ops::Range<usize>,
    pub literal: Option<Literal>,
    pub position: structurizr_dsl_core::SourcePosition,
}

impl Token {
    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.clone()]
    }
}
