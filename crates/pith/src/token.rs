//! Token definitions shared by the lexer and the parser.

use strum::{Display, EnumString, IntoStaticStr};

/// Reserved words of the language, including the built-in type names.
///
/// The string form of each variant is its source spelling, so keyword
/// classification in the lexer is a single `Keyword::from_str` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Keyword {
    Print,
    Define,
    Return,
    If,
    Else,
    Elif,
    While,
    For,
    Foreach,
    In,
    Do,
    Switch,
    Case,
    Default,
    Break,
    Continue,
    Pass,
    True,
    False,
    And,
    Or,
    Import,
    Class,
    New,
    Extends,
    // Built-in type names double as declaration keywords.
    Int,
    #[strum(serialize = "string")]
    Str,
    Float,
    Bool,
    Void,
    List,
    Map,
}

impl Keyword {
    /// Whether this keyword starts an explicitly typed variable declaration.
    ///
    /// `void` is deliberately absent: `void x` is not a declaration form.
    pub(crate) fn starts_declaration(self) -> bool {
        matches!(
            self,
            Self::Int | Self::Str | Self::Float | Self::Bool | Self::List | Self::Map
        )
    }
}

/// Kind (and payload, for textual tokens) of a single token.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    Ident(String),
    IntLit(String),
    FloatLit(String),
    StrLit(String),
    Kw(Keyword),
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Colon,
    Comma,
    Semicolon,
    Dot,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Bang,
    Gt,
    Lt,
    Ge,
    Le,
    EqEq,
    Ne,
    Assign,
    // Layout tokens synthesised from whitespace.
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Short human-readable name for diagnostics.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Self::Ident(_) => "identifier",
            Self::IntLit(_) => "integer literal",
            Self::FloatLit(_) => "float literal",
            Self::StrLit(_) => "string literal",
            Self::Kw(kw) => kw.into(),
            Self::LParen => "'('",
            Self::RParen => "')'",
            Self::LBracket => "'['",
            Self::RBracket => "']'",
            Self::LBrace => "'{'",
            Self::RBrace => "'}'",
            Self::Colon => "':'",
            Self::Comma => "','",
            Self::Semicolon => "';'",
            Self::Dot => "'.'",
            Self::Plus => "'+'",
            Self::Minus => "'-'",
            Self::Star => "'*'",
            Self::Slash => "'/'",
            Self::Percent => "'%'",
            Self::Caret => "'^'",
            Self::Bang => "'!'",
            Self::Gt => "'>'",
            Self::Lt => "'<'",
            Self::Ge => "'>='",
            Self::Le => "'<='",
            Self::EqEq => "'=='",
            Self::Ne => "'!='",
            Self::Assign => "'='",
            Self::Newline => "newline",
            Self::Indent => "indent",
            Self::Dedent => "dedent",
            Self::Eof => "end of input",
        }
    }
}

/// A token with its source line for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub(crate) fn new(kind: TokenKind, line: usize) -> Self {
        Self { kind, line }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn keyword_spelling_roundtrip() {
        assert_eq!(Keyword::from_str("string"), Ok(Keyword::Str));
        assert_eq!(Keyword::from_str("foreach"), Ok(Keyword::Foreach));
        assert_eq!(Keyword::Str.to_string(), "string");
        assert!(Keyword::from_str("banana").is_err());
    }

    #[test]
    fn declaration_starters() {
        assert!(Keyword::Map.starts_declaration());
        assert!(!Keyword::Void.starts_declaration());
        assert!(!Keyword::Define.starts_declaration());
    }
}
