//! Token types for the Sythm lexer.

use std::fmt;

/// A token produced by the lexer.
///
/// `text` is the raw lexeme, except for comments (trimmed body without the
/// leading `//`) and instruments (the full `@name` spelling).
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub col: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize, col: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
            col,
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Literals
    Note,
    Number,
    Identifier,
    Instrument,

    // Keywords
    Rest,
    Slow,
    Fast,
    Loop,
    Track,
    Pattern,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Asterisk,
    At,
    Equals,

    // Special
    Newline,
    Comment,
    Eof,
    Unknown,
}

impl TokenKind {
    /// Whether a token of this kind may open a statement.
    ///
    /// This is the set the parser's implicit terminator accepts after a
    /// statement that is not followed by a newline.
    pub fn starts_statement(self) -> bool {
        matches!(
            self,
            TokenKind::Note
                | TokenKind::Rest
                | TokenKind::Slow
                | TokenKind::Fast
                | TokenKind::Loop
                | TokenKind::Track
                | TokenKind::Pattern
                | TokenKind::LBracket
                | TokenKind::LParen
                | TokenKind::Comment
                | TokenKind::Instrument
                | TokenKind::Identifier
                | TokenKind::Eof
        )
    }

    /// Map a lowercase word to its keyword kind.
    pub fn keyword(word: &str) -> Option<TokenKind> {
        match word {
            "rest" => Some(TokenKind::Rest),
            "slow" => Some(TokenKind::Slow),
            "fast" => Some(TokenKind::Fast),
            "loop" => Some(TokenKind::Loop),
            "track" => Some(TokenKind::Track),
            "pattern" => Some(TokenKind::Pattern),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Note => "NOTE",
            TokenKind::Number => "NUMBER",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Instrument => "INSTRUMENT",
            TokenKind::Rest => "REST",
            TokenKind::Slow => "SLOW",
            TokenKind::Fast => "FAST",
            TokenKind::Loop => "LOOP",
            TokenKind::Track => "TRACK",
            TokenKind::Pattern => "PATTERN",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::LBracket => "LBRACKET",
            TokenKind::RBracket => "RBRACKET",
            TokenKind::LBrace => "LBRACE",
            TokenKind::RBrace => "RBRACE",
            TokenKind::Asterisk => "ASTERISK",
            TokenKind::At => "AT",
            TokenKind::Equals => "EQUALS",
            TokenKind::Newline => "NEWLINE",
            TokenKind::Comment => "COMMENT",
            TokenKind::Eof => "EOF",
            TokenKind::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}
