//! Error type for the Sythm parser.
//!
//! The lexer never fails, so parsing is the only stage that reports errors
//! before execution.

use thiserror::Error;

use super::token::Token;

/// A malformed-source error, tagged with the offending token.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("[{line}:{col}] {message}")]
pub struct ParseError {
    pub message: String,
    pub line: usize,
    pub col: usize,
    pub token: Option<Token>,
}

impl ParseError {
    /// Error located at `token`.
    pub fn at(message: impl Into<String>, token: &Token) -> Self {
        Self {
            message: message.into(),
            line: token.line,
            col: token.col,
            token: Some(token.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::token::TokenKind;

    #[test]
    fn display_points_at_location() {
        let tok = Token::new(TokenKind::RBracket, "]", 3, 7);
        let err = ParseError::at("Chord cannot be empty", &tok);
        assert_eq!(err.to_string(), "[3:7] Chord cannot be empty");
        assert_eq!(err.token.unwrap().kind, TokenKind::RBracket);
    }
}
