//! Sythm language front end: source text → tokens → AST.

pub mod ast;
pub mod error;
pub mod format;
pub mod lexer;
pub mod note;
pub mod parser;
pub mod token;

pub use ast::*;
pub use error::ParseError;
pub use format::to_source;
pub use lexer::tokenize;
pub use note::{frequency, is_valid_note, NoteError};
pub use token::{Token, TokenKind};

use parser::Parser;

/// Tokenize and parse Sythm source into a [`Program`].
pub fn parse_source(source: &str) -> Result<Program, ParseError> {
    Parser::new(tokenize(source)).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_source_end_to_end() {
        let program = parse_source("@bass\nC2 2\n").unwrap();
        assert_eq!(program.body.len(), 2);
        assert!(!program.is_multitrack());
    }

    #[test]
    fn parse_source_reports_location() {
        let err = parse_source("C4\n[]").unwrap_err();
        assert_eq!(err.to_string(), "[2:1] Chord cannot be empty");
    }
}
