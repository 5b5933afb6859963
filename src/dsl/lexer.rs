//! Lexer for the Sythm language.
//!
//! Converts source text into a stream of [`Token`]s. The lexer never fails:
//! characters it does not recognise become [`TokenKind::Unknown`] tokens and
//! the parser decides how to report them. The stream always ends with EOF.

use super::note::has_note_shape;
use super::token::{Token, TokenKind};

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, "", self.line, self.col));
                break;
            }

            let ch = self.peek();

            if ch == '\n' {
                tokens.push(Token::new(TokenKind::Newline, "\n", self.line, self.col));
                self.advance();
                self.line += 1;
                self.col = 1;
                continue;
            }

            let token = match ch {
                '(' => self.single_char(TokenKind::LParen),
                ')' => self.single_char(TokenKind::RParen),
                '[' => self.single_char(TokenKind::LBracket),
                ']' => self.single_char(TokenKind::RBracket),
                '{' => self.single_char(TokenKind::LBrace),
                '}' => self.single_char(TokenKind::RBrace),
                '*' => self.single_char(TokenKind::Asterisk),
                '=' => self.single_char(TokenKind::Equals),
                '/' if self.peek_next() == Some('/') => self.lex_comment(),
                '@' => self.lex_instrument(),
                '0'..='9' => self.lex_number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(),
                _ => self.single_char(TokenKind::Unknown),
            };

            tokens.push(token);
        }

        tokens
    }

    fn peek(&self) -> char {
        self.chars[self.pos]
    }

    fn peek_next(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) -> char {
        let ch = self.chars[self.pos];
        self.pos += 1;
        if ch != '\n' {
            self.col += 1;
        }
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    fn check(&self, pred: impl Fn(char) -> bool) -> bool {
        !self.is_at_end() && pred(self.peek())
    }

    fn skip_whitespace(&mut self) {
        while self.check(|c| c == ' ' || c == '\t' || c == '\r') {
            self.advance();
        }
    }

    fn single_char(&mut self, kind: TokenKind) -> Token {
        let line = self.line;
        let col = self.col;
        let ch = self.advance();
        Token::new(kind, ch.to_string(), line, col)
    }

    fn lex_comment(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        self.advance();
        self.advance();

        let mut body = String::new();
        while self.check(|c| c != '\n') {
            body.push(self.advance());
        }

        Token::new(TokenKind::Comment, body.trim(), line, col)
    }

    fn lex_instrument(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        self.advance();

        if !self.check(is_ident_char) {
            return Token::new(TokenKind::At, "@", line, col);
        }

        let mut text = String::from("@");
        while self.check(is_ident_char) {
            text.push(self.advance());
        }
        Token::new(TokenKind::Instrument, text, line, col)
    }

    fn lex_number(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        while self.check(|c| c.is_ascii_digit()) {
            text.push(self.advance());
        }

        // A fractional part needs at least one digit after the dot.
        if self.check(|c| c == '.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            text.push(self.advance());
            while self.check(|c| c.is_ascii_digit()) {
                text.push(self.advance());
            }
        }

        Token::new(TokenKind::Number, text, line, col)
    }

    /// Words cover notes (`C4`, `F#5`, `Bb3`), keywords and identifiers.
    fn lex_word(&mut self) -> Token {
        let line = self.line;
        let col = self.col;
        let mut text = String::new();

        while self.check(is_ident_char) {
            text.push(self.advance());
        }
        if self.check(|c| c == '#') {
            text.push(self.advance());
            while self.check(|c| c.is_ascii_digit()) {
                text.push(self.advance());
            }
        }

        let kind = if let Some(keyword) = TokenKind::keyword(&text.to_ascii_lowercase()) {
            keyword
        } else if has_note_shape(&text) {
            TokenKind::Note
        } else {
            TokenKind::Identifier
        };

        Token::new(kind, text, line, col)
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Convenience wrapper: tokenize a whole source string.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_empty_source() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn lex_notes() {
        let tokens = tokenize("C4 F#5 Bb3");
        assert_eq!(tokens.len(), 4);
        for (tok, text) in tokens.iter().zip(["C4", "F#5", "Bb3"]) {
            assert_eq!(tok.kind, TokenKind::Note);
            assert_eq!(tok.text, text);
        }
    }

    #[test]
    fn lex_note_with_duration() {
        assert_eq!(
            kinds("C4 0.5"),
            vec![TokenKind::Note, TokenKind::Number, TokenKind::Eof]
        );
        assert_eq!(tokenize("C4 0.5")[1].text, "0.5");
    }

    #[test]
    fn lex_keywords_case_insensitive() {
        assert_eq!(
            kinds("rest SLOW Fast loop TRACK pattern"),
            vec![
                TokenKind::Rest,
                TokenKind::Slow,
                TokenKind::Fast,
                TokenKind::Loop,
                TokenKind::Track,
                TokenKind::Pattern,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_identifier_vs_note() {
        assert_eq!(
            kinds("melody H4 c4 C"),
            vec![
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Identifier,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_note_shape_without_pitch_class() {
        // Rejected later by the frequency table, not by the lexer.
        assert_eq!(tokenize("E#4")[0].kind, TokenKind::Note);
    }

    #[test]
    fn lex_instrument_token() {
        let tokens = tokenize("@bass");
        assert_eq!(tokens[0].kind, TokenKind::Instrument);
        assert_eq!(tokens[0].text, "@bass");
    }

    #[test]
    fn lex_bare_at() {
        assert_eq!(kinds("@ bass")[0], TokenKind::At);
    }

    #[test]
    fn lex_comment_is_trimmed() {
        let tokens = tokenize("C4 //   intro riff  \nD4");
        assert_eq!(tokens[1].kind, TokenKind::Comment);
        assert_eq!(tokens[1].text, "intro riff");
        assert_eq!(tokens[2].kind, TokenKind::Newline);
        assert_eq!(tokens[3].kind, TokenKind::Note);
    }

    #[test]
    fn lex_symbols() {
        assert_eq!(
            kinds("( ) [ ] { } * ="),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Asterisk,
                TokenKind::Equals,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_unknown_characters_are_deferred() {
        assert_eq!(
            kinds("C4 $ /"),
            vec![
                TokenKind::Note,
                TokenKind::Unknown,
                TokenKind::Unknown,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn lex_trailing_dot_is_not_fraction() {
        assert_eq!(
            kinds("2."),
            vec![TokenKind::Number, TokenKind::Unknown, TokenKind::Eof]
        );
    }

    #[test]
    fn lex_tracks_line_and_column() {
        let tokens = tokenize("C4\n  D4");
        assert_eq!((tokens[0].line, tokens[0].col), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].col), (1, 3));
        assert_eq!((tokens[2].line, tokens[2].col), (2, 3));
    }

    #[test]
    fn lex_crlf_line_endings() {
        assert_eq!(
            kinds("C4\r\nD4"),
            vec![
                TokenKind::Note,
                TokenKind::Newline,
                TokenKind::Note,
                TokenKind::Eof
            ]
        );
    }
}
