//! Recursive-descent parser for the Sythm language.
//!
//! Parses a token stream into a [`Program`]. The first error aborts the
//! parse: the parser resynchronises to the next statement boundary and then
//! reports the original error, discarding the partial tree.

use super::ast::*;
use super::error::ParseError;
use super::token::{Token, TokenKind};

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }
            body.push(self.parse_statement()?);
        }

        Ok(Program { body })
    }

    fn parse_statement(&mut self) -> Result<Node, ParseError> {
        let result = self.statement();
        if let Err(err) = &result {
            tracing::debug!(line = err.line, col = err.col, "parse error: {}", err.message);
            self.synchronize();
        }
        result
    }

    fn statement(&mut self) -> Result<Node, ParseError> {
        match self.peek().kind {
            TokenKind::Comment => self.parse_comment(),
            TokenKind::Pattern => self.parse_pattern(),
            TokenKind::Track => self.parse_track(),
            TokenKind::Slow => self.parse_tempo_change(),
            TokenKind::Fast => self.parse_tempo_change(),
            TokenKind::Rest => {
                let node = self.parse_rest()?;
                self.end_sequence_item()?;
                Ok(node)
            }
            TokenKind::Loop => self.parse_loop(),
            TokenKind::Instrument => self.parse_instrument(),
            TokenKind::LBracket => {
                let node = self.parse_chord()?;
                self.end_sequence_item()?;
                Ok(node)
            }
            TokenKind::LParen => {
                let node = self.parse_group()?;
                self.end_sequence_item()?;
                Ok(node)
            }
            TokenKind::Note => {
                let node = self.parse_note()?;
                self.end_sequence_item()?;
                Ok(node)
            }
            TokenKind::Identifier => self.parse_pattern_reference(),
            _ => {
                let t = self.peek();
                Err(ParseError::at(format!("Unexpected token: {}", t.text), t))
            }
        }
    }

    fn parse_comment(&mut self) -> Result<Node, ParseError> {
        let t = self.advance().clone();
        self.consume_terminator()?;
        Ok(Node::new(
            NodeKind::Comment { content: t.text },
            t.line,
            t.col,
        ))
    }

    /// `pattern name = { ... }`
    fn parse_pattern(&mut self) -> Result<Node, ParseError> {
        let keyword = self.advance().clone();
        let name = self.expect_identifier("Expected pattern name after \"pattern\"")?;
        self.expect(TokenKind::Equals, "Expected \"=\" after pattern name")?;
        self.expect(TokenKind::LBrace, "Expected \"{\" after pattern declaration")?;
        let body = self.parse_block("Expected \"}\" to close pattern")?;
        self.consume_terminator()?;

        Ok(Node::new(
            NodeKind::Pattern { name, body },
            keyword.line,
            keyword.col,
        ))
    }

    /// `track name { ... }`
    fn parse_track(&mut self) -> Result<Node, ParseError> {
        let keyword = self.advance().clone();
        let name = self.expect_identifier("Expected track name after \"track\"")?;
        self.expect(TokenKind::LBrace, "Expected \"{\" after track name")?;
        let body = self.parse_block("Expected \"}\" to close track")?;
        self.consume_terminator()?;

        Ok(Node::new(
            NodeKind::Track { name, body },
            keyword.line,
            keyword.col,
        ))
    }

    fn parse_tempo_change(&mut self) -> Result<Node, ParseError> {
        let t = self.advance().clone();
        let kind = if t.kind == TokenKind::Slow {
            NodeKind::Slow
        } else {
            NodeKind::Fast
        };
        self.consume_terminator()?;
        Ok(Node::new(kind, t.line, t.col))
    }

    fn parse_rest(&mut self) -> Result<Node, ParseError> {
        let t = self.advance().clone();
        let duration = self.optional_duration()?;
        Ok(Node::new(NodeKind::Rest { duration }, t.line, t.col))
    }

    /// `loop N { ... }` or the shorthand `loop N pattern`.
    fn parse_loop(&mut self) -> Result<Node, ParseError> {
        let keyword = self.advance().clone();

        if !self.check(TokenKind::Number) {
            return Err(ParseError::at(
                "Expected number after \"loop\"",
                self.peek(),
            ));
        }
        let count = self.advance().clone();
        let iterations = positive_integer(&count, "Loop count")?;

        let body = if self.check(TokenKind::LBrace) {
            self.advance();
            let body = self.parse_block("Expected \"}\" to close loop")?;
            self.consume_terminator()?;
            body
        } else if self.check(TokenKind::Identifier) {
            vec![self.parse_pattern_reference()?]
        } else {
            return Err(ParseError::at(
                "Expected \"{\" or pattern name after loop iterations",
                self.peek(),
            ));
        };

        Ok(Node::new(
            NodeKind::Loop { iterations, body },
            keyword.line,
            keyword.col,
        ))
    }

    fn parse_instrument(&mut self) -> Result<Node, ParseError> {
        let t = self.advance().clone();
        let name = t.text.trim_start_matches('@').to_string();
        self.consume_terminator()?;
        Ok(Node::new(NodeKind::Instrument { name }, t.line, t.col))
    }

    /// `[C4 E4 G4] 2`
    fn parse_chord(&mut self) -> Result<Node, ParseError> {
        let bracket = self.advance().clone();
        let mut notes = Vec::new();

        while !self.check(TokenKind::RBracket) && !self.is_at_end() {
            if !self.check(TokenKind::Note) {
                return Err(ParseError::at("Expected note in chord", self.peek()));
            }
            notes.push(self.advance().text.clone());
        }

        if notes.is_empty() {
            return Err(ParseError::at("Chord cannot be empty", &bracket));
        }
        self.expect(TokenKind::RBracket, "Expected \"]\" to close chord")?;
        let duration = self.optional_duration()?;

        Ok(Node::new(
            NodeKind::Chord { notes, duration },
            bracket.line,
            bracket.col,
        ))
    }

    /// `(C4 D4 [E4 G4]) * 2`
    fn parse_group(&mut self) -> Result<Node, ParseError> {
        let paren = self.advance().clone();
        let mut body = Vec::new();

        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }

            let element = match self.peek().kind {
                TokenKind::Note => self.parse_note()?,
                TokenKind::Rest => self.parse_rest()?,
                TokenKind::LBracket => self.parse_chord()?,
                TokenKind::Slow | TokenKind::Fast => self.parse_tempo_change()?,
                TokenKind::Instrument => self.parse_instrument()?,
                TokenKind::Identifier => self.parse_pattern_reference()?,
                _ => {
                    return Err(ParseError::at(
                        "Expected note, chord, rest, slow, fast, instrument, or pattern in group",
                        self.peek(),
                    ));
                }
            };
            body.push(element);
        }

        self.expect(TokenKind::RParen, "Expected \")\" to close group")?;
        if body.is_empty() {
            return Err(ParseError::at("Group cannot be empty", &paren));
        }

        let multiplier = if self.check(TokenKind::Asterisk) {
            self.advance();
            if !self.check(TokenKind::Number) {
                return Err(ParseError::at("Expected number after \"*\"", self.peek()));
            }
            let count = self.advance().clone();
            Some(positive_integer(&count, "Group multiplier")?)
        } else {
            None
        };

        Ok(Node::new(
            NodeKind::Group { body, multiplier },
            paren.line,
            paren.col,
        ))
    }

    fn parse_note(&mut self) -> Result<Node, ParseError> {
        let t = self.advance().clone();
        let duration = self.optional_duration()?;
        Ok(Node::new(
            NodeKind::Note {
                note: t.text,
                duration,
            },
            t.line,
            t.col,
        ))
    }

    fn parse_pattern_reference(&mut self) -> Result<Node, ParseError> {
        let t = self.advance().clone();
        self.end_sequence_item()?;
        Ok(Node::new(
            NodeKind::PatternReference { name: t.text },
            t.line,
            t.col,
        ))
    }

    /// Statements up to the closing `}`; the opening brace is already consumed.
    fn parse_block(&mut self, unclosed: &str) -> Result<Vec<Node>, ParseError> {
        let mut body = Vec::new();

        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if self.check(TokenKind::Newline) {
                self.advance();
                continue;
            }
            body.push(self.parse_statement()?);
        }

        self.expect(TokenKind::RBrace, unclosed)?;
        Ok(body)
    }

    fn optional_duration(&mut self) -> Result<Option<f64>, ParseError> {
        if !self.check(TokenKind::Number) {
            return Ok(None);
        }
        let t = self.advance();
        t.text
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ParseError::at(format!("Invalid duration: {}", t.text), t))
    }

    // --- Terminators ---

    /// Ends a statement: a newline is consumed; EOF or any token that starts
    /// a statement is accepted in place. A closing brace or parenthesis is
    /// not, so `slow`, `fast`, instruments and blocks need a line break
    /// before one.
    fn consume_terminator(&mut self) -> Result<(), ParseError> {
        let kind = self.peek().kind;
        if kind == TokenKind::Newline {
            self.advance();
            Ok(())
        } else if kind.starts_statement() {
            Ok(())
        } else {
            Err(ParseError::at("Expected newline or end of file", self.peek()))
        }
    }

    /// Notes, rests, chords, groups and references may be followed on the
    /// same line by tokens that continue a sequence. Those are left for the
    /// enclosing construct to accept or reject.
    fn end_sequence_item(&mut self) -> Result<(), ParseError> {
        match self.peek().kind {
            TokenKind::RParen
            | TokenKind::RBracket
            | TokenKind::RBrace
            | TokenKind::Asterisk
            | TokenKind::Number => Ok(()),
            _ => self.consume_terminator(),
        }
    }

    /// Skip ahead to a newline or a token that can begin a statement.
    fn synchronize(&mut self) {
        while !self.is_at_end() {
            let kind = self.peek().kind;
            if kind == TokenKind::Newline || kind.starts_statement() {
                return;
            }
            self.advance();
        }
    }

    // --- Utility methods ---

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> &Token {
        let idx = self.pos.min(self.tokens.len() - 1);
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        &self.tokens[idx]
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.tokens.len() || self.peek().kind == TokenKind::Eof
    }

    fn check(&self, kind: TokenKind) -> bool {
        !self.is_at_end() && self.peek().kind == kind
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<&Token, ParseError> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(ParseError::at(message, self.peek()))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<String, ParseError> {
        self.expect(TokenKind::Identifier, message)
            .map(|t| t.text.clone())
    }
}

/// Parse a NUMBER token as a repeat count of at least one.
fn positive_integer(token: &Token, what: &str) -> Result<u32, ParseError> {
    match token.text.parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ParseError::at(
            format!("{what} must be a positive integer, got {}", token.text),
            token,
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::lexer::tokenize;

    fn parse(src: &str) -> Result<Program, ParseError> {
        Parser::new(tokenize(src)).parse()
    }

    fn kinds(src: &str) -> Vec<NodeKind> {
        parse(src)
            .unwrap()
            .body
            .into_iter()
            .map(|n| n.kind)
            .collect()
    }

    fn note(name: &str, duration: Option<f64>) -> NodeKind {
        NodeKind::Note {
            note: name.to_string(),
            duration,
        }
    }

    #[test]
    fn parse_empty_program() {
        assert!(parse("").unwrap().body.is_empty());
        assert!(parse("\n\n\n").unwrap().body.is_empty());
    }

    #[test]
    fn parse_notes_with_and_without_duration() {
        assert_eq!(
            kinds("C4\nF#5 2\nBb3 0.5\n"),
            vec![
                note("C4", None),
                note("F#5", Some(2.0)),
                note("Bb3", Some(0.5))
            ]
        );
    }

    #[test]
    fn parse_consecutive_notes_on_one_line() {
        assert_eq!(
            kinds("C4 D4 E4 2"),
            vec![note("C4", None), note("D4", None), note("E4", Some(2.0))]
        );
    }

    #[test]
    fn parse_rest_slow_fast() {
        assert_eq!(
            kinds("rest\nrest 2\nslow\nfast"),
            vec![
                NodeKind::Rest { duration: None },
                NodeKind::Rest {
                    duration: Some(2.0)
                },
                NodeKind::Slow,
                NodeKind::Fast,
            ]
        );
    }

    #[test]
    fn parse_comment() {
        assert_eq!(
            kinds("// verse one\nC4"),
            vec![
                NodeKind::Comment {
                    content: "verse one".to_string()
                },
                note("C4", None)
            ]
        );
    }

    #[test]
    fn parse_instrument_strips_at() {
        assert_eq!(
            kinds("@bass\nC2 2\n"),
            vec![
                NodeKind::Instrument {
                    name: "bass".to_string()
                },
                note("C2", Some(2.0))
            ]
        );
    }

    #[test]
    fn parse_chord() {
        assert_eq!(
            kinds("[C4 E4 G4] 2"),
            vec![NodeKind::Chord {
                notes: vec!["C4".into(), "E4".into(), "G4".into()],
                duration: Some(2.0),
            }]
        );
    }

    #[test]
    fn parse_empty_chord_fails() {
        let err = parse("[]").unwrap_err();
        assert_eq!(err.message, "Chord cannot be empty");
        assert_eq!((err.line, err.col), (1, 1));
    }

    #[test]
    fn parse_chord_rejects_non_notes() {
        let err = parse("[C4 rest]").unwrap_err();
        assert_eq!(err.message, "Expected note in chord");
        assert_eq!(err.token.unwrap().kind, TokenKind::Rest);
    }

    #[test]
    fn parse_unclosed_chord() {
        let err = parse("[C4 E4").unwrap_err();
        assert_eq!(err.message, "Expected \"]\" to close chord");
    }

    #[test]
    fn parse_group_with_multiplier() {
        let program = parse("(C4 D4) * 2").unwrap();
        match &program.body[0].kind {
            NodeKind::Group { body, multiplier } => {
                assert_eq!(*multiplier, Some(2));
                assert_eq!(body.len(), 2);
                assert_eq!(body[1].kind, note("D4", None));
            }
            other => panic!("expected Group, got {other:?}"),
        }
    }

    #[test]
    fn parse_group_mixed_elements_across_lines() {
        let program = parse("(C4 0.5\n rest [E4 G4] slow @lead riff fast\n)").unwrap();
        match &program.body[0].kind {
            NodeKind::Group { body, multiplier } => {
                assert_eq!(*multiplier, None);
                assert_eq!(body.len(), 7);
                assert!(matches!(body[5].kind, NodeKind::PatternReference { .. }));
                assert_eq!(body[6].kind, NodeKind::Fast);
            }
            other => panic!("expected Group, got {other:?}"),
        }
    }

    #[test]
    fn parse_group_rejects_nested_group() {
        let err = parse("(C4 (D4))").unwrap_err();
        assert!(err.message.starts_with("Expected note, chord, rest"));
        assert_eq!(err.col, 5);
    }

    #[test]
    fn parse_group_rejects_nested_loop() {
        let err = parse("(C4 loop 2 { D4 })").unwrap_err();
        assert!(err.message.starts_with("Expected note, chord, rest"));
        assert_eq!(err.token.unwrap().kind, TokenKind::Loop);
    }

    #[test]
    fn parse_group_missing_multiplier_number() {
        let err = parse("(C4) * x").unwrap_err();
        assert_eq!(err.message, "Expected number after \"*\"");
    }

    #[test]
    fn parse_empty_group_fails() {
        assert_eq!(parse("()").unwrap_err().message, "Group cannot be empty");
    }

    #[test]
    fn parse_loop_block() {
        let program = parse("loop 3 {\n  C4\n  D4 0.5\n}\n").unwrap();
        match &program.body[0].kind {
            NodeKind::Loop { iterations, body } => {
                assert_eq!(*iterations, 3);
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected Loop, got {other:?}"),
        }
    }

    #[test]
    fn parse_loop_single_line_block() {
        let program = parse("loop 3 { C4 }").unwrap();
        assert_eq!(program.body.len(), 1);
        assert_eq!(program.body[0].children().len(), 1);
    }

    #[test]
    fn parse_nested_loops() {
        let program = parse("loop 2 {\n loop 3 { C4 }\n}").unwrap();
        let inner = &program.body[0].children()[0];
        assert!(matches!(inner.kind, NodeKind::Loop { iterations: 3, .. }));
    }

    #[test]
    fn parse_loop_pattern_shorthand() {
        let program = parse("loop 4 riff\nC4").unwrap();
        assert_eq!(program.body.len(), 2);
        match &program.body[0].kind {
            NodeKind::Loop { iterations, body } => {
                assert_eq!(*iterations, 4);
                assert_eq!(
                    body[0].kind,
                    NodeKind::PatternReference {
                        name: "riff".to_string()
                    }
                );
            }
            other => panic!("expected Loop, got {other:?}"),
        }
    }

    #[test]
    fn parse_loop_errors() {
        assert_eq!(
            parse("loop {").unwrap_err().message,
            "Expected number after \"loop\""
        );
        assert_eq!(
            parse("loop 2 C4").unwrap_err().message,
            "Expected \"{\" or pattern name after loop iterations"
        );
        assert_eq!(
            parse("loop 2 { C4").unwrap_err().message,
            "Expected \"}\" to close loop"
        );
        assert!(parse("loop 0 { C4 }")
            .unwrap_err()
            .message
            .starts_with("Loop count must be a positive integer"));
        assert!(parse("loop 1.5 { C4 }").is_err());
    }

    #[test]
    fn parse_pattern_definition() {
        let program = parse("pattern p = { C4 D4 }\n").unwrap();
        match &program.body[0].kind {
            NodeKind::Pattern { name, body } => {
                assert_eq!(name, "p");
                assert_eq!(body.len(), 2);
            }
            other => panic!("expected Pattern, got {other:?}"),
        }
    }

    #[test]
    fn parse_pattern_errors() {
        assert_eq!(
            parse("pattern = {").unwrap_err().message,
            "Expected pattern name after \"pattern\""
        );
        assert_eq!(
            parse("pattern p { C4 }").unwrap_err().message,
            "Expected \"=\" after pattern name"
        );
        assert_eq!(
            parse("pattern p = C4").unwrap_err().message,
            "Expected \"{\" after pattern declaration"
        );
        assert_eq!(
            parse("pattern p = { C4").unwrap_err().message,
            "Expected \"}\" to close pattern"
        );
    }

    #[test]
    fn parse_track_with_nested_blocks() {
        let src = "track t { @lead\nloop 2 p }\n";
        let program = parse(src).unwrap();
        match &program.body[0].kind {
            NodeKind::Track { name, body } => {
                assert_eq!(name, "t");
                assert_eq!(
                    body[0].kind,
                    NodeKind::Instrument {
                        name: "lead".to_string()
                    }
                );
                assert!(matches!(body[1].kind, NodeKind::Loop { iterations: 2, .. }));
            }
            other => panic!("expected Track, got {other:?}"),
        }
    }

    #[test]
    fn parse_block_closing_after_loop_block() {
        let program = parse("track t {\n loop 2 { C4 }\n}").unwrap();
        assert_eq!(program.body[0].children().len(), 1);
    }

    #[test]
    fn closing_delimiter_does_not_end_a_statement() {
        for src in [
            "track t { slow }",
            "(C4 fast)",
            "pattern p = { @lead }",
            "track t {\n loop 2 { C4 } }",
        ] {
            let err = parse(src).unwrap_err();
            assert_eq!(err.message, "Expected newline or end of file", "{src}");
        }
    }

    #[test]
    fn sequence_items_may_close_a_block() {
        assert!(parse("track t { C4 rest [E4 G4] riff }").is_ok());
        assert!(parse("(C4 D4 2)").is_ok());
    }

    #[test]
    fn parse_track_errors() {
        assert_eq!(
            parse("track { }").unwrap_err().message,
            "Expected track name after \"track\""
        );
        assert_eq!(
            parse("track t C4").unwrap_err().message,
            "Expected \"{\" after track name"
        );
        assert_eq!(
            parse("track t {\nC4\n").unwrap_err().message,
            "Expected \"}\" to close track"
        );
    }

    #[test]
    fn parse_unexpected_token() {
        let err = parse("C4\n$").unwrap_err();
        assert_eq!(err.message, "Unexpected token: $");
        assert_eq!((err.line, err.col), (2, 1));
    }

    #[test]
    fn parse_stray_number_after_note() {
        let err = parse("C4 2 3").unwrap_err();
        assert_eq!(err.message, "Unexpected token: 3");
    }

    #[test]
    fn parse_slow_followed_by_garbage() {
        let err = parse("slow 2").unwrap_err();
        assert_eq!(err.message, "Expected newline or end of file");
    }

    #[test]
    fn parse_error_discards_partial_tree() {
        // The second line is valid but never reached: the first error wins.
        let err = parse("C4 ]\nD4").unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn parse_records_locations() {
        let program = parse("C4\n  loop 2 { D4 }").unwrap();
        assert_eq!(program.body[0].loc, Some(Location { line: 1, col: 1 }));
        assert_eq!(program.body[1].loc, Some(Location { line: 2, col: 3 }));
        assert_eq!(
            program.body[1].children()[0].loc,
            Some(Location { line: 2, col: 12 })
        );
    }
}
