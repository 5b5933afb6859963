//! Canonical source printer: AST back to Sythm text.
//!
//! One statement per line, blocks indented by two spaces. Parsing the output
//! yields the same tree (locations aside).

use std::fmt::Write;

use super::ast::{Node, NodeKind, Program};

const INDENT: &str = "  ";

/// Render a program as canonical Sythm source.
pub fn to_source(program: &Program) -> String {
    let mut out = String::new();
    for node in &program.body {
        write_statement(&mut out, node, 0);
    }
    out
}

fn write_statement(out: &mut String, node: &Node, depth: usize) {
    for _ in 0..depth {
        out.push_str(INDENT);
    }

    match &node.kind {
        NodeKind::Loop { iterations, body } => {
            let _ = write!(out, "loop {iterations} ");
            write_block(out, body, depth);
        }
        NodeKind::Track { name, body } => {
            let _ = write!(out, "track {name} ");
            write_block(out, body, depth);
        }
        NodeKind::Pattern { name, body } => {
            let _ = write!(out, "pattern {name} = ");
            write_block(out, body, depth);
        }
        other => out.push_str(&inline(other)),
    }
    out.push('\n');
}

fn write_block(out: &mut String, body: &[Node], depth: usize) {
    out.push_str("{\n");
    for node in body {
        write_statement(out, node, depth + 1);
    }
    for _ in 0..depth {
        out.push_str(INDENT);
    }
    out.push('}');
}

/// Single-line form of a statement. Block statements never reach here
/// from a group because the parser does not allow them there.
fn inline(kind: &NodeKind) -> String {
    match kind {
        NodeKind::Note { note, duration } => with_duration(note.clone(), *duration),
        NodeKind::Rest { duration } => with_duration("rest".to_string(), *duration),
        NodeKind::Slow => "slow".to_string(),
        NodeKind::Fast => "fast".to_string(),
        NodeKind::Comment { content } => format!("// {content}"),
        NodeKind::Chord { notes, duration } => {
            with_duration(format!("[{}]", notes.join(" ")), *duration)
        }
        NodeKind::Group { body, multiplier } => {
            let items: Vec<String> = body.iter().map(|n| inline(&n.kind)).collect();
            // `slow`, `fast` and instruments need a line break before `)`.
            let close = match body.last().map(|n| &n.kind) {
                Some(NodeKind::Slow | NodeKind::Fast | NodeKind::Instrument { .. }) => "\n)",
                _ => ")",
            };
            let mut text = format!("({}{close}", items.join(" "));
            if let Some(m) = multiplier {
                let _ = write!(text, " * {m}");
            }
            text
        }
        NodeKind::Instrument { name } => format!("@{name}"),
        NodeKind::PatternReference { name } => name.clone(),
        NodeKind::Loop { iterations, body } => {
            let items: Vec<String> = body.iter().map(|n| inline(&n.kind)).collect();
            format!("loop {iterations} {{ {} }}", items.join(" "))
        }
        NodeKind::Track { name, .. } | NodeKind::Pattern { name, .. } => name.clone(),
    }
}

fn with_duration(mut text: String, duration: Option<f64>) -> String {
    if let Some(d) = duration {
        let _ = write!(text, " {}", format_number(d));
    }
    text
}

/// Shortest decimal form the lexer reads back as the same value.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value}")
    }
}
