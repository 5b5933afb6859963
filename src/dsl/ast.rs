//! Abstract Syntax Tree for the Sythm language.
//!
//! Every statement is a [`Node`]: a closed [`NodeKind`] plus the source
//! location it was parsed from. Nodes are immutable once parsed.

/// Duration in beats used when a note, chord or rest omits one.
pub const DEFAULT_DURATION: f64 = 1.0;

/// Source position of a node (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

/// A complete Sythm program.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub body: Vec<Node>,
}

/// A single statement with its source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub loc: Option<Location>,
}

/// Statement shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Note {
        note: String,
        duration: Option<f64>,
    },
    Rest {
        duration: Option<f64>,
    },
    Slow,
    Fast,
    Comment {
        content: String,
    },
    /// Always holds at least one note.
    Chord {
        notes: Vec<String>,
        duration: Option<f64>,
    },
    /// `loop N p` is stored as a body holding a single pattern reference.
    Loop {
        iterations: u32,
        body: Vec<Node>,
    },
    /// Body elements are restricted to notes, rests, chords, slow, fast,
    /// instruments and pattern references.
    Group {
        body: Vec<Node>,
        multiplier: Option<u32>,
    },
    Instrument {
        name: String,
    },
    Track {
        name: String,
        body: Vec<Node>,
    },
    Pattern {
        name: String,
        body: Vec<Node>,
    },
    PatternReference {
        name: String,
    },
}

impl Node {
    pub fn new(kind: NodeKind, line: usize, col: usize) -> Self {
        Self {
            kind,
            loc: Some(Location { line, col }),
        }
    }

    /// A node with no source location (built programmatically).
    pub fn bare(kind: NodeKind) -> Self {
        Self { kind, loc: None }
    }

    /// Nested statements of block-like nodes.
    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Loop { body, .. }
            | NodeKind::Group { body, .. }
            | NodeKind::Track { body, .. }
            | NodeKind::Pattern { body, .. } => body,
            _ => &[],
        }
    }

    /// Copy of this node with every location cleared, recursively.
    pub fn without_locations(&self) -> Node {
        let strip =
            |body: &[Node]| -> Vec<Node> { body.iter().map(Node::without_locations).collect() };
        let kind = match &self.kind {
            NodeKind::Loop { iterations, body } => NodeKind::Loop {
                iterations: *iterations,
                body: strip(body),
            },
            NodeKind::Group { body, multiplier } => NodeKind::Group {
                body: strip(body),
                multiplier: *multiplier,
            },
            NodeKind::Track { name, body } => NodeKind::Track {
                name: name.clone(),
                body: strip(body),
            },
            NodeKind::Pattern { name, body } => NodeKind::Pattern {
                name: name.clone(),
                body: strip(body),
            },
            other => other.clone(),
        };
        Node::bare(kind)
    }
}

impl Program {
    /// Whether any top-level statement is a track definition.
    pub fn is_multitrack(&self) -> bool {
        self.body
            .iter()
            .any(|n| matches!(n.kind, NodeKind::Track { .. }))
    }

    /// Copy of this program with every location cleared.
    pub fn without_locations(&self) -> Program {
        Program {
            body: self.body.iter().map(Node::without_locations).collect(),
        }
    }
}

/// Beats for an optional duration, falling back to [`DEFAULT_DURATION`].
pub fn beats(duration: Option<f64>) -> f64 {
    duration.unwrap_or(DEFAULT_DURATION)
}

/// Length in beats of a statement list.
///
/// Notes, chords and rests contribute their duration; loops and groups
/// multiply their body by the repeat count. Pattern references resolve
/// through `resolve` and count as zero when it returns `None`.
pub fn duration_beats(body: &[Node], resolve: &dyn Fn(&str) -> Option<f64>) -> f64 {
    body.iter()
        .map(|node| match &node.kind {
            NodeKind::Note { duration, .. }
            | NodeKind::Rest { duration }
            | NodeKind::Chord { duration, .. } => beats(*duration),
            NodeKind::Loop { iterations, body } => {
                *iterations as f64 * duration_beats(body, resolve)
            }
            NodeKind::Group { body, multiplier } => {
                multiplier.unwrap_or(1) as f64 * duration_beats(body, resolve)
            }
            NodeKind::PatternReference { name } => resolve(name).unwrap_or(0.0),
            NodeKind::Slow
            | NodeKind::Fast
            | NodeKind::Comment { .. }
            | NodeKind::Instrument { .. }
            | NodeKind::Track { .. }
            | NodeKind::Pattern { .. } => 0.0,
        })
        .sum()
}
