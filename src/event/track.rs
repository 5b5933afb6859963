//! Track flattening: AST subtrees into linear, beat-stamped event lists.
//!
//! Patterns are collected once per program into a [`PatternTable`]. The
//! [`TrackManager`] walks each track body with a beat cursor, replaying loops
//! and groups and splicing in pattern events (flattened once, then shifted to
//! the cursor). Unknown or self-referencing patterns are logged and skipped so
//! one bad reference does not cost the whole track.

use std::cell::RefCell;
use std::collections::HashMap;

use super::beat::Beat;
use super::types::{TrackEvent, TrackEventKind, TrackId};
use crate::dsl::{beats, duration_beats, Location, Node, NodeKind, Program};
use crate::error::{Located, RuntimeError};
use crate::instrument::InstrumentKind;

/// Upper bound of a track's volume.
pub const MAX_TRACK_VOLUME: f64 = 1.5;

/// A named pattern and its length.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternDefinition {
    pub name: String,
    pub body: Vec<Node>,
    pub duration_beats: f64,
}

/// Every pattern defined anywhere in a program, by name.
#[derive(Debug, Clone, Default)]
pub struct PatternTable {
    patterns: HashMap<String, PatternDefinition>,
}

impl PatternTable {
    /// Collect pattern definitions from the whole program, including ones
    /// nested inside tracks and loops. A later definition replaces an
    /// earlier one with the same name.
    pub fn collect(program: &Program) -> Self {
        let mut bodies: HashMap<String, Vec<Node>> = HashMap::new();
        collect_bodies(&program.body, &mut bodies);

        let visiting = RefCell::new(Vec::new());
        let patterns = bodies
            .iter()
            .map(|(name, body)| {
                let duration_beats = pattern_beats(name, &bodies, &visiting).unwrap_or(0.0);
                let definition = PatternDefinition {
                    name: name.clone(),
                    body: body.clone(),
                    duration_beats,
                };
                (name.clone(), definition)
            })
            .collect();
        Self { patterns }
    }

    pub fn get(&self, name: &str) -> Option<&PatternDefinition> {
        self.patterns.get(name)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Pattern names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.patterns.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn collect_bodies(body: &[Node], out: &mut HashMap<String, Vec<Node>>) {
    for node in body {
        if let NodeKind::Pattern { name, body } = &node.kind {
            if out.insert(name.clone(), body.clone()).is_some() {
                tracing::warn!(pattern = %name, "pattern redefined, later definition wins");
            }
        }
        collect_bodies(node.children(), out);
    }
}

/// Length of a pattern in beats. References already being measured count
/// as zero.
fn pattern_beats(
    name: &str,
    bodies: &HashMap<String, Vec<Node>>,
    visiting: &RefCell<Vec<String>>,
) -> Option<f64> {
    if visiting.borrow().iter().any(|n| n == name) {
        return None;
    }
    let body = bodies.get(name)?;
    visiting.borrow_mut().push(name.to_string());
    let total = duration_beats(body, &|inner| pattern_beats(inner, bodies, visiting));
    visiting.borrow_mut().pop();
    Some(total)
}

/// A track as the scheduler owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackState {
    pub id: TrackId,
    pub name: String,
    pub events: Vec<TrackEvent>,
    /// Instrument in effect at the start of the track.
    pub instrument: InstrumentKind,
    pub volume: f64,
    pub muted: bool,
    pub soloed: bool,
    pub active: bool,
}

impl TrackState {
    pub fn new(id: TrackId, name: impl Into<String>, instrument: InstrumentKind) -> Self {
        Self {
            id,
            name: name.into(),
            events: Vec::new(),
            instrument,
            volume: 1.0,
            muted: false,
            soloed: false,
            active: true,
        }
    }

    /// Beat at which the last event of the track ends.
    pub fn duration(&self) -> Beat {
        self.events
            .iter()
            .map(TrackEvent::end)
            .max()
            .unwrap_or(Beat::ZERO)
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.volume = if volume.is_finite() {
            volume.clamp(0.0, MAX_TRACK_VOLUME)
        } else {
            1.0
        };
    }
}

/// First `@instrument` in a track body, looking inside loops and groups.
pub fn first_instrument(body: &[Node]) -> Option<(&str, Option<Location>)> {
    body.iter().find_map(|node| match &node.kind {
        NodeKind::Instrument { name } => Some((name.as_str(), node.loc)),
        NodeKind::Loop { body, .. } | NodeKind::Group { body, .. } => first_instrument(body),
        _ => None,
    })
}

fn parse_instrument(name: &str, loc: Option<Location>) -> Result<InstrumentKind, Located<RuntimeError>> {
    name.parse::<InstrumentKind>()
        .map_err(|_| Located::new(RuntimeError::UnknownInstrument(name.to_string()), loc))
}

/// Builds [`TrackState`]s from track bodies.
pub struct TrackManager<'a> {
    patterns: &'a PatternTable,
    cache: HashMap<String, Vec<TrackEvent>>,
    diagnostics: Vec<Located<RuntimeError>>,
}

struct Cursor {
    at: Beat,
    instrument: InstrumentKind,
}

impl<'a> TrackManager<'a> {
    pub fn new(patterns: &'a PatternTable) -> Self {
        Self {
            patterns,
            cache: HashMap::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Flatten `body` into a track. An unknown instrument name fails the
    /// whole track; bad pattern references only drop their own events and
    /// are kept in [`diagnostics`](Self::diagnostics).
    pub fn create_track(
        &mut self,
        id: TrackId,
        name: &str,
        body: &[Node],
        default_instrument: InstrumentKind,
    ) -> Result<TrackState, Located<RuntimeError>> {
        let events = self.flatten(body, default_instrument)?;
        tracing::debug!(track = %name, events = events.len(), "track flattened");
        Ok(TrackState {
            events,
            ..TrackState::new(id, name, default_instrument)
        })
    }

    /// Flatten `body` into events starting at beat zero.
    pub fn flatten(
        &mut self,
        body: &[Node],
        default_instrument: InstrumentKind,
    ) -> Result<Vec<TrackEvent>, Located<RuntimeError>> {
        let mut cursor = Cursor {
            at: Beat::ZERO,
            instrument: default_instrument,
        };
        let mut events = Vec::new();
        let mut stack = Vec::new();
        self.walk(body, &mut cursor, &mut events, &mut stack)?;
        Ok(events)
    }

    /// Pattern problems seen so far.
    pub fn diagnostics(&self) -> &[Located<RuntimeError>] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Located<RuntimeError>> {
        std::mem::take(&mut self.diagnostics)
    }

    fn walk(
        &mut self,
        body: &[Node],
        cursor: &mut Cursor,
        out: &mut Vec<TrackEvent>,
        stack: &mut Vec<String>,
    ) -> Result<(), Located<RuntimeError>> {
        for node in body {
            match &node.kind {
                NodeKind::Note { note, duration } => {
                    let length = Beat::from_beats_f64(beats(*duration));
                    out.push(TrackEvent::note(note.clone(), cursor.at, length));
                    cursor.at += length;
                }
                NodeKind::Chord { notes, duration } => {
                    let length = Beat::from_beats_f64(beats(*duration));
                    out.push(TrackEvent::chord(notes.clone(), cursor.at, length));
                    cursor.at += length;
                }
                NodeKind::Rest { duration } => {
                    let length = Beat::from_beats_f64(beats(*duration));
                    out.push(TrackEvent::rest(cursor.at, length));
                    cursor.at += length;
                }
                NodeKind::Instrument { name } => {
                    let kind = parse_instrument(name, node.loc)?;
                    cursor.instrument = kind;
                    out.push(TrackEvent::instrument_change(kind, cursor.at));
                }
                NodeKind::Loop { iterations, body } => {
                    for _ in 0..*iterations {
                        self.walk(body, cursor, out, stack)?;
                    }
                }
                NodeKind::Group { body, multiplier } => {
                    for _ in 0..multiplier.unwrap_or(1) {
                        self.walk(body, cursor, out, stack)?;
                    }
                }
                NodeKind::PatternReference { name } => {
                    self.splice(name, node.loc, cursor, out, stack)?;
                }
                // Tempo is global in multitrack playback.
                NodeKind::Slow | NodeKind::Fast => {}
                NodeKind::Comment { .. } | NodeKind::Pattern { .. } => {}
                NodeKind::Track { body, .. } => self.walk(body, cursor, out, stack)?,
            }
        }
        Ok(())
    }

    fn splice(
        &mut self,
        name: &str,
        loc: Option<Location>,
        cursor: &mut Cursor,
        out: &mut Vec<TrackEvent>,
        stack: &mut Vec<String>,
    ) -> Result<(), Located<RuntimeError>> {
        if stack.iter().any(|n| n == name) {
            tracing::warn!(pattern = %name, "recursive pattern reference skipped");
            self.diagnostics
                .push(Located::new(RuntimeError::RecursivePattern(name.to_string()), loc));
            return Ok(());
        }

        if !self.cache.contains_key(name) {
            let Some(definition) = self.patterns.get(name) else {
                tracing::warn!(pattern = %name, "pattern not found");
                self.diagnostics
                    .push(Located::new(RuntimeError::UndefinedPattern(name.to_string()), loc));
                return Ok(());
            };
            let mut inner = Cursor {
                at: Beat::ZERO,
                instrument: cursor.instrument,
            };
            let mut events = Vec::new();
            stack.push(name.to_string());
            let walked = self.walk(&definition.body, &mut inner, &mut events, stack);
            stack.pop();
            walked?;
            self.cache.insert(name.to_string(), events);
        }

        let Some(events) = self.cache.get(name) else {
            return Ok(());
        };
        let length = events.iter().map(TrackEvent::end).max().unwrap_or(Beat::ZERO);
        for event in events {
            if let TrackEventKind::InstrumentChange(kind) = event.kind {
                cursor.instrument = kind;
            }
            out.push(event.shifted(cursor.at));
        }
        cursor.at += length;
        Ok(())
    }
}
