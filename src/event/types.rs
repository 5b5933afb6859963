//! Event data model: what a flattened track is made of.
//!
//! A [`TrackEvent`] is one note, chord, rest or instrument change at a beat
//! offset from the start of its track. A [`ScheduledEvent`] is the same event
//! anchored to an absolute time on the audio clock.

use std::fmt;

use super::beat::Beat;
use crate::instrument::InstrumentKind;

/// Identifies a track in the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u32);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "track-{}", self.0)
    }
}

/// What an event does when it fires.
#[derive(Debug, Clone, PartialEq)]
pub enum TrackEventKind {
    Note(String),
    Chord(Vec<String>),
    Rest,
    /// Switches the instrument for every later event of the track.
    InstrumentChange(InstrumentKind),
}

impl TrackEventKind {
    pub fn label(&self) -> &'static str {
        match self {
            TrackEventKind::Note(_) => "note",
            TrackEventKind::Chord(_) => "chord",
            TrackEventKind::Rest => "rest",
            TrackEventKind::InstrumentChange(_) => "instrument_change",
        }
    }
}

/// A single event of a flattened track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackEvent {
    pub kind: TrackEventKind,
    /// Offset from the start of the track.
    pub time_offset: Beat,
    /// Zero for instrument changes.
    pub duration: Beat,
}

impl TrackEvent {
    pub fn note(note: impl Into<String>, time_offset: Beat, duration: Beat) -> Self {
        Self {
            kind: TrackEventKind::Note(note.into()),
            time_offset,
            duration,
        }
    }

    pub fn chord(notes: Vec<String>, time_offset: Beat, duration: Beat) -> Self {
        Self {
            kind: TrackEventKind::Chord(notes),
            time_offset,
            duration,
        }
    }

    pub fn rest(time_offset: Beat, duration: Beat) -> Self {
        Self {
            kind: TrackEventKind::Rest,
            time_offset,
            duration,
        }
    }

    pub fn instrument_change(instrument: InstrumentKind, time_offset: Beat) -> Self {
        Self {
            kind: TrackEventKind::InstrumentChange(instrument),
            time_offset,
            duration: Beat::ZERO,
        }
    }

    /// Offset of the first beat after this event.
    pub fn end(&self) -> Beat {
        self.time_offset + self.duration
    }

    /// Copy moved later by `offset`.
    pub fn shifted(&self, offset: Beat) -> Self {
        Self {
            time_offset: self.time_offset + offset,
            ..self.clone()
        }
    }
}

/// A track event anchored to the audio clock.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledEvent {
    pub track: TrackId,
    pub event: TrackEvent,
    /// Absolute clock time in seconds.
    pub time: f64,
}
