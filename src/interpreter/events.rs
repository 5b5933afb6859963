//! Typed playback notifications.
//!
//! Every subscriber gets its own bounded channel. Emitting never blocks:
//! if a subscriber falls behind its events are dropped, and subscribers
//! whose receiver is gone are forgotten.

use std::fmt;
use std::sync::Mutex;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};

use crate::error::{Located, RuntimeError};
use crate::event::{TrackEvent, TrackEventKind};
use crate::instrument::InstrumentKind;

/// Default capacity of each subscriber channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Something that happened during playback. Durations are in beats.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    NotePlayed {
        note: String,
        duration: f64,
    },
    ChordPlayed {
        notes: Vec<String>,
        duration: f64,
    },
    Rest {
        duration: f64,
    },
    SpeedChanged {
        modifier: f64,
    },
    InstrumentChanged {
        instrument: InstrumentKind,
    },
    /// A multitrack event was dispatched.
    TrackEvent {
        track: String,
        event: TrackEvent,
    },
    Error {
        error: RuntimeError,
        line: Option<usize>,
        column: Option<usize>,
    },
    /// Playback reached the end on its own.
    Complete,
}

impl PlaybackEvent {
    pub fn error(err: &Located<RuntimeError>) -> Self {
        PlaybackEvent::Error {
            error: err.error.clone(),
            line: err.line(),
            column: err.col(),
        }
    }
}

impl fmt::Display for PlaybackEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackEvent::NotePlayed { note, duration } => write!(f, "note {note} ({duration})"),
            PlaybackEvent::ChordPlayed { notes, duration } => {
                write!(f, "chord [{}] ({duration})", notes.join(" "))
            }
            PlaybackEvent::Rest { duration } => write!(f, "rest ({duration})"),
            PlaybackEvent::SpeedChanged { modifier } => write!(f, "speed x{modifier}"),
            PlaybackEvent::InstrumentChanged { instrument } => write!(f, "@{instrument}"),
            PlaybackEvent::TrackEvent { track, event } => match &event.kind {
                TrackEventKind::Note(note) => write!(f, "{track}: note {note} @ {}", event.time_offset),
                TrackEventKind::Chord(notes) => {
                    write!(f, "{track}: chord [{}] @ {}", notes.join(" "), event.time_offset)
                }
                TrackEventKind::Rest => write!(f, "{track}: rest @ {}", event.time_offset),
                TrackEventKind::InstrumentChange(kind) => write!(f, "{track}: @{kind}"),
            },
            PlaybackEvent::Error {
                error,
                line: Some(line),
                column,
            } => write!(f, "error [{line}:{}] {error}", column.unwrap_or(0)),
            PlaybackEvent::Error { error, .. } => write!(f, "error {error}"),
            PlaybackEvent::Complete => write!(f, "complete"),
        }
    }
}

pub struct EventBus {
    subscribers: Mutex<Vec<Sender<PlaybackEvent>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// A receiver for every event emitted from now on.
    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = bounded(self.capacity);
        self.lock().push(tx);
        rx
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().len()
    }

    pub fn emit(&self, event: PlaybackEvent) {
        self.lock().retain(|tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::debug!(?dropped, "subscriber channel full, event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        });
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sender<PlaybackEvent>>> {
        self.subscribers.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}
