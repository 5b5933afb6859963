//! Global playback state shared by the sequential and multitrack paths.

use crate::instrument::InstrumentKind;

pub const DEFAULT_BPM: f64 = 120.0;
pub const DEFAULT_MASTER_VOLUME: f64 = 1.0;

/// Speed multipliers selected by `slow`/`fast`.
pub const SLOW_MODIFIER: f64 = 0.5;
pub const FAST_MODIFIER: f64 = 1.5;
pub const NORMAL_MODIFIER: f64 = 1.0;

/// Tempo, speed, instrument and gain in effect for the next note.
///
/// A plain value: callers snapshot it, change what they need, and restore
/// the snapshot afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportState {
    pub bpm: f64,
    pub time_modifier: f64,
    pub current_instrument: InstrumentKind,
    pub master_volume: f64,
}

impl TransportState {
    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: sanitize_bpm(bpm),
            ..Self::default()
        }
    }

    /// Seconds per beat with the time modifier applied.
    pub fn beat_duration(&self) -> f64 {
        (60.0 / self.bpm) / self.time_modifier
    }

    /// Real duration of `beats` at the current tempo and speed.
    pub fn seconds_for(&self, beats: f64) -> f64 {
        beats * self.beat_duration()
    }
}

impl Default for TransportState {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            time_modifier: NORMAL_MODIFIER,
            current_instrument: InstrumentKind::Default,
            master_volume: DEFAULT_MASTER_VOLUME,
        }
    }
}

/// Non-finite or non-positive tempos fall back to the default.
pub(crate) fn sanitize_bpm(bpm: f64) -> f64 {
    if bpm.is_finite() && bpm > 0.0 {
        bpm
    } else {
        DEFAULT_BPM
    }
}
