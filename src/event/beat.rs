//! Musical time representation using integer ticks.
//!
//! Track offsets are accumulated in ticks at 960 PPQN so that long loops of
//! fractional durations do not drift. Conversion to seconds happens only
//! when the scheduler anchors a track to the audio clock.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};

/// Ticks per beat. 960 divides cleanly by 2, 3, 4, 5, 6, 8, 10, 12, 15 and 16.
pub const TICKS_PER_BEAT: u64 = 960;

/// Musical time measured in integer ticks at [`TICKS_PER_BEAT`] resolution.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub struct Beat {
    ticks: u64,
}

impl Beat {
    /// Zero time, the start of a track.
    pub const ZERO: Beat = Beat { ticks: 0 };

    pub fn from_ticks(ticks: u64) -> Self {
        Self { ticks }
    }

    /// Create a `Beat` from whole beats.
    pub fn from_beats(beats: u32) -> Self {
        Self {
            ticks: beats as u64 * TICKS_PER_BEAT,
        }
    }

    /// Create a `Beat` from a fractional beat value (e.g. 1.5 = one and a half beats).
    /// Negative and non-finite values clamp to zero.
    pub fn from_beats_f64(beats: f64) -> Self {
        if !beats.is_finite() || beats <= 0.0 {
            return Self::ZERO;
        }
        Self {
            ticks: (beats * TICKS_PER_BEAT as f64).round() as u64,
        }
    }

    pub fn ticks(self) -> u64 {
        self.ticks
    }

    pub fn as_beats_f64(self) -> f64 {
        self.ticks as f64 / TICKS_PER_BEAT as f64
    }

    /// Seconds this span lasts at `bpm`.
    pub fn to_seconds(self, bpm: f64) -> f64 {
        self.as_beats_f64() * 60.0 / bpm
    }
}

impl Ord for Beat {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ticks.cmp(&other.ticks)
    }
}

impl PartialOrd for Beat {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Add for Beat {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks.saturating_add(rhs.ticks),
        }
    }
}

impl AddAssign for Beat {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Beat {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            ticks: self.ticks.saturating_sub(rhs.ticks),
        }
    }
}

impl Mul<u32> for Beat {
    type Output = Self;

    fn mul(self, rhs: u32) -> Self {
        Self {
            ticks: self.ticks.saturating_mul(rhs as u64),
        }
    }
}

impl fmt::Display for Beat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_beats_f64())
    }
}
