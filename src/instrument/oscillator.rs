//! Oscillator primitives: waveform shapes and a phase-accumulating oscillator.

use std::f64::consts::PI;

/// Available waveform shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Waveform {
    Sine,
    Saw,
    Square,
    Triangle,
}

/// Generate a single sample for the given waveform at the specified phase.
///
/// `phase` is in the range [0.0, 1.0), representing one full cycle.
/// Returns a value in [-1.0, 1.0].
pub fn oscillator(waveform: Waveform, phase: f64) -> f64 {
    match waveform {
        Waveform::Sine => (phase * 2.0 * PI).sin(),
        Waveform::Saw => 2.0 * phase - 1.0,
        Waveform::Square => {
            if phase < 0.5 {
                1.0
            } else {
                -1.0
            }
        }
        Waveform::Triangle => {
            if phase < 0.25 {
                4.0 * phase
            } else if phase < 0.75 {
                2.0 - 4.0 * phase
            } else {
                4.0 * phase - 4.0
            }
        }
    }
}

/// Running oscillator whose frequency may change every sample.
///
/// Integrating the phase (rather than computing `f * t`) keeps pitch
/// glides and vibrato free of discontinuities.
#[derive(Debug, Clone)]
pub struct Oscillator {
    waveform: Waveform,
    phase: f64,
    sample_rate: f64,
}

impl Oscillator {
    pub fn new(waveform: Waveform, sample_rate: u32) -> Self {
        Self {
            waveform,
            phase: 0.0,
            sample_rate: sample_rate as f64,
        }
    }

    /// Emit the current sample and advance by one sample at `frequency` Hz.
    pub fn next(&mut self, frequency: f64) -> f64 {
        let out = oscillator(self.waveform, self.phase);
        self.phase = (self.phase + frequency / self.sample_rate).rem_euclid(1.0);
        out
    }
}

/// Frequency ratio of a detune in cents.
pub fn cents_to_ratio(cents: f64) -> f64 {
    2.0f64.powf(cents / 1200.0)
}
