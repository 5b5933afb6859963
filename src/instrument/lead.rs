//! Lead synthesizer: a saw that glides from the previous note, with vibrato
//! and a brightening filter sweep.

use super::envelope::{AdsrEnvelope, Automation};
use super::filter::{Filter, CONTROL_INTERVAL};
use super::oscillator::{oscillator, Oscillator, Waveform};
use super::{render_frames, Voice};

/// Pitch a fresh voice glides up from.
const INITIAL_FREQUENCY: f64 = 440.0;
const VIBRATO_RATE: f64 = 5.0;
const HIGH_PASS_CUTOFF: f64 = 80.0;

pub struct LeadVoice {
    envelope: AdsrEnvelope,
    volume: f64,
    cutoff: f64,
    resonance: f64,
    portamento: f64,
    /// Vibrato depth as a fraction of the note frequency.
    vibrato: f64,
    last_frequency: f64,
}

impl LeadVoice {
    pub fn new() -> Self {
        Self {
            envelope: AdsrEnvelope {
                attack: 0.05,
                decay: 0.2,
                sustain: 0.7,
                release: 0.3,
            },
            volume: 0.6,
            cutoff: 2000.0,
            resonance: 5.0,
            portamento: 0.1,
            vibrato: 0.02,
            last_frequency: INITIAL_FREQUENCY,
        }
    }
}

impl Default for LeadVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for LeadVoice {
    fn render(&mut self, frequency: f64, duration: f64, velocity: f64, sample_rate: u32) -> Vec<f32> {
        if velocity <= 0.0 {
            return Vec::new();
        }
        let env = self.envelope;
        let gate = env.fitted_gate(duration);

        let pitch = if self.portamento > 0.0 {
            Automation::new(self.last_frequency).exponential_to(frequency, self.portamento)
        } else {
            Automation::new(frequency)
        };
        self.last_frequency = frequency;

        let brightness = Automation::new(self.cutoff * 0.3)
            .exponential_to(self.cutoff * 1.5, env.attack + env.decay)
            .exponential_to(self.cutoff, duration - env.release);

        let depth = frequency * self.vibrato;
        let mut osc = Oscillator::new(Waveform::Saw, sample_rate);
        let mut high_pass = Filter::high_pass(sample_rate, HIGH_PASS_CUTOFF, 0.707);
        let mut low_pass = Filter::low_pass(sample_rate, brightness.value_at(0.0), self.resonance);
        let volume = self.volume;

        render_frames(sample_rate, duration, |i, t| {
            if i % CONTROL_INTERVAL == 0 {
                low_pass.set_cutoff(brightness.value_at(t));
            }
            let wobble = oscillator(Waveform::Sine, (VIBRATO_RATE * t).fract()) * depth;
            let raw = osc.next(pitch.value_at(t) + wobble) * env.amplitude(t, gate) * velocity;
            low_pass.process(high_pass.process(raw)) * volume
        })
    }

    fn name(&self) -> &'static str {
        "lead"
    }
}
