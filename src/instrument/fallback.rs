//! Single sine oscillator, used when no dedicated voice is selected.

use super::envelope::AdsrEnvelope;
use super::oscillator::{Oscillator, Waveform};
use super::{render_frames, Voice};

const PEAK: f64 = 0.3;

pub struct SineVoice {
    envelope: AdsrEnvelope,
}

impl SineVoice {
    pub fn new() -> Self {
        Self {
            envelope: AdsrEnvelope {
                attack: 0.01,
                decay: 0.1,
                sustain: 0.7,
                release: 0.1,
            },
        }
    }
}

impl Default for SineVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for SineVoice {
    fn render(&mut self, frequency: f64, duration: f64, velocity: f64, sample_rate: u32) -> Vec<f32> {
        if velocity <= 0.0 {
            return Vec::new();
        }
        let gate = self.envelope.fitted_gate(duration);
        let mut osc = Oscillator::new(Waveform::Sine, sample_rate);
        let env = self.envelope;
        render_frames(sample_rate, duration, |_, t| {
            osc.next(frequency) * env.amplitude(t, gate) * PEAK * velocity
        })
    }

    fn name(&self) -> &'static str {
        "default"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::test_support::peak;

    #[test]
    fn renders_exactly_the_note_duration() {
        let out = SineVoice::new().render(440.0, 0.5, 1.0, 44100);
        assert_eq!(out.len(), 22050);
        assert!(out.last().unwrap().abs() < 1e-3);
    }

    #[test]
    fn peak_is_scaled_by_velocity() {
        let loud = peak(&SineVoice::new().render(440.0, 0.5, 1.0, 44100));
        assert!(loud <= PEAK as f32 + 1e-6 && loud > 0.25);
        let soft = peak(&SineVoice::new().render(440.0, 0.5, 0.5, 44100));
        assert!((soft / loud - 0.5).abs() < 0.01);
    }

    #[test]
    fn silent_velocity_renders_nothing() {
        assert!(SineVoice::new().render(440.0, 1.0, 0.0, 44100).is_empty());
    }
}
