//! Bass synthesizer: saw plus a sine one octave down, soft-clipped and run
//! through a resonant low-pass whose cutoff opens during attack and decay.

use std::f64::consts::PI;

use super::envelope::{AdsrEnvelope, Automation};
use super::filter::{Filter, CONTROL_INTERVAL};
use super::oscillator::{Oscillator, Waveform};
use super::{render_frames, Voice};

pub struct BassVoice {
    envelope: AdsrEnvelope,
    volume: f64,
    cutoff: f64,
    resonance: f64,
    sub_level: f64,
    distortion: f64,
}

impl BassVoice {
    pub fn new() -> Self {
        Self {
            envelope: AdsrEnvelope {
                attack: 0.02,
                decay: 0.3,
                sustain: 0.6,
                release: 0.4,
            },
            volume: 0.7,
            cutoff: 800.0,
            resonance: 8.0,
            sub_level: 0.3,
            distortion: 0.2,
        }
    }
}

impl Default for BassVoice {
    fn default() -> Self {
        Self::new()
    }
}

/// Gentle waveshaping curve over `[-1, 1]`.
fn soft_clip(x: f64, amount: f64) -> f64 {
    let x = x.clamp(-1.0, 1.0);
    let deg = PI / 180.0;
    ((3.0 + amount) * x * 20.0 * deg) / (PI + amount * x.abs())
}

impl Voice for BassVoice {
    fn render(&mut self, frequency: f64, duration: f64, velocity: f64, sample_rate: u32) -> Vec<f32> {
        if velocity <= 0.0 {
            return Vec::new();
        }
        let env = self.envelope;
        let gate = env.fitted_gate(duration);
        let sweep = Automation::new(self.cutoff * 0.5)
            .exponential_to(self.cutoff, env.attack + env.decay);

        let mut main = Oscillator::new(Waveform::Saw, sample_rate);
        let mut sub = Oscillator::new(Waveform::Sine, sample_rate);
        let mut filter = Filter::low_pass(sample_rate, sweep.value_at(0.0), self.resonance);
        let (main_peak, sub_peak) = (velocity * 0.8, velocity * self.sub_level);
        let (volume, distortion) = (self.volume, self.distortion);

        render_frames(sample_rate, duration, |i, t| {
            if i % CONTROL_INTERVAL == 0 {
                filter.set_cutoff(sweep.value_at(t));
            }
            let level = env.amplitude(t, gate);
            let mixed = main.next(frequency) * level * main_peak
                + sub.next(frequency / 2.0) * level * sub_peak;
            filter.process(soft_clip(mixed, distortion)) * volume
        })
    }

    fn name(&self) -> &'static str {
        "bass"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::test_support::{peak, rms};

    #[test]
    fn renders_audible_note() {
        let out = BassVoice::new().render(65.41, 1.0, 1.0, 44100);
        assert_eq!(out.len(), 44100);
        assert!(rms(&out) > 0.005);
    }

    #[test]
    fn output_bounded() {
        let out = BassVoice::new().render(41.2, 2.0, 1.0, 44100);
        assert!(peak(&out) < 1.0, "peak {}", peak(&out));
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn soft_clip_is_odd_and_compressive() {
        assert_eq!(soft_clip(0.0, 0.2), 0.0);
        assert!((soft_clip(0.5, 0.2) + soft_clip(-0.5, 0.2)).abs() < 1e-12);
        assert!(soft_clip(1.0, 0.2) < 1.0);
        assert_eq!(soft_clip(3.0, 0.2), soft_clip(1.0, 0.2));
    }

    #[test]
    fn release_fades_out_inside_duration() {
        let out = BassVoice::new().render(55.0, 1.0, 1.0, 44100);
        let tail = &out[out.len() - 441..];
        assert!(peak(tail) < peak(&out[..22050]) * 0.2);
    }
}
