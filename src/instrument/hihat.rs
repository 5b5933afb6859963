//! Hi-hat: six inharmonic square partials over band-limited metallic noise.
//! The open variant rings longer.

use super::envelope::Automation;
use super::filter::Filter;
use super::noise::WhiteNoise;
use super::oscillator::{Oscillator, Waveform};
use super::{render_frames, Voice};

const RATIOS: [f64; 6] = [1.0, 1.4, 2.1, 3.2, 4.7, 6.3];

pub struct HiHatVoice {
    volume: f64,
    tone: f64,
    decay: f64,
    brightness: f64,
    open: bool,
    noise: WhiteNoise,
}

impl HiHatVoice {
    pub fn closed(seed: u64) -> Self {
        Self {
            volume: 0.6,
            tone: 8000.0,
            decay: 0.1,
            brightness: 0.8,
            open: false,
            noise: WhiteNoise::new(seed),
        }
    }

    pub fn open(seed: u64) -> Self {
        Self {
            open: true,
            ..Self::closed(seed)
        }
    }

    fn partial_decay(&self) -> f64 {
        if self.open {
            self.decay * 3.0
        } else {
            self.decay
        }
    }

    fn noise_decay(&self) -> f64 {
        if self.open {
            self.decay * 2.0
        } else {
            self.decay * 0.5
        }
    }

    /// Layered noise: several weighted draws summed per sample.
    fn metallic_noise(&mut self) -> f64 {
        (0..5)
            .map(|j| self.noise.next() * 0.7f64.powi(j))
            .sum::<f64>()
            * 0.3
    }
}

impl Voice for HiHatVoice {
    fn render(&mut self, _frequency: f64, duration: f64, velocity: f64, sample_rate: u32) -> Vec<f32> {
        if velocity <= 0.0 || duration <= 0.0 {
            return Vec::new();
        }
        let nyquist = sample_rate as f64 / 2.0;
        let partial_decay = self.partial_decay();
        let noise_decay = self.noise_decay();
        let partial_end = duration.min(partial_decay + 0.1);
        let noise_end = duration.min(noise_decay + 0.05);

        let mut partials: Vec<(Oscillator, f64, Automation)> = RATIOS
            .iter()
            .enumerate()
            .map(|(i, ratio)| (i, self.tone * ratio))
            .filter(|&(_, freq)| freq < nyquist * 0.9)
            .map(|(i, freq)| {
                let level = velocity * (0.15 / (i + 1) as f64) * self.brightness;
                let gain = Automation::new(0.0)
                    .linear_to(level, 0.001)
                    .exponential_to(0.001, partial_decay);
                (Oscillator::new(Waveform::Square, sample_rate), freq, gain)
            })
            .collect();

        let noise_gain = Automation::new(0.0)
            .linear_to(velocity * 0.8, 0.001)
            .exponential_to(0.001, noise_decay);
        let mut high_pass = Filter::high_pass(sample_rate, 6000.0, 0.5);
        let mut low_pass = Filter::low_pass(sample_rate, 12000.0, 1.0);
        let volume = self.volume;

        render_frames(sample_rate, partial_end.max(noise_end), |_, t| {
            let mut bus = 0.0;
            if t < partial_end {
                for (osc, freq, gain) in partials.iter_mut() {
                    bus += osc.next(*freq) * gain.value_at(t);
                }
            }
            if t < noise_end {
                bus += high_pass.process(self.metallic_noise() * noise_gain.value_at(t));
            }
            low_pass.process(bus) * volume
        })
    }

    fn name(&self) -> &'static str {
        if self.open {
            "openhat"
        } else {
            "hihat"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::test_support::{peak, rms};

    #[test]
    fn closed_hat_is_short() {
        let out = HiHatVoice::closed(1).render(0.0, 1.0, 1.0, 44100);
        assert_eq!(out.len(), (0.2f64 * 44100.0).round() as usize);
    }

    #[test]
    fn open_hat_rings_longer() {
        let closed = HiHatVoice::closed(1).render(0.0, 1.0, 1.0, 44100);
        let open = HiHatVoice::open(1).render(0.0, 1.0, 1.0, 44100);
        assert!(open.len() > closed.len());
        assert_eq!(open.len(), (0.4f64 * 44100.0).round() as usize);
    }

    #[test]
    fn short_duration_truncates() {
        let out = HiHatVoice::closed(1).render(0.0, 0.05, 1.0, 44100);
        assert_eq!(out.len(), (0.05f64 * 44100.0).round() as usize);
    }

    #[test]
    fn audible_and_bounded() {
        let out = HiHatVoice::closed(3).render(0.0, 0.25, 1.0, 44100);
        assert!(rms(&out[..2205]) > 0.01);
        assert!(peak(&out) < 1.5);
    }

    #[test]
    fn low_sample_rates_drop_partials_above_nyquist() {
        let out = HiHatVoice::closed(3).render(0.0, 0.25, 1.0, 8000);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
