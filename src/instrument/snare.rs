//! Snare drum: band-passed triangle body plus a high-passed noise burst.

use super::envelope::Automation;
use super::filter::Filter;
use super::noise::WhiteNoise;
use super::oscillator::{Oscillator, Waveform};
use super::{render_frames, Voice};

const NOISE_LENGTH: f64 = 0.15;
const MAX_BODY_LENGTH: f64 = 0.3;

pub struct SnareVoice {
    volume: f64,
    fundamental: f64,
    tone: f64,
    noise_level: f64,
    snappiness: f64,
    noise: WhiteNoise,
}

impl SnareVoice {
    pub fn new(seed: u64) -> Self {
        Self {
            volume: 0.8,
            fundamental: 200.0,
            tone: 3000.0,
            noise_level: 0.7,
            snappiness: 0.8,
            noise: WhiteNoise::new(seed),
        }
    }
}

impl Voice for SnareVoice {
    fn render(&mut self, _frequency: f64, duration: f64, velocity: f64, sample_rate: u32) -> Vec<f32> {
        if velocity <= 0.0 || duration <= 0.0 {
            return Vec::new();
        }
        let body_pitch = Automation::new(self.fundamental)
            .exponential_to(self.fundamental * 0.7, 0.05);
        let tonal = velocity * (1.0 - self.noise_level);
        let body_gain = Automation::new(0.0)
            .linear_to(tonal * 0.8, 0.001)
            .exponential_to(tonal * 0.3, 0.02)
            .exponential_to(0.001, duration.min(0.2));

        let burst = velocity * self.noise_level * self.snappiness;
        let noise_gain = Automation::new(0.0)
            .linear_to(burst, 0.001)
            .exponential_to(burst * 0.5, 0.01)
            .exponential_to(0.001, 0.08);

        let body_end = duration.min(MAX_BODY_LENGTH);
        let mut body = Oscillator::new(Waveform::Triangle, sample_rate);
        let mut body_filter = Filter::band_pass(sample_rate, self.fundamental, 2.0);
        let mut noise_filter = Filter::high_pass(sample_rate, self.tone, 1.0);
        let noise = &mut self.noise;
        let volume = self.volume;

        render_frames(sample_rate, body_end.max(NOISE_LENGTH), |_, t| {
            let mut out = 0.0;
            if t < body_end {
                out += body_filter.process(body.next(body_pitch.value_at(t)) * body_gain.value_at(t));
            }
            if t < NOISE_LENGTH {
                out += noise_filter.process(noise.next() * noise_gain.value_at(t));
            }
            out * volume
        })
    }

    fn name(&self) -> &'static str {
        "snare"
    }
}
