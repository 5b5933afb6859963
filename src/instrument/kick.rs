//! Kick drum: a pitch-dropping sine body with a short triangle click.
//!
//! The played note's pitch is ignored; kicks always sound at the body
//! frequency.

use super::envelope::Automation;
use super::filter::Filter;
use super::oscillator::{Oscillator, Waveform};
use super::{render_frames, Voice};

const CLICK_LENGTH: f64 = 0.05;
const MAX_BODY_LENGTH: f64 = 0.8;

pub struct KickVoice {
    volume: f64,
    frequency: f64,
    pitch_decay: f64,
    body_resonance: f64,
    click_amount: f64,
}

impl KickVoice {
    pub fn new() -> Self {
        Self {
            volume: 0.9,
            frequency: 60.0,
            pitch_decay: 0.05,
            body_resonance: 0.3,
            click_amount: 0.4,
        }
    }
}

impl Default for KickVoice {
    fn default() -> Self {
        Self::new()
    }
}

impl Voice for KickVoice {
    fn render(&mut self, _frequency: f64, duration: f64, velocity: f64, sample_rate: u32) -> Vec<f32> {
        if velocity <= 0.0 || duration <= 0.0 {
            return Vec::new();
        }
        let body_pitch = Automation::new(self.frequency)
            .exponential_to(self.frequency * 0.3, self.pitch_decay);
        let body_gain = Automation::new(0.0)
            .linear_to(velocity * 1.2, 0.001)
            .exponential_to(velocity * 0.8, 0.05)
            .exponential_to(velocity * 0.3, 0.2)
            .exponential_to(0.001, duration.min(0.6));

        let click_pitch = Automation::new(2000.0).exponential_to(500.0, 0.01);
        let click_level = velocity * self.click_amount;
        let click_gain = Automation::new(0.0)
            .linear_to(click_level, 0.001)
            .exponential_to(0.001, 0.02);

        let body_end = duration.min(MAX_BODY_LENGTH);
        let mut body = Oscillator::new(Waveform::Sine, sample_rate);
        let mut body_filter = Filter::low_pass(sample_rate, 100.0, self.body_resonance);
        let mut click = Oscillator::new(Waveform::Triangle, sample_rate);
        let mut click_filter = Filter::high_pass(sample_rate, 1000.0, 1.0);
        let volume = self.volume;

        render_frames(sample_rate, body_end.max(CLICK_LENGTH), |_, t| {
            let mut out = 0.0;
            if t < body_end {
                out += body_filter.process(body.next(body_pitch.value_at(t)) * body_gain.value_at(t));
            }
            if t < CLICK_LENGTH {
                out += click_filter.process(click.next(click_pitch.value_at(t)) * click_gain.value_at(t));
            }
            out * volume
        })
    }

    fn name(&self) -> &'static str {
        "kick"
    }
}
