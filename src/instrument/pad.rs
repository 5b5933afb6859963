//! Pad synthesizer: three detuned oscillators under a slowly wandering
//! low-pass, with the centre oscillator doubled through a modulated delay.

use super::envelope::AdsrEnvelope;
use super::filter::{Filter, CONTROL_INTERVAL};
use super::oscillator::{cents_to_ratio, oscillator, Oscillator, Waveform};
use super::{render_frames, Voice};

const LAYERS: [Waveform; 3] = [Waveform::Sine, Waveform::Triangle, Waveform::Saw];
const FILTER_LFO_RATE: f64 = 0.1;
const FILTER_LFO_DEPTH: f64 = 100.0;
const CHORUS_RATE: f64 = 0.3;
const CHORUS_DELAY: f64 = 0.02;
const CHORUS_DEPTH: f64 = 0.01;

pub struct PadVoice {
    envelope: AdsrEnvelope,
    volume: f64,
    detune_cents: f64,
    cutoff: f64,
}

impl PadVoice {
    pub fn new() -> Self {
        Self {
            envelope: AdsrEnvelope {
                attack: 1.0,
                decay: 0.5,
                sustain: 0.8,
                release: 2.0,
            },
            volume: 0.4,
            detune_cents: 15.0,
            cutoff: 1200.0,
        }
    }
}

impl Default for PadVoice {
    fn default() -> Self {
        Self::new()
    }
}

/// Fractional delay line read with linear interpolation.
struct DelayLine {
    buffer: Vec<f64>,
    write: usize,
}

impl DelayLine {
    fn new(max_samples: usize) -> Self {
        Self {
            buffer: vec![0.0; max_samples.max(2)],
            write: 0,
        }
    }

    fn process(&mut self, input: f64, delay_samples: f64) -> f64 {
        let len = self.buffer.len();
        self.buffer[self.write] = input;
        let delay = delay_samples.clamp(0.0, (len - 1) as f64);
        let read = (self.write as f64 - delay).rem_euclid(len as f64);
        let index = read.floor() as usize % len;
        let next = (index + 1) % len;
        let frac = read - read.floor();
        self.write = (self.write + 1) % len;
        self.buffer[index] * (1.0 - frac) + self.buffer[next] * frac
    }
}

impl Voice for PadVoice {
    /// The note holds for the full `duration`, then releases past it.
    fn render(&mut self, frequency: f64, duration: f64, velocity: f64, sample_rate: u32) -> Vec<f32> {
        if velocity <= 0.0 {
            return Vec::new();
        }
        let env = self.envelope;
        let gate = duration.max(0.0);
        let sr = sample_rate as f64;

        let detunes = [0.0, self.detune_cents, -self.detune_cents];
        let mut layers: Vec<(Oscillator, f64, f64)> = LAYERS
            .iter()
            .zip(detunes)
            .enumerate()
            .map(|(i, (&wave, cents))| {
                (
                    Oscillator::new(wave, sample_rate),
                    frequency * cents_to_ratio(cents),
                    velocity * 0.4 / (i + 1) as f64,
                )
            })
            .collect();

        let mut filter = Filter::low_pass(sample_rate, self.cutoff, 0.5);
        let mut chorus = DelayLine::new(((CHORUS_DELAY + CHORUS_DEPTH) * sr) as usize + 2);
        let (cutoff, volume) = (self.cutoff, self.volume);

        render_frames(sample_rate, env.total_duration(gate), |i, t| {
            if i % CONTROL_INTERVAL == 0 {
                let lfo = oscillator(Waveform::Sine, (FILTER_LFO_RATE * t).fract());
                filter.set_cutoff(cutoff + lfo * FILTER_LFO_DEPTH);
            }
            let level = env.amplitude(t, gate);
            let mut direct = 0.0;
            let mut centre = 0.0;
            for (idx, (osc, freq, peak)) in layers.iter_mut().enumerate() {
                let s = osc.next(*freq) * level * *peak;
                if idx == 0 {
                    centre = s;
                }
                direct += s;
            }
            let sweep = oscillator(Waveform::Triangle, (CHORUS_RATE * t).fract());
            let delayed = chorus.process(centre, (CHORUS_DELAY + sweep * CHORUS_DEPTH) * sr);
            (filter.process(direct) + delayed) * volume
        })
    }

    fn name(&self) -> &'static str {
        "pad"
    }
}
