//! Resonant biquad filter with a movable cutoff.
//!
//! Wraps the `biquad` crate's RBJ cookbook coefficients in the shape the
//! voices need: a kind, a centre/cutoff frequency and a Q that can be swept
//! while the note renders.

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

/// Response shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    BandPass,
}

/// Lowest cutoff the filter accepts.
const MIN_CUTOFF: f64 = 10.0;

/// Samples between coefficient updates while a cutoff is being swept.
pub const CONTROL_INTERVAL: usize = 16;

const PASS_THROUGH: Coefficients<f32> = Coefficients {
    a1: 0.0,
    a2: 0.0,
    b0: 1.0,
    b1: 0.0,
    b2: 0.0,
};

pub struct Filter {
    kind: FilterKind,
    sample_rate: f64,
    q: f64,
    cutoff: f64,
    state: DirectForm2Transposed<f32>,
}

impl Filter {
    pub fn new(kind: FilterKind, sample_rate: u32, cutoff: f64, q: f64) -> Self {
        let sample_rate = sample_rate as f64;
        let cutoff = clamp_cutoff(cutoff, sample_rate);
        let coeffs = coefficients(kind, sample_rate, cutoff, q).unwrap_or(PASS_THROUGH);
        Self {
            kind,
            sample_rate,
            q,
            cutoff,
            state: DirectForm2Transposed::<f32>::new(coeffs),
        }
    }

    pub fn low_pass(sample_rate: u32, cutoff: f64, q: f64) -> Self {
        Self::new(FilterKind::LowPass, sample_rate, cutoff, q)
    }

    pub fn high_pass(sample_rate: u32, cutoff: f64, q: f64) -> Self {
        Self::new(FilterKind::HighPass, sample_rate, cutoff, q)
    }

    pub fn band_pass(sample_rate: u32, centre: f64, q: f64) -> Self {
        Self::new(FilterKind::BandPass, sample_rate, centre, q)
    }

    /// Move the cutoff, keeping the filter's internal state.
    pub fn set_cutoff(&mut self, cutoff: f64) {
        let cutoff = clamp_cutoff(cutoff, self.sample_rate);
        if (cutoff - self.cutoff).abs() < 0.01 {
            return;
        }
        if let Some(coeffs) = coefficients(self.kind, self.sample_rate, cutoff, self.q) {
            self.state.update_coefficients(coeffs);
            self.cutoff = cutoff;
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn process(&mut self, sample: f64) -> f64 {
        self.state.run(sample as f32) as f64
    }
}

/// Keep the cutoff strictly inside (0, Nyquist).
fn clamp_cutoff(cutoff: f64, sample_rate: f64) -> f64 {
    cutoff.clamp(MIN_CUTOFF, sample_rate * 0.45)
}

fn coefficients(
    kind: FilterKind,
    sample_rate: f64,
    cutoff: f64,
    q: f64,
) -> Option<Coefficients<f32>> {
    let response = match kind {
        FilterKind::LowPass => Type::LowPass,
        FilterKind::HighPass => Type::HighPass,
        FilterKind::BandPass => Type::BandPass,
    };
    Coefficients::<f32>::from_params(
        response,
        (sample_rate as f32).hz(),
        (cutoff as f32).hz(),
        q.max(0.01) as f32,
    )
    .ok()
}
