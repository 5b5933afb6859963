//! Master limiter: hard clamp on the summed output of every generator.

/// Default ceiling, a little below full scale.
pub const DEFAULT_CEILING: f32 = 0.95;

/// Hard limiter that clamps samples to `[-ceiling, ceiling]`.
#[derive(Debug, Clone)]
pub struct Limiter {
    ceiling: f32,
}

impl Limiter {
    /// Create a limiter; the ceiling is clamped into `(0.0, 1.0]`.
    pub fn new(ceiling: f32) -> Self {
        Self {
            ceiling: ceiling.clamp(f32::EPSILON, 1.0),
        }
    }

    #[inline]
    pub fn process(&self, sample: f32) -> f32 {
        if sample.is_nan() {
            return 0.0;
        }
        sample.clamp(-self.ceiling, self.ceiling)
    }

    /// Clamp an entire buffer in place.
    #[inline]
    pub fn process_block(&self, buffer: &mut [f32]) {
        for sample in buffer.iter_mut() {
            *sample = self.process(*sample);
        }
    }

    pub fn ceiling(&self) -> f32 {
        self.ceiling
    }
}

impl Default for Limiter {
    fn default() -> Self {
        Self::new(DEFAULT_CEILING)
    }
}
