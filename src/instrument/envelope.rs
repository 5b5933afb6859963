//! Amplitude shapes: the four-stage ADSR envelope shared by pitched voices
//! and breakpoint automation for percussive multi-stage decays.

/// Attack-Decay-Sustain-Release envelope.
///
/// All time values are in seconds. Sustain is a fraction of the peak (0.0 to 1.0).
#[derive(Debug, Clone, Copy)]
pub struct AdsrEnvelope {
    pub attack: f64,
    pub decay: f64,
    pub sustain: f64,
    pub release: f64,
}

impl AdsrEnvelope {
    /// Level at time `t` of a note released at `gate` seconds, peak 1.0.
    ///
    /// - During `[0, attack)`: linear ramp from 0 to 1.
    /// - During `[attack, attack+decay)`: linear ramp from 1 to sustain.
    /// - During `[attack+decay, gate)`: sustain level.
    /// - During `[gate, gate+release)`: linear ramp from the level reached
    ///   at `gate` down to 0.
    /// - After `gate+release`: 0.
    pub fn amplitude(&self, t: f64, gate: f64) -> f64 {
        if t < 0.0 {
            return 0.0;
        }
        if t < gate {
            return self.held_level(t);
        }

        let release_t = t - gate;
        if self.release <= 0.0 || release_t >= self.release {
            return 0.0;
        }
        self.held_level(gate) * (1.0 - release_t / self.release)
    }

    /// Level while the note is held (before release).
    fn held_level(&self, t: f64) -> f64 {
        if t < self.attack {
            t / self.attack
        } else if t < self.attack + self.decay {
            let decay_t = (t - self.attack) / self.decay;
            1.0 - decay_t * (1.0 - self.sustain)
        } else {
            self.sustain
        }
    }

    /// Gate time for a note whose release must finish within `duration`.
    pub fn fitted_gate(&self, duration: f64) -> f64 {
        (duration - self.release).max(0.0)
    }

    /// Total sound duration including release tail.
    pub fn total_duration(&self, gate: f64) -> f64 {
        gate + self.release
    }
}

/// Interpolation used to reach a breakpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Curve {
    Linear,
    Exponential,
}

/// Floor for exponential segments, which cannot cross zero.
const EXP_FLOOR: f64 = 1e-4;

#[derive(Debug, Clone, Copy)]
struct Breakpoint {
    time: f64,
    value: f64,
    curve: Curve,
}

/// Piecewise parameter automation, built as a chain of ramps.
///
/// ```
/// use sythm::instrument::envelope::Automation;
/// let gain = Automation::new(0.0)
///     .linear_to(1.0, 0.001)
///     .exponential_to(0.001, 0.2);
/// assert_eq!(gain.value_at(0.001), 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct Automation {
    initial: f64,
    points: Vec<Breakpoint>,
}

impl Automation {
    /// Start at `initial` from time zero.
    pub fn new(initial: f64) -> Self {
        Self {
            initial,
            points: Vec::new(),
        }
    }

    /// Ramp linearly to `value`, arriving at `time`.
    pub fn linear_to(self, value: f64, time: f64) -> Self {
        self.push(value, time, Curve::Linear)
    }

    /// Ramp exponentially to `value`, arriving at `time`.
    pub fn exponential_to(self, value: f64, time: f64) -> Self {
        self.push(value, time, Curve::Exponential)
    }

    fn push(mut self, value: f64, time: f64, curve: Curve) -> Self {
        let floor = self.points.last().map_or(0.0, |p| p.time);
        self.points.push(Breakpoint {
            time: time.max(floor),
            value,
            curve,
        });
        self
    }

    /// Value at time `t` (seconds from note start).
    pub fn value_at(&self, t: f64) -> f64 {
        let mut prev_time = 0.0;
        let mut prev_value = self.initial;

        for point in &self.points {
            if t < point.time {
                let span = point.time - prev_time;
                if span <= 0.0 {
                    return point.value;
                }
                let x = ((t - prev_time) / span).clamp(0.0, 1.0);
                return interpolate(prev_value, point.value, x, point.curve);
            }
            prev_time = point.time;
            prev_value = point.value;
        }

        prev_value
    }

    /// Time of the last breakpoint.
    pub fn end_time(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.time)
    }
}

fn interpolate(from: f64, to: f64, x: f64, curve: Curve) -> f64 {
    match curve {
        Curve::Linear => from + (to - from) * x,
        Curve::Exponential if from.signum() == to.signum() || from == 0.0 => {
            let a = from.abs().max(EXP_FLOOR);
            let b = to.abs().max(EXP_FLOOR);
            to.signum() * a * (b / a).powf(x)
        }
        Curve::Exponential => from + (to - from) * x,
    }
}
