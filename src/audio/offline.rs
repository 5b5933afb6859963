//! In-memory output driven by a [`ManualClock`].
//!
//! Nothing is played; generators are kept so tests (and `check --simulate`)
//! can see what was scheduled and mix down any stretch of the result.
//! Handles are cheap clones sharing one state, so a test can keep one while
//! the engine owns another.

use std::sync::{Arc, Mutex, MutexGuard};

use super::clock::{Clock, ManualClock};
use super::command::Generator;
use super::limiter::Limiter;
use super::{AudioError, AudioOutput};

/// One `schedule` call as seen by the output.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledBuffer {
    /// Clock time the buffer was asked to start at.
    pub start_time: f64,
    /// Length of the buffer in seconds.
    pub duration: f64,
    /// Largest absolute sample value.
    pub peak: f32,
}

#[derive(Default)]
struct State {
    generators: Vec<Generator>,
    log: Vec<ScheduledBuffer>,
    stop_count: usize,
    closed: bool,
}

#[derive(Clone)]
pub struct OfflineOutput {
    sample_rate: u32,
    clock: Arc<ManualClock>,
    state: Arc<Mutex<State>>,
}

impl OfflineOutput {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            clock: Arc::new(ManualClock::new()),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    pub fn manual_clock(&self) -> Arc<ManualClock> {
        Arc::clone(&self.clock)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn frame_at(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate as f64).round() as u64
    }

    /// Every buffer scheduled so far, in call order.
    pub fn scheduled(&self) -> Vec<ScheduledBuffer> {
        self.lock().log.clone()
    }

    /// How many times `stop_all` has been called.
    pub fn stop_count(&self) -> usize {
        self.lock().stop_count
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Mix `[from, to)` seconds of every surviving generator, through the
    /// master limiter.
    pub fn mixdown(&self, from: f64, to: f64) -> Vec<f32> {
        let start = self.frame_at(from);
        let end = self.frame_at(to).max(start);
        let mut out = vec![0.0f32; (end - start) as usize];
        for generator in &self.lock().generators {
            generator.mix_into(start, &mut out);
        }
        Limiter::default().process_block(&mut out);
        out
    }
}

impl AudioOutput for OfflineOutput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn clock(&self) -> Arc<dyn Clock> {
        self.clock.clone()
    }

    fn schedule(&mut self, start_time: f64, samples: Vec<f32>) -> Result<(), AudioError> {
        let now = self.clock.now();
        let start_frame = self.frame_at(start_time.max(now));
        let entry = ScheduledBuffer {
            start_time,
            duration: samples.len() as f64 / self.sample_rate as f64,
            peak: samples.iter().fold(0.0f32, |m, s| m.max(s.abs())),
        };
        let mut state = self.lock();
        if state.closed {
            return Err(AudioError::Closed);
        }
        state.log.push(entry);
        state.generators.push(Generator::new(start_frame, samples));
        Ok(())
    }

    /// Cut every generator at the current clock time.
    fn stop_all(&mut self) -> Result<(), AudioError> {
        let now = self.frame_at(self.clock.now());
        let mut state = self.lock();
        state.stop_count += 1;
        for generator in state.generators.iter_mut() {
            generator.truncate_at(now);
        }
        state.generators.retain(|g| !g.samples.is_empty());
        Ok(())
    }

    fn active_generators(&self) -> usize {
        let now = self.frame_at(self.clock.now());
        self.lock()
            .generators
            .iter()
            .filter(|g| !g.is_finished(now))
            .count()
    }

    fn close(&mut self) {
        self.lock().closed = true;
    }
}
