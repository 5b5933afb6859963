//! Audio output: the single shared output context every voice plays into.
//!
//! Voices render whole notes up front; an [`AudioOutput`] starts each buffer
//! at an absolute time on its [`Clock`]. The device implementation sends
//! generators to the cpal callback over a lock-free ring buffer; the offline
//! implementation keeps them in memory for tests and simulation.

pub mod callback;
pub mod clock;
pub mod command;
pub mod device;
pub mod limiter;
pub mod offline;

use std::sync::Arc;

use thiserror::Error;

pub use clock::{Clock, FrameClock, ManualClock};
pub use command::{AudioCommand, Generator};
pub use device::DeviceOutput;
pub use limiter::Limiter;
pub use offline::{OfflineOutput, ScheduledBuffer};

/// Audio output errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    #[error("no audio output device found")]
    NoOutputDevice,
    #[error("device config error: {0}")]
    DeviceConfig(String),
    #[error("stream build error: {0}")]
    StreamBuild(String),
    #[error("stream play error: {0}")]
    StreamPlay(String),
    /// The audio thread is not draining commands fast enough.
    #[error("audio command ring buffer is full")]
    BufferFull,
    #[error("audio output is closed")]
    Closed,
}

/// A place to start generators.
pub trait AudioOutput: Send {
    fn sample_rate(&self) -> u32;

    /// The clock that `schedule` times are measured on.
    fn clock(&self) -> Arc<dyn Clock>;

    /// Start a mono buffer at `start_time` seconds on the output clock.
    /// Times already in the past start immediately.
    fn schedule(&mut self, start_time: f64, samples: Vec<f32>) -> Result<(), AudioError>;

    /// Force-stop every generator that is still sounding or pending.
    fn stop_all(&mut self) -> Result<(), AudioError>;

    fn active_generators(&self) -> usize;

    /// Release the output. Later calls fail with [`AudioError::Closed`].
    fn close(&mut self);
}
