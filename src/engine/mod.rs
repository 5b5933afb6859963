//! The audio engine: voice registry, transport state and note dispatch.
//!
//! The engine turns note names and beat durations into voice calls on the
//! shared [`AudioOutput`]. It owns no timing loop; callers decide when to
//! play and pass the delay as a start offset.

pub mod transport;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::audio::{AudioError, AudioOutput, Clock, DeviceOutput};
use crate::dsl::{frequency, NoteError};
use crate::instrument::{InstrumentKind, SineVoice, Voice, VoiceSink};

pub use transport::{
    TransportState, DEFAULT_BPM, DEFAULT_MASTER_VOLUME, FAST_MODIFIER, NORMAL_MODIFIER,
    SLOW_MODIFIER,
};

/// Velocity of every note the engine plays.
const NOTE_VELOCITY: f64 = 1.0;

/// Master volume range accepted by [`AudioEngine::set_master_volume`].
pub const MAX_MASTER_VOLUME: f64 = 1.5;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("audio engine is not initialized")]
    NotInitialized,
    #[error("unknown instrument '{0}'")]
    UnknownInstrument(String),
    #[error(transparent)]
    InvalidNote(#[from] NoteError),
    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// Adapts an output to the voice interface: offsets are taken relative to
/// the clock time captured when the sink was made, and every buffer is
/// scaled by the master volume.
struct OutputSink<'a> {
    output: &'a mut dyn AudioOutput,
    now: f64,
    gain: f32,
}

impl<'a> OutputSink<'a> {
    fn new(output: &'a mut dyn AudioOutput, gain: f64) -> Self {
        let now = output.clock().now();
        Self {
            output,
            now,
            gain: gain as f32,
        }
    }
}

impl VoiceSink for OutputSink<'_> {
    fn sample_rate(&self) -> u32 {
        self.output.sample_rate()
    }

    fn start(&mut self, start_offset: f64, mut samples: Vec<f32>) -> Result<(), AudioError> {
        if self.gain != 1.0 {
            samples.iter_mut().for_each(|s| *s *= self.gain);
        }
        self.output.schedule(self.now + start_offset.max(0.0), samples)
    }
}

pub struct AudioEngine {
    voices: HashMap<InstrumentKind, Box<dyn Voice>>,
    fallback: SineVoice,
    output: Option<Box<dyn AudioOutput>>,
    transport: TransportState,
    seed: u64,
    sample_rate: Option<u32>,
}

impl AudioEngine {
    /// An engine that opens the default device on [`initialize`](Self::initialize).
    pub fn new() -> Self {
        Self {
            voices: HashMap::new(),
            fallback: SineVoice::new(),
            output: None,
            transport: TransportState::default(),
            seed: 42,
            sample_rate: None,
        }
    }

    /// An engine that plays into `output` instead of a device.
    pub fn with_output(output: Box<dyn AudioOutput>) -> Self {
        Self {
            output: Some(output),
            ..Self::new()
        }
    }

    /// Seed for the noise-based voices.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Device sample rate to request instead of the device default.
    pub fn sample_rate(mut self, sample_rate: Option<u32>) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Open the output if needed and build the voices. Idempotent.
    pub fn initialize(&mut self) -> Result<(), EngineError> {
        if self.output.is_none() {
            self.output = Some(Box::new(DeviceOutput::open(self.sample_rate)?));
        }
        if self.voices.is_empty() {
            for kind in InstrumentKind::ALL {
                if kind != InstrumentKind::Default {
                    self.voices.insert(kind, kind.voice(self.seed));
                }
            }
            tracing::debug!(voices = self.voices.len(), "audio engine initialized");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.output.is_some() && !self.voices.is_empty()
    }

    /// The output clock, once initialized.
    pub fn clock(&self) -> Option<Arc<dyn Clock>> {
        self.output.as_ref().map(|o| o.clock())
    }

    pub fn play_note(&mut self, note: &str, beats: f64, start_offset: f64) -> Result<(), EngineError> {
        let frequency = frequency(note)?;
        let duration = self.transport.seconds_for(beats);
        self.dispatch(|voice, sink| {
            voice.play_note(sink, frequency, duration, start_offset, NOTE_VELOCITY)
        })
    }

    pub fn play_chord<S: AsRef<str>>(
        &mut self,
        notes: &[S],
        beats: f64,
        start_offset: f64,
    ) -> Result<(), EngineError> {
        let frequencies = notes
            .iter()
            .map(|n| frequency(n.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let duration = self.transport.seconds_for(beats);
        self.dispatch(|voice, sink| {
            voice.play_chord(sink, &frequencies, duration, start_offset, NOTE_VELOCITY)
        })
    }

    /// Rests make no sound; the caller owns the timing.
    pub fn play_rest(&self, _beats: f64) {}

    fn dispatch(
        &mut self,
        play: impl FnOnce(&mut dyn Voice, &mut dyn VoiceSink) -> Result<(), AudioError>,
    ) -> Result<(), EngineError> {
        let Self {
            voices,
            fallback,
            output,
            transport,
            ..
        } = self;
        let output = output.as_deref_mut().ok_or(EngineError::NotInitialized)?;
        let voice: &mut dyn Voice = match voices.get_mut(&transport.current_instrument) {
            Some(voice) => voice.as_mut(),
            None => fallback,
        };
        let mut sink = OutputSink::new(output, transport.master_volume);
        play(voice, &mut sink)?;
        Ok(())
    }

    /// Select an instrument by name (case-insensitive).
    pub fn set_current_instrument(&mut self, name: &str) -> Result<InstrumentKind, EngineError> {
        let kind = name
            .parse::<InstrumentKind>()
            .map_err(|_| EngineError::UnknownInstrument(name.to_string()))?;
        self.transport.current_instrument = kind;
        Ok(kind)
    }

    pub fn current_instrument(&self) -> InstrumentKind {
        self.transport.current_instrument
    }

    pub fn set_slow(&mut self) {
        self.transport.time_modifier = SLOW_MODIFIER;
    }

    pub fn set_fast(&mut self) {
        self.transport.time_modifier = FAST_MODIFIER;
    }

    pub fn set_normal_speed(&mut self) {
        self.transport.time_modifier = NORMAL_MODIFIER;
    }

    pub fn time_modifier(&self) -> f64 {
        self.transport.time_modifier
    }

    /// Seconds per beat: `(60 / bpm) / time_modifier`.
    pub fn beat_duration(&self) -> f64 {
        self.transport.beat_duration()
    }

    pub fn set_tempo(&mut self, bpm: f64) {
        self.transport.bpm = transport::sanitize_bpm(bpm);
    }

    pub fn tempo(&self) -> f64 {
        self.transport.bpm
    }

    /// Clamped to `0.0..=MAX_MASTER_VOLUME`; non-finite values reset to the default.
    pub fn set_master_volume(&mut self, volume: f64) {
        self.transport.master_volume = if volume.is_finite() {
            volume.clamp(0.0, MAX_MASTER_VOLUME)
        } else {
            DEFAULT_MASTER_VOLUME
        };
    }

    pub fn master_volume(&self) -> f64 {
        self.transport.master_volume
    }

    /// Snapshot of the transport.
    pub fn transport(&self) -> TransportState {
        self.transport
    }

    pub fn restore_transport(&mut self, state: TransportState) {
        self.transport = state;
    }

    /// Back to defaults at `bpm`, keeping the master volume.
    pub fn reset_transport(&mut self, bpm: f64) {
        self.transport = TransportState {
            master_volume: self.transport.master_volume,
            ..TransportState::new(bpm)
        };
    }

    pub fn active_generators(&self) -> usize {
        self.output.as_ref().map_or(0, |o| o.active_generators())
    }

    /// Force-stop every sounding or pending generator.
    pub fn stop(&mut self) {
        if let Some(output) = self.output.as_mut() {
            if let Err(e) = output.stop_all() {
                tracing::warn!("failed to stop generators: {e}");
            }
        }
    }

    /// Stop, release the output and drop the voices.
    pub fn dispose(&mut self) {
        self.stop();
        if let Some(mut output) = self.output.take() {
            output.close();
        }
        self.voices.clear();
        tracing::debug!("audio engine disposed");
    }
}

impl Default for AudioEngine {
    fn default() -> Self {
        Self::new()
    }
}
