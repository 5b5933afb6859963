//! Instruments: synthesis voices and the DSP primitives they share.
//!
//! Every voice renders a note into a mono buffer and hands it to a
//! [`VoiceSink`], which schedules it on the audio output at an offset from
//! the current clock time. Buffers end where the note's sound ends, so
//! generators terminate on their own.

pub mod bass;
pub mod envelope;
pub mod fallback;
pub mod filter;
pub mod hihat;
pub mod kick;
pub mod lead;
pub mod noise;
pub mod oscillator;
pub mod pad;
pub mod snare;

pub use bass::BassVoice;
pub use fallback::SineVoice;
pub use hihat::HiHatVoice;
pub use kick::KickVoice;
pub use lead::LeadVoice;
pub use pad::PadVoice;
pub use snare::SnareVoice;

use std::fmt;
use std::str::FromStr;

use crate::audio::AudioError;

/// Destination for rendered notes.
pub trait VoiceSink {
    fn sample_rate(&self) -> u32;

    /// Start `samples` `start_offset` seconds from now.
    fn start(&mut self, start_offset: f64, samples: Vec<f32>) -> Result<(), AudioError>;
}

/// Common interface for all instrument voices.
pub trait Voice: Send {
    /// Render one note of `duration` seconds into mono samples.
    ///
    /// The buffer includes any release tail the voice adds past `duration`.
    fn render(&mut self, frequency: f64, duration: f64, velocity: f64, sample_rate: u32)
        -> Vec<f32>;

    /// Lowercase instrument name.
    fn name(&self) -> &'static str;

    fn play_note(
        &mut self,
        sink: &mut dyn VoiceSink,
        frequency: f64,
        duration: f64,
        start_offset: f64,
        velocity: f64,
    ) -> Result<(), AudioError> {
        let samples = self.render(frequency, duration, velocity, sink.sample_rate());
        if samples.is_empty() {
            return Ok(());
        }
        sink.start(start_offset, samples)
    }

    /// Play every note of a chord, attenuated so stacked notes stay balanced.
    fn play_chord(
        &mut self,
        sink: &mut dyn VoiceSink,
        frequencies: &[f64],
        duration: f64,
        start_offset: f64,
        velocity: f64,
    ) -> Result<(), AudioError> {
        if frequencies.is_empty() {
            return Ok(());
        }
        let velocity = velocity / (frequencies.len() as f64).sqrt();
        for &frequency in frequencies {
            self.play_note(sink, frequency, duration, start_offset, velocity)?;
        }
        Ok(())
    }
}

/// Render `length` seconds at `sample_rate`, calling `sample(index, t)` per frame.
pub(crate) fn render_frames(
    sample_rate: u32,
    length: f64,
    mut sample: impl FnMut(usize, f64) -> f64,
) -> Vec<f32> {
    if length.is_nan() || length <= 0.0 {
        return Vec::new();
    }
    let frames = (length * sample_rate as f64).round() as usize;
    let dt = 1.0 / sample_rate as f64;
    (0..frames)
        .map(|i| sample(i, i as f64 * dt) as f32)
        .collect()
}

/// The instrument types a program can select with `@name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstrumentKind {
    #[default]
    Default,
    Bass,
    Lead,
    Pad,
    Kick,
    Snare,
    HiHat,
    OpenHat,
}

impl InstrumentKind {
    pub const ALL: [InstrumentKind; 8] = [
        InstrumentKind::Default,
        InstrumentKind::Bass,
        InstrumentKind::Lead,
        InstrumentKind::Pad,
        InstrumentKind::Kick,
        InstrumentKind::Snare,
        InstrumentKind::HiHat,
        InstrumentKind::OpenHat,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InstrumentKind::Default => "default",
            InstrumentKind::Bass => "bass",
            InstrumentKind::Lead => "lead",
            InstrumentKind::Pad => "pad",
            InstrumentKind::Kick => "kick",
            InstrumentKind::Snare => "snare",
            InstrumentKind::HiHat => "hihat",
            InstrumentKind::OpenHat => "openhat",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InstrumentKind::Default => "Plain sine tone",
            InstrumentKind::Bass => "Saw bass with sub octave and filter sweep",
            InstrumentKind::Lead => "Gliding saw lead with vibrato",
            InstrumentKind::Pad => "Detuned chorus pad with slow attack",
            InstrumentKind::Kick => "Pitch-swept kick drum",
            InstrumentKind::Snare => "Snare drum with noise burst",
            InstrumentKind::HiHat => "Closed hi-hat",
            InstrumentKind::OpenHat => "Open hi-hat",
        }
    }

    /// Build the voice that plays this instrument.
    pub fn voice(self, seed: u64) -> Box<dyn Voice> {
        match self {
            InstrumentKind::Default => Box::new(SineVoice::new()),
            InstrumentKind::Bass => Box::new(BassVoice::new()),
            InstrumentKind::Lead => Box::new(LeadVoice::new()),
            InstrumentKind::Pad => Box::new(PadVoice::new()),
            InstrumentKind::Kick => Box::new(KickVoice::new()),
            InstrumentKind::Snare => Box::new(SnareVoice::new(seed)),
            InstrumentKind::HiHat => Box::new(HiHatVoice::closed(seed)),
            InstrumentKind::OpenHat => Box::new(HiHatVoice::open(seed.wrapping_add(1))),
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when an instrument name matches no known kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownInstrument(pub String);

impl FromStr for InstrumentKind {
    type Err = UnknownInstrument;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        InstrumentKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| UnknownInstrument(s.to_string()))
    }
}

/// `(name, description)` for every selectable instrument.
pub fn available_instruments() -> Vec<(&'static str, &'static str)> {
    InstrumentKind::ALL
        .iter()
        .map(|kind| (kind.name(), kind.description()))
        .collect()
}
