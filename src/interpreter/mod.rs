//! Program execution.
//!
//! The [`Interpreter`] owns the audio engine and the multitrack scheduler.
//! `execute` picks a mode from the program shape: any top-level `track`
//! selects multitrack playback through the scheduler, otherwise statements
//! are walked one after another in real time. `execute` blocks; every other
//! method may be called from another thread while it runs.

pub mod events;
mod multitrack;
mod sequential;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::audio::Clock;
use crate::config::SythmConfig;
use crate::dsl::Program;
use crate::engine::transport::sanitize_bpm;
use crate::engine::{AudioEngine, TransportState, DEFAULT_BPM};
use crate::error::{Located, RuntimeError};
use crate::event::{MultiTrackScheduler, PatternTable, TrackSnapshot, SCHEDULE_AHEAD, TICK_INTERVAL};
use crate::instrument::available_instruments;

pub use events::{EventBus, PlaybackEvent, DEFAULT_CHANNEL_CAPACITY};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential,
    Multitrack,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Completed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterOptions {
    pub bpm: f64,
    /// Period of the scheduling loop and the slice size of sequential waits.
    pub tick_interval: Duration,
    pub lookahead: Duration,
    pub channel_capacity: usize,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            tick_interval: TICK_INTERVAL,
            lookahead: SCHEDULE_AHEAD,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl From<&SythmConfig> for InterpreterOptions {
    fn from(config: &SythmConfig) -> Self {
        Self {
            bpm: config.bpm,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            lookahead: Duration::from_millis(config.lookahead_ms),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Read-only view for status displays and mixers.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpreterState {
    pub is_running: bool,
    pub is_paused: bool,
    pub mode: Option<ExecutionMode>,
    pub playhead_beats: f64,
    pub transport: TransportState,
    pub tracks: Vec<TrackSnapshot>,
    pub instruments: Vec<(&'static str, &'static str)>,
}

pub struct Interpreter {
    engine: Mutex<AudioEngine>,
    scheduler: Mutex<MultiTrackScheduler>,
    events: EventBus,
    options: InterpreterOptions,
    running: AtomicBool,
    stop_requested: AtomicBool,
    paused: AtomicBool,
    mode: Mutex<Option<ExecutionMode>>,
    /// Base tempo, as f64 bits.
    tempo: AtomicU64,
    /// Sequential playhead in beats, as f64 bits.
    playhead: AtomicU64,
}

impl Interpreter {
    pub fn new(engine: AudioEngine, options: InterpreterOptions) -> Self {
        let tempo = sanitize_bpm(options.bpm);
        Self {
            engine: Mutex::new(engine),
            scheduler: Mutex::new(MultiTrackScheduler::new(tempo)),
            events: EventBus::new(options.channel_capacity),
            options,
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            mode: Mutex::new(None),
            tempo: AtomicU64::new(tempo.to_bits()),
            playhead: AtomicU64::new(0.0f64.to_bits()),
        }
    }

    /// Receive [`PlaybackEvent`]s from every later run.
    pub fn subscribe(&self) -> crossbeam_channel::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    pub fn options(&self) -> &InterpreterOptions {
        &self.options
    }

    /// Play `program` to the end, or until [`stop`](Self::stop).
    ///
    /// In sequential mode the first runtime error aborts the run and is
    /// returned. In multitrack mode failures are reported as
    /// [`PlaybackEvent::Error`] and playback carries on.
    pub fn execute(&self, program: &Program) -> Result<ExecutionOutcome, Located<RuntimeError>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Located::unlocated(RuntimeError::AlreadyRunning));
        }
        self.stop_requested.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.set_playhead(0.0);

        let result = self.run(program);
        match &result {
            Ok(ExecutionOutcome::Completed) => {
                tracing::info!("playback complete");
                self.events.emit(PlaybackEvent::Complete);
            }
            Ok(ExecutionOutcome::Stopped) => tracing::info!("playback stopped"),
            Err(e) => {
                tracing::debug!("playback aborted: {e}");
                self.events.emit(PlaybackEvent::error(e));
            }
        }

        *self.lock_mode() = None;
        self.running.store(false, Ordering::SeqCst);
        result
    }

    fn run(&self, program: &Program) -> Result<ExecutionOutcome, Located<RuntimeError>> {
        let clock = {
            let mut engine = self.lock_engine();
            engine.reset_transport(self.tempo());
            engine
                .initialize()
                .map_err(|e| Located::unlocated(RuntimeError::from(e)))?;
            engine
                .clock()
                .ok_or_else(|| Located::unlocated(RuntimeError::EngineNotInitialized))?
        };

        let patterns = PatternTable::collect(program);
        let mode = if program.is_multitrack() {
            ExecutionMode::Multitrack
        } else {
            ExecutionMode::Sequential
        };
        *self.lock_mode() = Some(mode);
        tracing::info!(?mode, patterns = patterns.len(), bpm = self.tempo(), "playback started");

        match mode {
            ExecutionMode::Sequential => sequential::run(self, program, &patterns, clock),
            ExecutionMode::Multitrack => multitrack::run(self, program, &patterns, clock),
        }
    }

    /// Stop playback immediately and silence everything. Idempotent.
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        let mut engine = self.lock_engine();
        let mut scheduler = self.lock_scheduler();
        scheduler.stop(&mut engine);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> Option<ExecutionMode> {
        *self.lock_mode()
    }

    /// Suspend playback without losing the position.
    pub fn pause(&self) {
        if !self.is_running() || self.paused.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(now) = self.clock_now() {
            self.lock_scheduler().pause(now);
        }
    }

    pub fn resume(&self) {
        if !self.paused.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(now) = self.clock_now() {
            self.lock_scheduler().resume(now);
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    /// Change the tempo. Sequential playback picks it up from the next note;
    /// multitrack playback from the next run.
    pub fn update_tempo(&self, bpm: f64) {
        if !(bpm.is_finite() && bpm > 0.0) {
            tracing::warn!(bpm, "ignoring invalid tempo");
            return;
        }
        self.tempo.store(bpm.to_bits(), Ordering::SeqCst);
        self.lock_engine().set_tempo(bpm);
        self.lock_scheduler().set_tempo(bpm);
        tracing::debug!(bpm, "tempo updated");
    }

    pub fn tempo(&self) -> f64 {
        f64::from_bits(self.tempo.load(Ordering::SeqCst))
    }

    // --- Mixer controls, multitrack only ---

    pub fn mute_track(&self, name: &str) -> bool {
        self.with_track(name, |s, id| s.mute(id))
    }

    pub fn unmute_track(&self, name: &str) -> bool {
        self.with_track(name, |s, id| s.unmute(id))
    }

    pub fn solo_track(&self, name: &str) -> bool {
        self.with_track(name, |s, id| s.solo(id))
    }

    pub fn unsolo_track(&self, name: &str) -> bool {
        self.with_track(name, |s, id| s.unsolo(id))
    }

    pub fn set_track_volume(&self, name: &str, volume: f64) -> bool {
        self.with_track(name, |s, id| s.set_volume(id, volume))
    }

    fn with_track(
        &self,
        name: &str,
        apply: impl FnOnce(&mut MultiTrackScheduler, crate::event::TrackId) -> bool,
    ) -> bool {
        if self.mode() != Some(ExecutionMode::Multitrack) {
            return false;
        }
        let mut scheduler = self.lock_scheduler();
        match scheduler.find_track(name) {
            Some(id) => apply(&mut scheduler, id),
            None => {
                tracing::debug!(track = %name, "no such track");
                false
            }
        }
    }

    pub fn state(&self) -> InterpreterState {
        let mode = self.mode();
        let transport = self.lock_engine().transport();
        let scheduler = self.lock_scheduler();
        let playhead_beats = match mode {
            Some(ExecutionMode::Multitrack) => scheduler.playhead(),
            _ => self.playhead(),
        };
        InterpreterState {
            is_running: self.is_running(),
            is_paused: self.is_paused(),
            mode,
            playhead_beats,
            transport,
            tracks: scheduler.snapshots(),
            instruments: available_instruments(),
        }
    }

    /// Stop and release the audio output.
    pub fn dispose(&self) {
        self.stop();
        self.lock_engine().dispose();
    }

    // --- Internals shared with the mode runners ---

    pub(crate) fn lock_engine(&self) -> MutexGuard<'_, AudioEngine> {
        self.engine.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn lock_scheduler(&self) -> MutexGuard<'_, MultiTrackScheduler> {
        self.scheduler.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_mode(&self) -> MutexGuard<'_, Option<ExecutionMode>> {
        self.mode.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clock_now(&self) -> Option<f64> {
        self.lock_engine().clock().map(|c| c.now())
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn emit(&self, event: PlaybackEvent) {
        self.events.emit(event);
    }

    fn playhead(&self) -> f64 {
        f64::from_bits(self.playhead.load(Ordering::SeqCst))
    }

    pub(crate) fn set_playhead(&self, beats: f64) {
        self.playhead.store(beats.to_bits(), Ordering::SeqCst);
    }

    /// Sleep on `clock` until `target`, in tick-sized slices. Time spent
    /// paused is added to the returned target. `None` when stopped.
    pub(crate) fn wait_until(&self, clock: &Arc<dyn Clock>, mut target: f64) -> Option<f64> {
        let tick = self.options.tick_interval.as_secs_f64().max(1e-3);
        loop {
            if self.stop_requested() {
                return None;
            }
            if self.is_paused() {
                let paused_at = clock.now();
                while self.is_paused() && !self.stop_requested() {
                    clock.sleep(tick);
                }
                target += clock.now() - paused_at;
                continue;
            }
            let now = clock.now();
            if now >= target {
                return Some(target);
            }
            clock.sleep((target - now).min(tick));
        }
    }
}
