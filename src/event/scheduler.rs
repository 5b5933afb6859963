//! Look-ahead scheduler for multitrack playback.
//!
//! `start` anchors every event of every audible track to the audio clock
//! once. Each `tick` then dispatches the events whose absolute time falls
//! inside the look-ahead window, handing the engine the exact delay to the
//! event's clock time. Tick jitter only changes how early an event is sent,
//! never when it sounds.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use super::beat::Beat;
use super::timeline::Timeline;
use super::track::TrackState;
use super::types::{ScheduledEvent, TrackEvent, TrackEventKind, TrackId};
use crate::engine::transport::sanitize_bpm;
use crate::engine::{AudioEngine, TransportState, DEFAULT_BPM, NORMAL_MODIFIER};
use crate::error::RuntimeError;
use crate::instrument::InstrumentKind;

/// How far ahead of the clock events are handed to the engine.
pub const SCHEDULE_AHEAD: Duration = Duration::from_millis(100);

/// Period of the scheduling loop.
pub const TICK_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Scheduling,
    Running,
    Paused,
    Stopped,
    Completed,
}

/// Outcome of one dispatched event.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Played {
        track: TrackId,
        event: TrackEvent,
    },
    Failed {
        track: TrackId,
        event: TrackEvent,
        error: RuntimeError,
    },
}

/// What happened during one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub dispatched: Vec<Dispatch>,
    /// Set on the tick that finished playback.
    pub completed: bool,
}

/// Read-only view of a track for mixers.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub name: String,
    /// Instrument currently in effect for the track.
    pub instrument: InstrumentKind,
    pub volume: f64,
    pub muted: bool,
    pub soloed: bool,
    pub active: bool,
    pub duration: Beat,
}

pub struct MultiTrackScheduler {
    tracks: BTreeMap<TrackId, TrackState>,
    /// Instrument each track is on right now, reset by `start`.
    instruments: HashMap<TrackId, InstrumentKind>,
    timeline: Timeline,
    state: SchedulerState,
    tempo: f64,
    /// Tempo the running queue was built with.
    running_tempo: f64,
    lookahead: f64,
    base_time: f64,
    paused_at: Option<f64>,
    playhead: f64,
    total_duration: Beat,
}

impl MultiTrackScheduler {
    pub fn new(tempo: f64) -> Self {
        let tempo = sanitize_bpm(tempo);
        Self {
            tracks: BTreeMap::new(),
            instruments: HashMap::new(),
            timeline: Timeline::new(),
            state: SchedulerState::Idle,
            tempo,
            running_tempo: tempo,
            lookahead: SCHEDULE_AHEAD.as_secs_f64(),
            base_time: 0.0,
            paused_at: None,
            playhead: 0.0,
            total_duration: Beat::ZERO,
        }
    }

    /// Look-ahead window used by `tick`.
    pub fn with_lookahead(mut self, lookahead: Duration) -> Self {
        self.lookahead = lookahead.as_secs_f64();
        self
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SchedulerState::Running
    }

    // --- Tracks ---

    /// Register a track, replacing any track with the same id.
    pub fn add_track(&mut self, track: TrackState) {
        self.instruments.insert(track.id, track.instrument);
        self.tracks.insert(track.id, track);
        self.recompute_duration();
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<TrackState> {
        self.instruments.remove(&id);
        let removed = self.tracks.remove(&id);
        self.recompute_duration();
        removed
    }

    pub fn track(&self, id: TrackId) -> Option<&TrackState> {
        self.tracks.get(&id)
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Id of the track called `name`.
    pub fn find_track(&self, name: &str) -> Option<TrackId> {
        self.tracks
            .values()
            .find(|t| t.name == name)
            .map(|t| t.id)
    }

    pub fn mute(&mut self, id: TrackId) -> bool {
        self.update(id, |t| t.muted = true)
    }

    pub fn unmute(&mut self, id: TrackId) -> bool {
        self.update(id, |t| t.muted = false)
    }

    pub fn solo(&mut self, id: TrackId) -> bool {
        self.update(id, |t| t.soloed = true)
    }

    pub fn unsolo(&mut self, id: TrackId) -> bool {
        self.update(id, |t| t.soloed = false)
    }

    /// Track volume, clamped to `0.0..=1.5`.
    pub fn set_volume(&mut self, id: TrackId, volume: f64) -> bool {
        self.update(id, |t| t.set_volume(volume))
    }

    fn update(&mut self, id: TrackId, apply: impl FnOnce(&mut TrackState)) -> bool {
        match self.tracks.get_mut(&id) {
            Some(track) => {
                apply(track);
                true
            }
            None => false,
        }
    }

    pub fn snapshots(&self) -> Vec<TrackSnapshot> {
        self.tracks
            .values()
            .map(|t| TrackSnapshot {
                id: t.id,
                name: t.name.clone(),
                instrument: self.instruments.get(&t.id).copied().unwrap_or(t.instrument),
                volume: t.volume,
                muted: t.muted,
                soloed: t.soloed,
                active: t.active,
                duration: t.duration(),
            })
            .collect()
    }

    // --- Tempo and position ---

    /// Takes effect at the next `start`.
    pub fn set_tempo(&mut self, bpm: f64) {
        self.tempo = sanitize_bpm(bpm);
    }

    pub fn tempo(&self) -> f64 {
        self.tempo
    }

    /// Playback position in beats, as of the last tick.
    pub fn playhead(&self) -> f64 {
        self.playhead
    }

    /// End of the longest track.
    pub fn total_duration(&self) -> Beat {
        self.total_duration
    }

    /// Undispatched events.
    pub fn pending(&self) -> usize {
        self.timeline.remaining()
    }

    fn recompute_duration(&mut self) {
        self.total_duration = self
            .tracks
            .values()
            .map(TrackState::duration)
            .max()
            .unwrap_or(Beat::ZERO);
    }

    fn audible(&self, track: &TrackState) -> bool {
        let solo_active = self.tracks.values().any(|t| t.soloed);
        track.active && !track.muted && (!solo_active || track.soloed)
    }

    // --- Transport ---

    /// Anchor every audible track at clock time `now` and begin running.
    /// Returns `false` if playback is already running or paused.
    pub fn start(&mut self, now: f64) -> bool {
        if matches!(self.state, SchedulerState::Running | SchedulerState::Paused) {
            return false;
        }
        self.state = SchedulerState::Scheduling;
        self.timeline.clear();
        self.running_tempo = self.tempo;
        self.base_time = now;
        self.paused_at = None;
        self.playhead = 0.0;
        for track in self.tracks.values() {
            self.instruments.insert(track.id, track.instrument);
        }

        let queued: Vec<ScheduledEvent> = self
            .tracks
            .values()
            .filter(|t| self.audible(t))
            .flat_map(|t| {
                t.events.iter().map(|event| ScheduledEvent {
                    track: t.id,
                    event: event.clone(),
                    time: now + event.time_offset.to_seconds(self.running_tempo),
                })
            })
            .collect();
        tracing::debug!(
            events = queued.len(),
            tracks = self.tracks.len(),
            bpm = self.running_tempo,
            "multitrack schedule built"
        );
        self.timeline.insert_batch(queued);
        self.state = SchedulerState::Running;
        true
    }

    /// Dispatch every event due before `now + lookahead`.
    pub fn tick(&mut self, now: f64, engine: &mut AudioEngine) -> TickReport {
        let mut report = TickReport::default();
        if self.state != SchedulerState::Running {
            return report;
        }

        self.playhead = self.beats_at(now);
        for scheduled in self.timeline.drain_until(now + self.lookahead) {
            if let Some(outcome) = self.dispatch(scheduled, now, engine) {
                report.dispatched.push(outcome);
            }
        }

        if self.timeline.remaining() == 0
            && self.playhead >= self.total_duration.as_beats_f64()
        {
            self.state = SchedulerState::Completed;
            tracing::debug!(playhead = self.playhead, "multitrack playback completed");
            report.completed = true;
        }
        report
    }

    fn beats_at(&self, now: f64) -> f64 {
        ((now - self.base_time) * self.running_tempo / 60.0).max(0.0)
    }

    fn dispatch(
        &mut self,
        scheduled: ScheduledEvent,
        now: f64,
        engine: &mut AudioEngine,
    ) -> Option<Dispatch> {
        let ScheduledEvent { track, event, time } = scheduled;
        let state = self.tracks.get(&track)?;
        let audible = self.audible(state);
        let volume = state.volume;
        let starting_instrument = state.instrument;

        if let TrackEventKind::InstrumentChange(kind) = event.kind {
            self.instruments.insert(track, kind);
            return audible.then_some(Dispatch::Played { track, event });
        }
        if !audible {
            return None;
        }

        let saved = engine.transport();
        engine.restore_transport(TransportState {
            bpm: self.running_tempo,
            time_modifier: NORMAL_MODIFIER,
            current_instrument: self
                .instruments
                .get(&track)
                .copied()
                .unwrap_or(starting_instrument),
            master_volume: saved.master_volume * volume,
        });

        let delay = (time - now).max(0.0);
        let beats = event.duration.as_beats_f64();
        let result = match &event.kind {
            TrackEventKind::Note(note) => engine.play_note(note, beats, delay),
            TrackEventKind::Chord(notes) => engine.play_chord(notes, beats, delay),
            TrackEventKind::Rest => {
                engine.play_rest(beats);
                Ok(())
            }
            TrackEventKind::InstrumentChange(_) => Ok(()),
        };
        engine.restore_transport(saved);

        Some(match result {
            Ok(()) => Dispatch::Played { track, event },
            Err(e) => {
                let error = RuntimeError::from(e);
                tracing::warn!(%track, kind = event.kind.label(), "event dispatch failed: {error}");
                Dispatch::Failed {
                    track,
                    event,
                    error,
                }
            }
        })
    }

    /// Suspend dispatching. Queued events are kept.
    pub fn pause(&mut self, now: f64) {
        if self.state == SchedulerState::Running {
            self.playhead = self.beats_at(now);
            self.paused_at = Some(now);
            self.state = SchedulerState::Paused;
            tracing::debug!(playhead = self.playhead, "multitrack playback paused");
        }
    }

    /// Continue from where `pause` left off, moving pending events later by
    /// the time spent paused.
    pub fn resume(&mut self, now: f64) {
        if self.state != SchedulerState::Paused {
            return;
        }
        if let Some(paused_at) = self.paused_at.take() {
            let gap = (now - paused_at).max(0.0);
            self.timeline.shift_pending(gap);
            self.base_time += gap;
        }
        self.state = SchedulerState::Running;
        tracing::debug!("multitrack playback resumed");
    }

    /// Drop every queued event and silence the engine. Idempotent.
    pub fn stop(&mut self, engine: &mut AudioEngine) {
        self.timeline.clear();
        self.paused_at = None;
        self.playhead = 0.0;
        engine.stop();
        if self.state != SchedulerState::Stopped {
            tracing::debug!(from = ?self.state, "multitrack playback stopped");
        }
        self.state = SchedulerState::Stopped;
    }
}

impl Default for MultiTrackScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_BPM)
    }
}
