//! Multitrack playback: flatten every track, then tick the scheduler.

use std::collections::HashMap;
use std::sync::Arc;

use super::{ExecutionOutcome, Interpreter, PlaybackEvent};
use crate::audio::Clock;
use crate::dsl::{NodeKind, Program};
use crate::error::{Located, RuntimeError};
use crate::event::{
    first_instrument, Dispatch, MultiTrackScheduler, PatternTable, TrackId, TrackManager,
};
use crate::instrument::InstrumentKind;

pub(super) fn run(
    interp: &Interpreter,
    program: &Program,
    patterns: &PatternTable,
    clock: Arc<dyn Clock>,
) -> Result<ExecutionOutcome, Located<RuntimeError>> {
    let names = register_tracks(interp, program, patterns);
    if interp.stop_requested() {
        return Ok(ExecutionOutcome::Stopped);
    }
    interp.lock_scheduler().start(clock.now());

    let tick = interp.options().tick_interval.as_secs_f64().max(1e-3);
    loop {
        if interp.stop_requested() {
            return Ok(ExecutionOutcome::Stopped);
        }
        let report = {
            let mut engine = interp.lock_engine();
            let mut scheduler = interp.lock_scheduler();
            scheduler.tick(clock.now(), &mut engine)
        };
        for outcome in report.dispatched {
            report_dispatch(interp, &names, outcome);
        }
        if report.completed {
            return Ok(ExecutionOutcome::Completed);
        }
        clock.sleep(tick);
    }
}

/// Build a fresh scheduler holding one track per `track` statement. A track
/// that fails to build is reported and left out.
fn register_tracks(
    interp: &Interpreter,
    program: &Program,
    patterns: &PatternTable,
) -> HashMap<TrackId, String> {
    let options = interp.options();
    let mut scheduler =
        MultiTrackScheduler::new(interp.tempo()).with_lookahead(options.lookahead);
    let mut manager = TrackManager::new(patterns);
    let mut names = HashMap::new();

    let tracks = program.body.iter().filter_map(|node| match &node.kind {
        NodeKind::Track { name, body } => Some((name, body)),
        _ => None,
    });
    for (index, (name, body)) in tracks.enumerate() {
        let id = TrackId(index as u32);
        let default_instrument = match first_instrument(body) {
            Some((instrument, loc)) => match instrument.parse::<InstrumentKind>() {
                Ok(kind) => kind,
                Err(_) => {
                    let err = Located::new(RuntimeError::UnknownInstrument(instrument.to_string()), loc);
                    tracing::warn!(track = %name, "track skipped: {err}");
                    interp.emit(PlaybackEvent::error(&err));
                    continue;
                }
            },
            None => InstrumentKind::Default,
        };
        match manager.create_track(id, name, body, default_instrument) {
            Ok(track) => {
                names.insert(id, name.clone());
                scheduler.add_track(track);
            }
            Err(err) => {
                tracing::warn!(track = %name, "track skipped: {err}");
                interp.emit(PlaybackEvent::error(&err));
            }
        }
    }
    for diagnostic in manager.take_diagnostics() {
        interp.emit(PlaybackEvent::error(&diagnostic));
    }

    tracing::debug!(
        tracks = scheduler.track_count(),
        beats = scheduler.total_duration().as_beats_f64(),
        "tracks registered"
    );
    *interp.lock_scheduler() = scheduler;
    names
}

fn report_dispatch(interp: &Interpreter, names: &HashMap<TrackId, String>, outcome: Dispatch) {
    match outcome {
        Dispatch::Played { track, event } => {
            let track = names.get(&track).cloned().unwrap_or_else(|| track.to_string());
            interp.emit(PlaybackEvent::TrackEvent { track, event });
        }
        Dispatch::Failed { error, .. } => {
            interp.emit(PlaybackEvent::Error {
                error,
                line: None,
                column: None,
            });
        }
    }
}
