//! Track programs played through the look-ahead scheduler.

use std::sync::Arc;
use std::thread;

use assert_approx_eq::assert_approx_eq;
use sythm::audio::OfflineOutput;
use sythm::dsl::parse_source;
use sythm::engine::AudioEngine;
use sythm::error::RuntimeError;
use sythm::event::TrackEventKind;
use sythm::instrument::InstrumentKind;
use sythm::interpreter::{
    ExecutionMode, ExecutionOutcome, Interpreter, InterpreterOptions, PlaybackEvent,
};

const BAND: &str = "\
pattern beat = { C2 0.5 C2 0.5 rest }
track drums {
  @kick
  loop 2 beat
}
track bass {
  @bass
  C2 2
  E2 2
}
";

fn interpreter() -> (Interpreter, OfflineOutput) {
    let output = OfflineOutput::new(8000);
    let engine = AudioEngine::with_output(Box::new(output.clone()));
    (Interpreter::new(engine, InterpreterOptions::default()), output)
}

fn played(events: &[PlaybackEvent], track: &str) -> Vec<(String, f64)> {
    events
        .iter()
        .filter_map(|e| match e {
            PlaybackEvent::TrackEvent { track: t, event } if t == track => match &event.kind {
                TrackEventKind::Note(n) => Some((n.clone(), event.time_offset.as_beats_f64())),
                _ => None,
            },
            _ => None,
        })
        .collect()
}

#[test]
fn tracks_start_together() {
    let (interp, output) = interpreter();
    let events = interp.subscribe();
    let outcome = interp.execute(&parse_source(BAND).unwrap());
    assert_eq!(outcome, Ok(ExecutionOutcome::Completed));

    let events: Vec<PlaybackEvent> = events.try_iter().collect();
    assert_eq!(
        played(&events, "drums"),
        vec![
            ("C2".to_string(), 0.0),
            ("C2".to_string(), 0.5),
            ("C2".to_string(), 2.0),
            ("C2".to_string(), 2.5),
        ]
    );
    assert_eq!(
        played(&events, "bass"),
        vec![("C2".to_string(), 0.0), ("E2".to_string(), 2.0)]
    );
    assert_eq!(events.last(), Some(&PlaybackEvent::Complete));

    let mut starts: Vec<f64> = output.scheduled().iter().map(|b| b.start_time).collect();
    starts.sort_by(f64::total_cmp);
    assert_eq!(starts.len(), 6);
    let origin = starts[0];
    for (got, want) in starts.iter().zip([0.0, 0.0, 0.25, 1.0, 1.0, 1.25]) {
        assert_approx_eq!(*got - origin, want, 1e-6);
    }
}

#[test]
fn instrument_changes_are_dispatched_per_track() {
    let (interp, _) = interpreter();
    let events = interp.subscribe();
    interp
        .execute(&parse_source("track t { @pad\n[C4 E4] 2\n@lead\nG4 }").unwrap())
        .unwrap();
    let kinds: Vec<TrackEventKind> = events
        .try_iter()
        .filter_map(|e| match e {
            PlaybackEvent::TrackEvent { event, .. } => Some(event.kind),
            _ => None,
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            TrackEventKind::InstrumentChange(InstrumentKind::Pad),
            TrackEventKind::Chord(vec!["C4".into(), "E4".into()]),
            TrackEventKind::InstrumentChange(InstrumentKind::Lead),
            TrackEventKind::Note("G4".into()),
        ]
    );
}

#[test]
fn recursive_pattern_in_track_is_skipped_with_a_report() {
    let (interp, _) = interpreter();
    let events = interp.subscribe();
    let outcome = interp.execute(&parse_source("pattern a = { C4\na }\ntrack t { a\nD4 }").unwrap());
    assert_eq!(outcome, Ok(ExecutionOutcome::Completed));
    let events: Vec<PlaybackEvent> = events.try_iter().collect();
    assert!(events.iter().any(|e| matches!(
        e,
        PlaybackEvent::Error {
            error: RuntimeError::RecursivePattern(_),
            ..
        }
    )));
    assert!(played(&events, "t").iter().any(|(n, _)| n == "D4"));
}

#[test]
fn mixer_controls_reach_a_running_track() {
    let (interp, _) = interpreter();
    let interp = Arc::new(interp);
    let events = interp.subscribe();
    let program = parse_source("track lead { C4\nloop 100000 { rest }\n}\ntrack pad { rest }").unwrap();

    assert!(!interp.mute_track("lead"));
    let runner = Arc::clone(&interp);
    let handle = thread::spawn(move || runner.execute(&program));

    let first = events.recv().unwrap();
    assert!(matches!(first, PlaybackEvent::TrackEvent { .. }));
    assert_eq!(interp.mode(), Some(ExecutionMode::Multitrack));

    assert!(interp.mute_track("lead"));
    assert!(interp.solo_track("pad"));
    assert!(interp.set_track_volume("pad", 3.0));
    assert!(!interp.mute_track("vocals"));

    let state = interp.state();
    let lead = state.tracks.iter().find(|t| t.name == "lead").unwrap();
    let pad = state.tracks.iter().find(|t| t.name == "pad").unwrap();
    assert!(lead.muted);
    assert!(pad.soloed);
    assert_eq!(pad.volume, 1.5);
    assert!(state.is_running);

    interp.stop();
    assert_eq!(handle.join().unwrap(), Ok(ExecutionOutcome::Stopped));
    assert!(!events.try_iter().any(|e| e == PlaybackEvent::Complete));
}
