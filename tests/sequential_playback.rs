//! Sequential programs played against an offline output.

use std::sync::Arc;
use std::thread;

use assert_approx_eq::assert_approx_eq;
use sythm::audio::{Clock, OfflineOutput};
use sythm::dsl::parse_source;
use sythm::engine::AudioEngine;
use sythm::error::RuntimeError;
use sythm::interpreter::{
    ExecutionMode, ExecutionOutcome, Interpreter, InterpreterOptions, PlaybackEvent,
};

fn interpreter(bpm: f64) -> (Interpreter, OfflineOutput) {
    let output = OfflineOutput::new(8000);
    let engine = AudioEngine::with_output(Box::new(output.clone()));
    let options = InterpreterOptions {
        bpm,
        ..InterpreterOptions::default()
    };
    (Interpreter::new(engine, options), output)
}

#[test]
fn melody_is_laid_out_back_to_back() {
    let (interp, output) = interpreter(120.0);
    let program = parse_source("@lead\nloop 2 { C4 E4 0.5 }\n[C4 E4 G4] 2\nrest\nG4").unwrap();
    assert_eq!(interp.execute(&program), Ok(ExecutionOutcome::Completed));

    let starts: Vec<f64> = output.scheduled().iter().map(|b| b.start_time).collect();
    let expected = [0.0, 0.5, 0.75, 1.25, 1.5, 1.5, 1.5, 3.0];
    assert_eq!(starts.len(), expected.len());
    for (got, want) in starts.iter().zip(expected) {
        assert_approx_eq!(*got, want, 1e-6);
    }
    assert!(output.manual_clock().now() >= 3.5 - 1e-6);
    assert!(output.scheduled().iter().all(|b| b.peak > 0.0));
}

#[test]
fn tempo_scales_every_note() {
    let (interp, output) = interpreter(60.0);
    interp.execute(&parse_source("C4\nD4").unwrap()).unwrap();
    assert_approx_eq!(output.scheduled()[1].start_time, 1.0, 1e-6);

    interp.update_tempo(240.0);
    let before = output.manual_clock().now();
    interp.execute(&parse_source("C4\nD4").unwrap()).unwrap();
    let log = output.scheduled();
    assert_approx_eq!(log[3].start_time - log[2].start_time, 0.25, 1e-6);
    assert!(log[2].start_time >= before - 1e-9);
}

#[test]
fn speed_resets_between_runs() {
    let (interp, output) = interpreter(120.0);
    interp.execute(&parse_source("slow\nC4").unwrap()).unwrap();
    interp.execute(&parse_source("C4").unwrap()).unwrap();
    let log = output.scheduled();
    assert_approx_eq!(log[0].duration, 1.0, 1e-3);
    assert_approx_eq!(log[1].duration, 0.5, 1e-3);
}

#[test]
fn runtime_error_reports_location_and_stops() {
    let (interp, output) = interpreter(120.0);
    let events = interp.subscribe();
    let err = interp
        .execute(&parse_source("C4\n  @theremin\nD4").unwrap())
        .unwrap_err();
    assert_eq!(err.error, RuntimeError::UnknownInstrument("theremin".into()));
    assert_eq!((err.line(), err.col()), (Some(2), Some(3)));
    assert_eq!(err.to_string(), "[2:3] Unknown instrument: theremin");
    assert_eq!(output.scheduled().len(), 1);

    let last = events.try_iter().last();
    assert!(matches!(last, Some(PlaybackEvent::Error { line: Some(2), .. })));
    assert!(!interp.is_running());
}

#[test]
fn note_without_pitch_class_fails_at_play_time() {
    let (interp, output) = interpreter(120.0);
    let err = interp
        .execute(&parse_source("C4
E#4").unwrap())
        .unwrap_err();
    assert!(matches!(err.error, RuntimeError::InvalidNote(_)));
    assert_eq!(err.line(), Some(2));
    assert_eq!(output.scheduled().len(), 1);
}

#[test]
fn stop_from_another_thread_ends_the_run() {
    let (interp, output) = interpreter(120.0);
    let interp = Arc::new(interp);
    let events = interp.subscribe();
    let program = parse_source("C4\nloop 1000000 { rest }").unwrap();

    let runner = Arc::clone(&interp);
    let handle = thread::spawn(move || runner.execute(&program));

    assert!(matches!(events.recv(), Ok(PlaybackEvent::NotePlayed { .. })));
    assert!(interp.is_running());
    assert_eq!(interp.mode(), Some(ExecutionMode::Sequential));
    let again = interp.execute(&parse_source("D4").unwrap());
    assert_eq!(again.map_err(|e| e.error), Err(RuntimeError::AlreadyRunning));

    interp.pause();
    assert!(interp.state().is_paused);
    interp.resume();
    assert!(!interp.is_paused());

    interp.stop();
    interp.stop();
    let outcome = handle.join().unwrap();
    assert_eq!(outcome, Ok(ExecutionOutcome::Stopped));
    assert!(!interp.is_running());
    assert_eq!(interp.mode(), None);
    assert!(!events.try_iter().any(|e| e == PlaybackEvent::Complete));
    assert_eq!(output.scheduled().len(), 1);
}
