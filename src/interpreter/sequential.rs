//! Single-stream playback: walk the AST and wait out every note.
//!
//! Notes are placed on an absolute cursor on the audio clock rather than
//! after a sleep, so scheduling jitter never accumulates. The walker wakes
//! one look-ahead window before the cursor, hands the engine the exact
//! delay, and moves the cursor on by the note's duration.

use std::sync::Arc;

use super::{ExecutionOutcome, Interpreter, PlaybackEvent};
use crate::audio::Clock;
use crate::dsl::{beats, Location, Node, NodeKind, Program};
use crate::engine::{AudioEngine, EngineError};
use crate::error::{Located, RuntimeError};
use crate::event::PatternTable;

pub(super) fn run(
    interp: &Interpreter,
    program: &Program,
    patterns: &PatternTable,
    clock: Arc<dyn Clock>,
) -> Result<ExecutionOutcome, Located<RuntimeError>> {
    let cursor = clock.now();
    let mut walker = Walker {
        interp,
        patterns,
        clock,
        cursor,
        playhead: 0.0,
        stack: Vec::new(),
    };
    if walker.walk(&program.body)? == Flow::Stopped {
        return Ok(ExecutionOutcome::Stopped);
    }
    // Let the last note ring out to its nominal end.
    match interp.wait_until(&walker.clock, walker.cursor) {
        Some(_) => Ok(ExecutionOutcome::Completed),
        None => Ok(ExecutionOutcome::Stopped),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Stopped,
}

struct Walker<'a> {
    interp: &'a Interpreter,
    patterns: &'a PatternTable,
    clock: Arc<dyn Clock>,
    /// Clock time at which the next note starts.
    cursor: f64,
    playhead: f64,
    /// Patterns currently being expanded.
    stack: Vec<String>,
}

impl Walker<'_> {
    fn walk(&mut self, body: &[Node]) -> Result<Flow, Located<RuntimeError>> {
        for node in body {
            if self.interp.stop_requested() {
                return Ok(Flow::Stopped);
            }
            if self.statement(node)? == Flow::Stopped {
                return Ok(Flow::Stopped);
            }
        }
        Ok(Flow::Continue)
    }

    fn repeat(&mut self, times: u32, body: &[Node]) -> Result<Flow, Located<RuntimeError>> {
        for _ in 0..times {
            if self.walk(body)? == Flow::Stopped {
                return Ok(Flow::Stopped);
            }
        }
        Ok(Flow::Continue)
    }

    fn statement(&mut self, node: &Node) -> Result<Flow, Located<RuntimeError>> {
        let at = |e: EngineError| Located::new(RuntimeError::from(e), node.loc);
        match &node.kind {
            NodeKind::Note { note, duration } => {
                let beats = beats(*duration);
                self.sound(beats, node.loc, |engine, delay| {
                    engine.play_note(note, beats, delay)
                })?;
                self.interp.emit(PlaybackEvent::NotePlayed {
                    note: note.clone(),
                    duration: beats,
                });
                self.advance(beats)
            }
            NodeKind::Chord { notes, duration } => {
                let beats = beats(*duration);
                self.sound(beats, node.loc, |engine, delay| {
                    engine.play_chord(notes, beats, delay)
                })?;
                self.interp.emit(PlaybackEvent::ChordPlayed {
                    notes: notes.clone(),
                    duration: beats,
                });
                self.advance(beats)
            }
            NodeKind::Rest { duration } => {
                let beats = beats(*duration);
                let seconds = {
                    let engine = self.interp.lock_engine();
                    engine.play_rest(beats);
                    engine.transport().seconds_for(beats)
                };
                self.interp.emit(PlaybackEvent::Rest { duration: beats });
                self.cursor += seconds;
                self.advance(beats)
            }
            NodeKind::Slow | NodeKind::Fast => {
                let modifier = {
                    let mut engine = self.interp.lock_engine();
                    if matches!(node.kind, NodeKind::Slow) {
                        engine.set_slow();
                    } else {
                        engine.set_fast();
                    }
                    engine.time_modifier()
                };
                self.interp.emit(PlaybackEvent::SpeedChanged { modifier });
                Ok(Flow::Continue)
            }
            NodeKind::Instrument { name } => {
                let instrument = self
                    .interp
                    .lock_engine()
                    .set_current_instrument(name)
                    .map_err(at)?;
                self.interp
                    .emit(PlaybackEvent::InstrumentChanged { instrument });
                Ok(Flow::Continue)
            }
            NodeKind::Loop { iterations, body } => self.repeat(*iterations, body),
            NodeKind::Group { body, multiplier } => self.repeat(multiplier.unwrap_or(1), body),
            NodeKind::PatternReference { name } => self.pattern(name, node.loc),
            NodeKind::Track { body, .. } => self.walk(body),
            NodeKind::Pattern { .. } | NodeKind::Comment { .. } => Ok(Flow::Continue),
        }
    }

    /// Start a note or chord at the cursor and move the cursor past it.
    fn sound(
        &mut self,
        beats: f64,
        loc: Option<Location>,
        play: impl FnOnce(&mut AudioEngine, f64) -> Result<(), EngineError>,
    ) -> Result<(), Located<RuntimeError>> {
        let mut engine = self.interp.lock_engine();
        let delay = (self.cursor - self.clock.now()).max(0.0);
        play(&mut *engine, delay).map_err(|e| Located::new(RuntimeError::from(e), loc))?;
        self.cursor += engine.transport().seconds_for(beats);
        Ok(())
    }

    /// Count the beats and sleep until one look-ahead window before the
    /// cursor.
    fn advance(&mut self, beats: f64) -> Result<Flow, Located<RuntimeError>> {
        self.playhead += beats;
        self.interp.set_playhead(self.playhead);
        let lookahead = self.interp.options().lookahead.as_secs_f64();
        let wake = self.cursor - lookahead;
        match self.interp.wait_until(&self.clock, wake) {
            Some(resumed) => {
                // Time spent paused pushes the rest of the program back.
                self.cursor += resumed - wake;
                Ok(Flow::Continue)
            }
            None => Ok(Flow::Stopped),
        }
    }

    fn pattern(&mut self, name: &str, loc: Option<Location>) -> Result<Flow, Located<RuntimeError>> {
        if self.stack.iter().any(|n| n == name) {
            return Err(Located::new(
                RuntimeError::RecursivePattern(name.to_string()),
                loc,
            ));
        }
        let patterns = self.patterns;
        let Some(definition) = patterns.get(name) else {
            return Err(Located::new(
                RuntimeError::UndefinedPattern(name.to_string()),
                loc,
            ));
        };
        self.stack.push(name.to_string());
        let flow = self.walk(&definition.body);
        self.stack.pop();
        flow
    }
}

#[cfg(test)]
mod tests {
    use crate::audio::clock::Clock;
    use crate::audio::OfflineOutput;
    use crate::dsl::parse_source;
    use crate::engine::AudioEngine;
    use crate::error::RuntimeError;
    use crate::interpreter::{ExecutionOutcome, Interpreter, InterpreterOptions, PlaybackEvent};
    use assert_approx_eq::assert_approx_eq;

    fn run(source: &str) -> (Result<ExecutionOutcome, RuntimeError>, Vec<PlaybackEvent>, OfflineOutput) {
        let output = OfflineOutput::new(8000);
        let engine = AudioEngine::with_output(Box::new(output.clone()));
        let interp = Interpreter::new(engine, InterpreterOptions::default());
        let rx = interp.subscribe();
        let result = interp
            .execute(&parse_source(source).unwrap())
            .map_err(|e| e.error);
        (result, rx.try_iter().collect(), output)
    }

    fn start_times(output: &OfflineOutput) -> Vec<f64> {
        output.scheduled().iter().map(|b| b.start_time).collect()
    }

    #[test]
    fn notes_follow_each_other_without_overlap() {
        let (result, _, output) = run("C4\nD4 2\nE4 0.5");
        assert_eq!(result, Ok(ExecutionOutcome::Completed));
        let starts = start_times(&output);
        assert_eq!(starts.len(), 3);
        assert_approx_eq!(starts[0], 0.0);
        assert_approx_eq!(starts[1], 0.5);
        assert_approx_eq!(starts[2], 1.5);
        assert!(output.manual_clock().now() >= 1.75 - 1e-9);
    }

    #[test]
    fn rest_delays_next_note() {
        let (_, events, output) = run("C4\nrest 2\nD4");
        assert_approx_eq!(start_times(&output)[1], 1.5);
        assert!(events.contains(&PlaybackEvent::Rest { duration: 2.0 }));
    }

    #[test]
    fn slow_and_fast_scale_later_notes() {
        let (_, events, output) = run("slow\nC4\nfast\nD4\nE4");
        let log = output.scheduled();
        assert_approx_eq!(log[0].duration, 1.0, 1e-3);
        assert_approx_eq!(log[1].start_time, 1.0);
        assert_approx_eq!(log[1].duration, 1.0 / 3.0, 1e-3);
        assert_approx_eq!(log[2].start_time, 1.0 + 1.0 / 3.0, 1e-6);
        assert!(events.contains(&PlaybackEvent::SpeedChanged { modifier: 0.5 }));
        assert!(events.contains(&PlaybackEvent::SpeedChanged { modifier: 1.5 }));
    }

    #[test]
    fn loops_groups_and_patterns_replay() {
        let (result, events, _) = run("pattern p = { C4 D4 }\nloop 2 p\n(E4 F4) * 2");
        assert_eq!(result, Ok(ExecutionOutcome::Completed));
        let notes: Vec<String> = events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::NotePlayed { note, .. } => Some(note.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(notes, vec!["C4", "D4", "C4", "D4", "E4", "F4", "E4", "F4"]);
    }

    #[test]
    fn undefined_pattern_aborts_run() {
        let (result, events, output) = run("C4\nnowhere\nD4");
        assert_eq!(result, Err(RuntimeError::UndefinedPattern("nowhere".into())));
        assert_eq!(output.scheduled().len(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            PlaybackEvent::Error {
                line: Some(2),
                ..
            }
        )));
        assert!(!events.contains(&PlaybackEvent::Complete));
    }

    #[test]
    fn unknown_instrument_aborts_run() {
        let (result, _, output) = run("@kazoo\nC4");
        assert_eq!(result, Err(RuntimeError::UnknownInstrument("kazoo".into())));
        assert!(output.scheduled().is_empty());
    }

    #[test]
    fn recursive_pattern_is_an_error() {
        let (result, _, _) = run("pattern a = { C4\na }\na");
        assert_eq!(result, Err(RuntimeError::RecursivePattern("a".into())));
    }

    #[test]
    fn instrument_changes_are_reported() {
        let (_, events, _) = run("@bass\nC2 2\n");
        assert_eq!(
            events[0],
            PlaybackEvent::InstrumentChanged {
                instrument: crate::instrument::InstrumentKind::Bass
            }
        );
        assert_eq!(
            events[1],
            PlaybackEvent::NotePlayed {
                note: "C2".into(),
                duration: 2.0
            }
        );
        assert_eq!(events.last(), Some(&PlaybackEvent::Complete));
    }

    #[test]
    fn chords_schedule_every_note_together() {
        let (_, _, output) = run("[C4 E4 G4] 2\nC5");
        let starts = start_times(&output);
        assert_eq!(starts.len(), 4);
        assert!(starts[..3].iter().all(|&s| s == 0.0));
        assert_approx_eq!(starts[3], 1.0);
    }
}
