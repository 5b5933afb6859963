//! Sorted event storage with cursor-based consumption.
//!
//! Events are stored sorted by absolute clock time. A cursor tracks the
//! first undispatched event so that `drain_until` only scans pending events.
//! Batch insertion defers sorting until the next read.

use super::types::ScheduledEvent;

/// A sorted queue of scheduled events with a dispatch cursor.
#[derive(Debug, Default)]
pub struct Timeline {
    events: Vec<ScheduledEvent>,
    cursor: usize,
    dirty: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a batch of events. Defers sorting until the next read.
    pub fn insert_batch(&mut self, events: impl IntoIterator<Item = ScheduledEvent>) {
        self.events.extend(events);
        self.dirty = true;
    }

    /// Take every pending event due before `deadline` (exclusive), in time
    /// order, and advance the cursor past them.
    pub fn drain_until(&mut self, deadline: f64) -> Vec<ScheduledEvent> {
        self.ensure_sorted();

        let start = self.cursor;
        while self.cursor < self.events.len() && self.events[self.cursor].time < deadline {
            self.cursor += 1;
        }
        self.events[start..self.cursor].to_vec()
    }

    /// Move every pending event later by `seconds`.
    pub fn shift_pending(&mut self, seconds: f64) {
        for event in &mut self.events[self.cursor..] {
            event.time += seconds;
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Number of undispatched events.
    pub fn remaining(&self) -> usize {
        self.events.len().saturating_sub(self.cursor)
    }

    /// Remove all events and reset the cursor.
    pub fn clear(&mut self) {
        self.events.clear();
        self.cursor = 0;
        self.dirty = false;
    }

    /// Stable sort so events at the same time keep insertion (track) order.
    fn ensure_sorted(&mut self) {
        if self.dirty {
            self.events[self.cursor..].sort_by(|a, b| a.time.total_cmp(&b.time));
            self.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::beat::Beat;
    use crate::event::types::{TrackEvent, TrackId};

    fn at(time: f64, track: u32, note: &str) -> ScheduledEvent {
        ScheduledEvent {
            track: TrackId(track),
            event: TrackEvent::note(note, Beat::ZERO, Beat::from_beats(1)),
            time,
        }
    }

    fn names(events: &[ScheduledEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| match &e.event.kind {
                crate::event::types::TrackEventKind::Note(n) => n.clone(),
                other => other.label().to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_timeline() {
        let mut tl = Timeline::new();
        assert!(tl.is_empty());
        assert_eq!(tl.remaining(), 0);
        assert!(tl.drain_until(10.0).is_empty());
    }

    #[test]
    fn batch_insert_sorts_on_read() {
        let mut tl = Timeline::new();
        tl.insert_batch(vec![at(1.5, 0, "E4"), at(0.0, 0, "C4"), at(0.5, 1, "D4")]);
        assert_eq!(tl.len(), 3);
        assert_eq!(names(&tl.drain_until(10.0)), vec!["C4", "D4", "E4"]);
    }

    #[test]
    fn deadline_is_exclusive() {
        let mut tl = Timeline::new();
        tl.insert_batch(vec![at(0.0, 0, "C4"), at(0.1, 0, "D4"), at(0.2, 0, "E4")]);
        assert_eq!(names(&tl.drain_until(0.1)), vec!["C4"]);
        assert_eq!(tl.remaining(), 2);
        assert_eq!(names(&tl.drain_until(0.25)), vec!["D4", "E4"]);
        assert_eq!(tl.remaining(), 0);
    }

    #[test]
    fn simultaneous_events_keep_insertion_order() {
        let mut tl = Timeline::new();
        tl.insert_batch(vec![at(1.0, 0, "A"), at(1.0, 1, "B"), at(0.5, 2, "C")]);
        assert_eq!(names(&tl.drain_until(2.0)), vec!["C", "A", "B"]);
    }

    #[test]
    fn shift_pending_leaves_dispatched_alone() {
        let mut tl = Timeline::new();
        tl.insert_batch(vec![at(0.0, 0, "C4"), at(1.0, 0, "D4")]);
        tl.drain_until(0.5);
        tl.shift_pending(2.0);
        assert!(tl.drain_until(2.9).is_empty());
        let due = tl.drain_until(3.1);
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].time, 3.0);
    }

    #[test]
    fn clear_removes_everything() {
        let mut tl = Timeline::new();
        tl.insert_batch(vec![at(0.0, 0, "C4"), at(1.0, 0, "D4")]);
        tl.drain_until(0.5);
        tl.clear();
        assert_eq!(tl.len(), 0);
        assert_eq!(tl.remaining(), 0);
    }
}
