//! Multitrack event stream: track flattening and look-ahead scheduling.
//!
//! The [`TrackManager`] turns each `track` body into a list of
//! [`TrackEvent`]s stamped in [`Beat`] ticks. The [`MultiTrackScheduler`]
//! anchors those lists to the audio clock and dispatches them through the
//! [`AudioEngine`](crate::engine::AudioEngine) a short window ahead of time.
//!
//! The scheduler does **not** own the engine or a thread. The caller drives
//! `tick` on whatever loop it likes, which keeps every timing decision
//! testable against a manual clock.

pub mod beat;
pub mod scheduler;
pub mod timeline;
pub mod track;
pub mod types;

pub use beat::{Beat, TICKS_PER_BEAT};
pub use scheduler::{
    Dispatch, MultiTrackScheduler, SchedulerState, TickReport, TrackSnapshot, SCHEDULE_AHEAD,
    TICK_INTERVAL,
};
pub use timeline::Timeline;
pub use track::{
    first_instrument, PatternDefinition, PatternTable, TrackManager, TrackState,
    MAX_TRACK_VOLUME,
};
pub use types::{ScheduledEvent, TrackEvent, TrackEventKind, TrackId};
