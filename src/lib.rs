//! Sythm: a small text language for music and the runtime that plays it.
//!
//! Source goes through [`dsl::parse_source`] into a [`dsl::Program`], and an
//! [`interpreter::Interpreter`] plays the program through an
//! [`engine::AudioEngine`], either one statement after another or as
//! parallel tracks on the look-ahead scheduler in [`event`].

pub mod audio;
pub mod config;
pub mod dsl;
pub mod engine;
pub mod error;
pub mod event;
pub mod instrument;
pub mod interpreter;
