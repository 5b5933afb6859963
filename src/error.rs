//! Errors raised while a program plays.

use std::fmt;

use thiserror::Error;

use crate::audio::AudioError;
use crate::dsl::{Location, NoteError};
use crate::engine::EngineError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),
    #[error("Pattern not found: {0}")]
    UndefinedPattern(String),
    #[error("Pattern '{0}' refers to itself")]
    RecursivePattern(String),
    #[error("Audio engine not initialized")]
    EngineNotInitialized,
    #[error(transparent)]
    InvalidNote(#[from] NoteError),
    #[error(transparent)]
    Audio(#[from] AudioError),
    #[error("Interpreter is already running")]
    AlreadyRunning,
}

impl From<EngineError> for RuntimeError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotInitialized => RuntimeError::EngineNotInitialized,
            EngineError::UnknownInstrument(name) => RuntimeError::UnknownInstrument(name),
            EngineError::InvalidNote(e) => RuntimeError::InvalidNote(e),
            EngineError::Audio(e) => RuntimeError::Audio(e),
        }
    }
}

/// An error with the source position of the statement that raised it.
#[derive(Debug, Clone, PartialEq)]
pub struct Located<E> {
    pub error: E,
    pub location: Option<Location>,
}

impl<E> Located<E> {
    pub fn new(error: E, location: Option<Location>) -> Self {
        Self { error, location }
    }

    pub fn unlocated(error: E) -> Self {
        Self::new(error, None)
    }

    pub fn line(&self) -> Option<usize> {
        self.location.map(|l| l.line)
    }

    pub fn col(&self) -> Option<usize> {
        self.location.map(|l| l.col)
    }
}

impl<E: fmt::Display> fmt::Display for Located<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(Location { line, col }) => write!(f, "[{line}:{col}] {}", self.error),
            None => write!(f, "{}", self.error),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for Located<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
