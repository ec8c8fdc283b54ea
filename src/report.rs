use crate::model::token::Token;
use log::{Level, debug, warn};
use std::fmt;

/// A recoverable problem found while encoding or decoding. Never aborts the call.
#[derive(Debug, Clone, PartialEq)]
pub enum Issue {
    /// An onset carried a velocity outside 1..=127 and was encoded with the default one.
    InvalidVelocity { pitch: u8, velocity: u8 },

    /// A time shift did not move time forward and was ignored.
    TimeRegression { token: Token, time: f64 },

    /// A note-off with no matching open note.
    OrphanNoteOff { token: Token, time: f64 },

    /// A blanket note-off while nothing was sounding.
    EmptyAllNotesOff { time: f64 },

    /// Summary of every counted decode error in one stream.
    DecodeErrors { count: usize },

    /// Notes left open at the end of a stream, with what was done about them.
    HangingNotes { count: usize, removed: bool },
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Issue::InvalidVelocity { pitch, velocity } => {
                write!(f, "Invalid velocity value: {} (pitch {})", velocity, pitch)
            }
            Issue::TimeRegression { token, time } => {
                write!(f, "Ignoring {} that does not advance past t={}", token, time)
            }
            Issue::OrphanNoteOff { token, time } => {
                write!(f, "Orphaned {} at t={}", token, time)
            }
            Issue::EmptyAllNotesOff { time } => {
                write!(f, "NoteOff(*) with no sounding notes at t={}", time)
            }
            Issue::DecodeErrors { count } => write!(f, "Encountered {} errors", count),
            Issue::HangingNotes { count, removed: true } => {
                write!(f, "Removing {} hanging note(s)", count)
            }
            Issue::HangingNotes {
                count,
                removed: false,
            } => write!(f, "Ending {} hanging note(s)", count),
        }
    }
}

/// Receives recoverable issues from the codec.
pub trait Reporter {
    fn report(&mut self, issue: Issue);
}

/// Routes issues to the `log` facade: warn level when `warn_on_errors`, otherwise debug.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter {
    pub warn_on_errors: bool,
}

impl LogReporter {
    pub fn new(warn_on_errors: bool) -> Self {
        Self { warn_on_errors }
    }

    /// Level every issue is logged at.
    pub fn level(&self) -> Level {
        if self.warn_on_errors {
            Level::Warn
        } else {
            Level::Debug
        }
    }
}

impl Reporter for LogReporter {
    fn report(&mut self, issue: Issue) {
        match self.level() {
            Level::Warn => warn!("{}..!", issue),
            _ => debug!("{}", issue),
        }
    }
}

/// Keeps every reported issue, optionally forwarding to another reporter as well.
#[derive(Debug, Default)]
pub struct CollectingReporter<R: Reporter = Discard> {
    pub issues: Vec<Issue>,
    inner: R,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<R: Reporter> CollectingReporter<R> {
    pub fn forwarding(inner: R) -> Self {
        Self {
            issues: Vec::new(),
            inner,
        }
    }

    /// Number of individually counted problems, excluding the per-stream summaries.
    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|issue| {
                !matches!(
                    issue,
                    Issue::DecodeErrors { .. } | Issue::HangingNotes { .. }
                )
            })
            .count()
    }

    pub fn hanging_notes(&self) -> usize {
        self.issues
            .iter()
            .map(|issue| match issue {
                Issue::HangingNotes { count, .. } => *count,
                _ => 0,
            })
            .sum()
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

impl<R: Reporter> Reporter for CollectingReporter<R> {
    fn report(&mut self, issue: Issue) {
        self.inner.report(issue.clone());
        self.issues.push(issue);
    }
}

/// Drops every issue.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Reporter for Discard {
    fn report(&mut self, _issue: Issue) {}
}
