//! Conversion between absolute time in seconds and beat-relative time.
//!
//! The codec only ever sees beats. Callers holding performances timed in seconds normalize
//! them with a [`TempoMap`] before encoding, and warp decoded sequences back afterwards.

use crate::error::{CodecError, Result};
use crate::model::note::{Note, NoteSequence};

pub const DEFAULT_QPM: f64 = 120.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

#[derive(Debug, Clone, PartialEq)]
struct TempoSegment {
    qpm: f64,
    start_seconds: f64,
    beats_at_start: f64,
}

impl TempoSegment {
    fn seconds_per_beat(&self) -> f64 {
        SECONDS_PER_MINUTE / self.qpm
    }
}

/// Piecewise-constant tempo curve.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    segments: Vec<TempoSegment>,
}

impl Default for TempoMap {
    fn default() -> Self {
        Self {
            segments: vec![TempoSegment {
                qpm: DEFAULT_QPM,
                start_seconds: 0.0,
                beats_at_start: 0.0,
            }],
        }
    }
}

impl TempoMap {
    pub fn constant(qpm: f64) -> Result<Self> {
        Self::new(&[(0.0, qpm)])
    }

    /// Build a map from `(time_seconds, qpm)` tempo changes, in any order.
    ///
    /// The tempo before the first change is [`DEFAULT_QPM`]; a later change at the same time
    /// replaces an earlier one.
    pub fn new(changes: &[(f64, f64)]) -> Result<Self> {
        if let Some((time, qpm)) = changes
            .iter()
            .find(|(time, qpm)| !qpm.is_finite() || *qpm <= 0.0 || !time.is_finite())
        {
            return Err(CodecError::InvalidConfig(format!(
                "invalid tempo change {} qpm at {}s",
                qpm, time
            )));
        }

        let mut changes = changes.to_vec();
        changes.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut segments = Self::default().segments;

        for (time, qpm) in changes.into_iter().filter(|(time, _)| *time >= 0.0) {
            if let Some(last) = segments.last_mut()
                && time == last.start_seconds
            {
                last.qpm = qpm;
                continue;
            }

            let last = &segments[segments.len() - 1];
            let beats_at_start =
                last.beats_at_start + (time - last.start_seconds) / last.seconds_per_beat();
            segments.push(TempoSegment {
                qpm,
                start_seconds: time,
                beats_at_start,
            });
        }

        Ok(Self { segments })
    }

    pub fn seconds_to_beats(&self, seconds: f64) -> f64 {
        let segment = self
            .segments
            .iter()
            .rfind(|seg| seg.start_seconds <= seconds)
            .unwrap_or(&self.segments[0]);

        segment.beats_at_start + (seconds - segment.start_seconds) / segment.seconds_per_beat()
    }

    pub fn beats_to_seconds(&self, beats: f64) -> f64 {
        let segment = self
            .segments
            .iter()
            .rfind(|seg| seg.beats_at_start <= beats)
            .unwrap_or(&self.segments[0]);

        segment.start_seconds + (beats - segment.beats_at_start) * segment.seconds_per_beat()
    }

    /// Re-time a sequence from seconds to beats.
    pub fn normalize(&self, sequence: &NoteSequence) -> NoteSequence {
        self.warp(sequence, |t| self.seconds_to_beats(t))
    }

    /// Re-time a sequence from beats back to seconds.
    pub fn denormalize(&self, sequence: &NoteSequence) -> NoteSequence {
        self.warp(sequence, |t| self.beats_to_seconds(t))
    }

    fn warp(&self, sequence: &NoteSequence, f: impl Fn(f64) -> f64) -> NoteSequence {
        let notes = sequence
            .notes
            .iter()
            .map(|note| Note {
                start_time: f(note.start_time),
                end_time: f(note.end_time),
                ..*note
            })
            .collect();

        NoteSequence {
            notes,
            total_time: f(sequence.total_time),
        }
    }
}
