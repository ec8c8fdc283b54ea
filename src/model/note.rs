use serde::{Deserialize, Serialize};

/// A single note with beat-relative (or, before tempo normalization, absolute) timing.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct Note {
    pub pitch: u8,
    pub velocity: u8,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub is_drum: bool,
}

impl Note {
    pub fn new(pitch: u8, velocity: u8, start_time: f64, end_time: f64) -> Self {
        Self {
            pitch,
            velocity,
            start_time,
            end_time,
            is_drum: false,
        }
    }

    pub fn drum(pitch: u8, velocity: u8, start_time: f64, end_time: f64) -> Self {
        Self {
            is_drum: true,
            ..Self::new(pitch, velocity, start_time, end_time)
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct NoteSequence {
    pub notes: Vec<Note>,
    #[serde(default)]
    pub total_time: f64,
}

impl NoteSequence {
    /// Build a sequence whose `total_time` is the latest note end.
    pub fn from_notes(notes: Vec<Note>) -> Self {
        let total_time = notes
            .iter()
            .map(|note| note.end_time)
            .fold(0.0, f64::max);

        Self { notes, total_time }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
