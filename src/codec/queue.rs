use crate::model::note::Note;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

/// Sort key of a queued onset or offset.
///
/// Compared field by field: time, then offsets before onsets, then pitch, drum flag and
/// finally the note's identity (its index in the input) so that the order is total.
#[derive(Debug, Clone, Copy)]
pub struct EventKey {
    pub time: f64,
    pub is_onset: bool,
    pub pitch: u8,
    pub is_drum: bool,
    pub identity: usize,
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then_with(|| self.is_onset.cmp(&other.is_onset))
            .then_with(|| self.pitch.cmp(&other.pitch))
            .then_with(|| self.is_drum.cmp(&other.is_drum))
            .then_with(|| self.identity.cmp(&other.identity))
    }
}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

/// One onset or offset popped from a [`NoteEventQueue`].
#[derive(Debug, Clone, Copy)]
pub struct NoteEvent<'a> {
    /// Number of quantization steps when the queue quantizes, the raw time otherwise.
    pub time: f64,
    pub note: &'a Note,
    pub is_onset: bool,
    pub identity: usize,
}

impl NoteEvent<'_> {
    /// The event time as a whole number of grid steps.
    pub fn step(&self) -> i64 {
        self.time as i64
    }
}

/// Priority queue of note onsets and offsets.
///
/// Only onsets are queued up front. A note's offset is pushed when its onset is popped,
/// so a note can never end before it starts, even when both land on the same grid step.
/// Single use: once drained, build a new queue.
#[derive(Debug)]
pub struct NoteEventQueue<'a> {
    notes: &'a [Note],
    quantization_step: Option<f64>,
    heap: BinaryHeap<Reverse<EventKey>>,
    popped: usize,
}

impl<'a> NoteEventQueue<'a> {
    /// Non-positive or non-finite steps disable quantization.
    pub fn new(notes: &'a [Note], quantization_step: Option<f64>) -> Self {
        let quantization_step = quantization_step.filter(|step| step.is_finite() && *step > 0.0);

        let heap = notes
            .iter()
            .enumerate()
            .map(|(identity, note)| {
                Reverse(EventKey {
                    time: quantize(note.start_time, quantization_step),
                    is_onset: true,
                    pitch: note.pitch,
                    is_drum: note.is_drum,
                    identity,
                })
            })
            .collect();

        Self {
            notes,
            quantization_step,
            heap,
            popped: 0,
        }
    }

    pub fn quantize(&self, value: f64) -> f64 {
        quantize(value, self.quantization_step)
    }

    pub fn pop(&mut self) -> Option<NoteEvent<'a>> {
        let Reverse(key) = self.heap.pop()?;
        let note = &self.notes[key.identity];

        if key.is_onset {
            self.heap.push(Reverse(EventKey {
                time: self.quantize(note.end_time),
                is_onset: false,
                ..key
            }));
        }

        self.popped += 1;

        Some(NoteEvent {
            time: key.time,
            note,
            is_onset: key.is_onset,
            identity: key.identity,
        })
    }

    /// Events still to come, counting offsets not yet pushed.
    pub fn remaining(&self) -> usize {
        2 * self.notes.len() - self.popped
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

/// `round(value / step)`, half away from zero. Identity without a step.
///
/// `-0.0` is folded into `0.0` since `total_cmp` would order it first.
fn quantize(value: f64, step: Option<f64>) -> f64 {
    let quantized = match step {
        Some(step) => (value / step).round(),
        None => value,
    };
    quantized + 0.0
}

impl<'a> Iterator for NoteEventQueue<'a> {
    type Item = NoteEvent<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.pop()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining();
        (remaining, Some(remaining))
    }
}
