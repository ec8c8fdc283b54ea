use crate::codec::queue::NoteEventQueue;
use crate::codec::{BeatRelativeCodec, EncodeOptions, Encoded};
use crate::error::{CodecError, Result};
use crate::model::note::Note;
use crate::model::token::Token;
use crate::report::{Issue, Reporter};
use log::debug;
use std::collections::HashMap;

impl BeatRelativeCodec {
    /// Encode beat-relative notes, reporting recoverable issues through the `log` facade.
    pub fn encode(&self, notes: &[Note], options: EncodeOptions) -> Result<Encoded> {
        self.encode_with(notes, options, &mut self.log_reporter())
    }

    pub fn encode_with<R: Reporter>(
        &self,
        notes: &[Note],
        options: EncodeOptions,
        reporter: &mut R,
    ) -> Result<Encoded> {
        let tokens = self.encode_tokens_with(notes, options.add_start, options.add_end, reporter)?;

        if options.as_ids {
            Ok(Encoded::Ids(self.vocabulary.to_ids(&tokens)?))
        } else {
            Ok(Encoded::Tokens(tokens))
        }
    }

    pub fn encode_tokens(&self, notes: &[Note], add_start: bool, add_end: bool) -> Result<Vec<Token>> {
        self.encode_tokens_with(notes, add_start, add_end, &mut self.log_reporter())
    }

    pub fn encode_ids(&self, notes: &[Note], add_start: bool, add_end: bool) -> Result<Vec<u32>> {
        let tokens = self.encode_tokens(notes, add_start, add_end)?;
        self.vocabulary.to_ids(&tokens)
    }

    /// Core emission loop. Fails only when a note cannot be expressed in the vocabulary
    /// (a pitch above 127).
    pub fn encode_tokens_with<R: Reporter>(
        &self,
        notes: &[Note],
        add_start: bool,
        add_end: bool,
        reporter: &mut R,
    ) -> Result<Vec<Token>> {
        let config = &self.config;
        let units_per_beat = config.units_per_beat as i64;
        let queue = NoteEventQueue::new(notes, Some(1.0 / config.units_per_beat as f64));

        let mut tokens: Vec<Token> = Vec::with_capacity(3 * notes.len() + 2);
        if add_start {
            tokens.push(self.vocabulary.start_token());
        }

        let mut last_beat: i64 = 0;
        let mut last_t: i64 = 0;
        let mut velocity_bucket: Option<u32> = None;

        for event in queue {
            let t = event.step();
            if t > last_t {
                let beat = t.div_euclid(units_per_beat);
                let step_in_beat = t.rem_euclid(units_per_beat) as u32;

                // Bridge silent beats one at a time
                while beat - last_beat > 1 {
                    tokens.push(Token::SetTimeNext(0));
                    last_beat += 1;
                }

                if beat == last_beat {
                    tokens.push(Token::SetTime(step_in_beat));
                } else {
                    tokens.push(Token::SetTimeNext(step_in_beat));
                    last_beat += 1;
                }

                last_t = t;
            }

            let note = event.note;
            let as_drum = note.is_drum && config.use_drum_events;

            if event.is_onset {
                let mut velocity = note.velocity;
                if !(1..=127).contains(&velocity) {
                    reporter.report(Issue::InvalidVelocity {
                        pitch: note.pitch,
                        velocity,
                    });
                    velocity = config.default_velocity;
                }

                let bucket = velocity as u32 / config.velocity_unit + 1;
                if velocity_bucket != Some(bucket) {
                    velocity_bucket = Some(bucket);
                    if config.use_velocity {
                        tokens.push(Token::SetVelocity(bucket));
                    }
                }

                tokens.push(if as_drum {
                    Token::DrumOn(note.pitch)
                } else {
                    Token::NoteOn(note.pitch)
                });
            } else {
                tokens.push(if as_drum {
                    Token::DrumOff(note.pitch)
                } else {
                    Token::NoteOff(note.pitch)
                });
            }
        }

        if config.use_all_off_event {
            tokens = compress_note_offs(&tokens);
        }

        if add_end {
            tokens.push(self.vocabulary.end_token());
        }

        if let Some(token) = tokens.iter().find(|token| !self.vocabulary.contains(token)) {
            return Err(CodecError::UnknownToken(*token));
        }

        debug!("Encoded {} note(s) into {} token(s)", notes.len(), tokens.len());

        Ok(tokens)
    }
}

/// Replace each run of consecutive note-offs that releases every sounding note with a single
/// [`Token::AllNotesOff`].
///
/// Runs that leave something sounding, or that contain a note-off with no open partner, are
/// kept as they are. Consecutive note-offs always share one time position since any time
/// shift would break the run.
pub fn compress_note_offs(tokens: &[Token]) -> Vec<Token> {
    let mut compressed: Vec<Token> = Vec::with_capacity(tokens.len());
    // Open note count, keyed by the note-off token that would close it
    let mut open: HashMap<Token, usize> = HashMap::new();
    let mut sounding: usize = 0;

    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];

        if !token.is_note_off() {
            match token {
                Token::NoteOn(pitch) => {
                    *open.entry(Token::NoteOff(pitch)).or_default() += 1;
                    sounding += 1;
                }
                Token::DrumOn(pitch) => {
                    *open.entry(Token::DrumOff(pitch)).or_default() += 1;
                    sounding += 1;
                }
                Token::AllNotesOff => {
                    open.clear();
                    sounding = 0;
                }
                _ => {}
            }

            compressed.push(token);
            i += 1;
            continue;
        }

        let run_end = tokens[i..]
            .iter()
            .position(|token| !token.is_note_off())
            .map_or(tokens.len(), |offset| i + offset);
        let run = &tokens[i..run_end];

        let mut all_matched = true;
        for off in run {
            match open.get_mut(off) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    sounding -= 1;
                }
                _ => all_matched = false,
            }
        }

        if all_matched && sounding == 0 {
            compressed.push(Token::AllNotesOff);
        } else {
            compressed.extend_from_slice(run);
        }

        i = run_end;
    }

    compressed
}
