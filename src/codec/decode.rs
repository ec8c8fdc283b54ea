use crate::codec::{BeatRelativeCodec, TokenInput};
use crate::error::Result;
use crate::model::config::HangingNotePolicy;
use crate::model::note::{Note, NoteSequence};
use crate::model::token::Token;
use crate::report::{Issue, Reporter};
use log::debug;
use std::collections::HashMap;

impl BeatRelativeCodec {
    /// Decode ids or tokens into a beat-relative note sequence.
    ///
    /// Anything outside the vocabulary aborts the whole call. Inconsistencies in an otherwise
    /// valid stream (time shifts that do not advance, note-offs with no open note, hanging
    /// notes...) are repaired and reported through the `log` facade.
    pub fn decode<T: TokenInput>(&self, tokens: &[T]) -> Result<NoteSequence> {
        self.decode_with(tokens, &mut self.log_reporter())
    }

    pub fn decode_with<T: TokenInput, R: Reporter>(
        &self,
        tokens: &[T],
        reporter: &mut R,
    ) -> Result<NoteSequence> {
        let config = &self.config;
        let units_per_beat = config.units_per_beat as f64;

        let mut notes: Vec<Note> = Vec::new();
        // Indices into `notes`, most recently opened last
        let mut notes_on: HashMap<u8, Vec<usize>> = HashMap::new();
        let mut error_count: usize = 0;

        let mut t: f64 = 0.0;
        let mut current_beat: u64 = 0;
        let mut velocity = config.default_velocity;

        for item in tokens {
            let token = item.resolve(&self.vocabulary)?;

            match token {
                Token::Pad | Token::Start | Token::End => continue,
                Token::SetTime(step) | Token::SetTimeNext(step) => {
                    if matches!(token, Token::SetTimeNext(_)) {
                        current_beat += 1;
                    }

                    let new_t = current_beat as f64 + step as f64 / units_per_beat;
                    if new_t > t {
                        t = new_t;
                    } else {
                        error_count += 1;
                        reporter.report(Issue::TimeRegression { token, time: t });
                    }
                }
                Token::SetVelocity(bucket) => {
                    // Buckets start at 1 and the vocabulary stops at the one holding 127.
                    velocity = ((bucket - 1) * config.velocity_unit) as u8;
                }
                Token::NoteOn(pitch) | Token::DrumOn(pitch) => {
                    notes_on.entry(pitch).or_default().push(notes.len());
                    notes.push(Note {
                        pitch,
                        velocity,
                        start_time: t,
                        end_time: t,
                        is_drum: matches!(token, Token::DrumOn(_)),
                    });
                }
                Token::NoteOff(pitch) | Token::DrumOff(pitch) => {
                    match notes_on.get_mut(&pitch).and_then(|open| open.pop()) {
                        Some(index) => notes[index].end_time = t,
                        None => {
                            error_count += 1;
                            reporter.report(Issue::OrphanNoteOff { token, time: t });
                        }
                    }
                }
                Token::AllNotesOff => {
                    if notes_on.values().all(Vec::is_empty) {
                        error_count += 1;
                        reporter.report(Issue::EmptyAllNotesOff { time: t });
                    }

                    for open in notes_on.values_mut() {
                        for index in open.drain(..) {
                            notes[index].end_time = t;
                        }
                    }
                }
            }
        }

        let total_time = t;

        if error_count > 0 {
            reporter.report(Issue::DecodeErrors { count: error_count });
        }

        let mut hanging = vec![false; notes.len()];
        let mut num_hanging: usize = 0;
        for index in notes_on.into_values().flatten() {
            hanging[index] = true;
            num_hanging += 1;
        }

        if num_hanging > 0 {
            match config.errors {
                HangingNotePolicy::Remove => {
                    reporter.report(Issue::HangingNotes {
                        count: num_hanging,
                        removed: true,
                    });

                    notes = notes
                        .into_iter()
                        .zip(hanging)
                        .filter(|(_, is_hanging)| !is_hanging)
                        .map(|(note, _)| note)
                        .collect();
                }
                HangingNotePolicy::Fix => {
                    reporter.report(Issue::HangingNotes {
                        count: num_hanging,
                        removed: false,
                    });

                    for (note, _) in notes.iter_mut().zip(hanging).filter(|(_, h)| *h) {
                        note.end_time = total_time;
                    }
                }
            }
        }

        debug!(
            "Decoded {} token(s) into {} note(s), total time {} beat(s)",
            tokens.len(),
            notes.len(),
            total_time
        );

        Ok(NoteSequence { notes, total_time })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::codec::EncodeOptions;
    use crate::error::CodecError;
    use crate::model::config::CodecConfig;
    use crate::report::CollectingReporter;

    fn quarter_grid() -> CodecConfig {
        CodecConfig {
            units_per_beat: 4,
            ..CodecConfig::default()
        }
    }

    fn decode_collecting(
        config: CodecConfig,
        tokens: &[Token],
    ) -> (NoteSequence, CollectingReporter) {
        env_logger::try_init().unwrap_or(());

        let codec = BeatRelativeCodec::new(config).unwrap();
        let mut reporter = CollectingReporter::new();
        let sequence = codec.decode_with(tokens, &mut reporter).unwrap();
        (sequence, reporter)
    }

    fn sorted(mut notes: Vec<Note>) -> Vec<Note> {
        notes.sort_by(|a, b| {
            a.start_time
                .total_cmp(&b.start_time)
                .then_with(|| a.pitch.cmp(&b.pitch))
        });
        notes
    }

    #[test]
    fn two_note_phrase() {
        let tokens = [
            Token::NoteOn(60),
            Token::SetTime(2),
            Token::NoteOff(60),
            Token::NoteOn(64),
            Token::SetTimeNext(0),
            Token::NoteOff(64),
        ];
        let (sequence, reporter) = decode_collecting(quarter_grid(), &tokens);

        assert!(reporter.is_clean());
        assert_eq!(sequence.total_time, 1.0);
        assert_eq!(
            sequence.notes,
            vec![Note::new(60, 127, 0.0, 0.5), Note::new(64, 127, 0.5, 1.0)]
        );
    }

    #[test]
    fn structural_tokens_are_skipped() {
        let tokens = [
            Token::Start,
            Token::NoteOn(60),
            Token::Pad,
            Token::SetTime(1),
            Token::NoteOff(60),
            Token::End,
        ];
        let (sequence, reporter) = decode_collecting(quarter_grid(), &tokens);

        assert!(reporter.is_clean());
        assert_eq!(sequence.notes, vec![Note::new(60, 127, 0.0, 0.25)]);
    }

    #[test]
    fn ids_decode_like_tokens() {
        let codec = BeatRelativeCodec::new(quarter_grid()).unwrap();
        let tokens = [
            Token::SetVelocity(26),
            Token::NoteOn(72),
            Token::SetTimeNext(3),
            Token::NoteOff(72),
        ];
        let ids = codec.vocabulary().to_ids(&tokens).unwrap();

        let from_ids = codec.decode(&ids).unwrap();
        let from_tokens = codec.decode(&tokens).unwrap();

        assert_eq!(from_ids, from_tokens);
        assert_eq!(from_ids.notes, vec![Note::new(72, 100, 0.0, 1.75)]);
        assert_eq!(from_ids.total_time, 1.75);
    }

    #[test]
    fn unknown_input_is_fatal() {
        let codec = BeatRelativeCodec::new(quarter_grid()).unwrap();

        let too_large = codec.vocabulary().len() as u32;
        assert_eq!(
            codec.decode(&[3, too_large]),
            Err(CodecError::UnknownId(too_large))
        );

        assert_eq!(
            codec.decode(&[Token::DrumOn(36)]),
            Err(CodecError::UnknownToken(Token::DrumOn(36)))
        );
        assert_eq!(
            codec.decode(&[Token::SetTime(4)]),
            Err(CodecError::UnknownToken(Token::SetTime(4)))
        );
        assert_eq!(
            codec.decode(&[Token::AllNotesOff]),
            Err(CodecError::UnknownToken(Token::AllNotesOff))
        );
    }

    #[test]
    fn time_regression_is_ignored() {
        let tokens = [
            Token::SetTime(3),
            Token::NoteOn(60),
            Token::SetTime(1),
            Token::NoteOff(60),
            Token::SetTime(3),
        ];
        let (sequence, reporter) = decode_collecting(quarter_grid(), &tokens);

        assert_eq!(sequence.notes, vec![Note::new(60, 127, 0.75, 0.75)]);
        assert_eq!(sequence.total_time, 0.75);
        assert_eq!(reporter.error_count(), 2);
        assert_eq!(
            reporter.issues[0],
            Issue::TimeRegression {
                token: Token::SetTime(1),
                time: 0.75
            }
        );
        assert_eq!(reporter.issues[2], Issue::DecodeErrors { count: 2 });
    }

    #[test]
    fn set_time_next_moves_to_the_following_beat() {
        let tokens = [
            Token::SetTimeNext(3),
            Token::SetTimeNext(0),
            Token::NoteOn(60),
            Token::SetTime(1),
            Token::NoteOff(60),
        ];
        let (sequence, reporter) = decode_collecting(quarter_grid(), &tokens);

        // 1.75 -> 2.0 is accepted, the note starts at beat 2
        assert!(reporter.is_clean());
        assert_eq!(sequence.notes, vec![Note::new(60, 127, 2.0, 2.25)]);
    }

    #[test]
    fn orphan_note_off_is_counted() {
        let tokens = [
            Token::NoteOn(60),
            Token::SetTime(1),
            Token::NoteOff(62),
            Token::NoteOff(60),
        ];
        let (sequence, reporter) = decode_collecting(quarter_grid(), &tokens);

        assert_eq!(sequence.notes, vec![Note::new(60, 127, 0.0, 0.25)]);
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(
            reporter.issues[0],
            Issue::OrphanNoteOff {
                token: Token::NoteOff(62),
                time: 0.25
            }
        );
    }

    #[test]
    fn repeated_pitch_closes_last_opened_first() {
        let tokens = [
            Token::NoteOn(60),
            Token::SetTime(1),
            Token::NoteOn(60),
            Token::SetTime(2),
            Token::NoteOff(60),
            Token::SetTime(3),
            Token::NoteOff(60),
        ];
        let (sequence, reporter) = decode_collecting(quarter_grid(), &tokens);

        assert!(reporter.is_clean());
        assert_eq!(
            sequence.notes,
            vec![Note::new(60, 127, 0.0, 0.75), Note::new(60, 127, 0.25, 0.5)]
        );
    }

    #[test]
    fn hanging_notes_removed() {
        let tokens = [
            Token::NoteOn(60),
            Token::NoteOn(64),
            Token::SetTime(2),
            Token::NoteOff(64),
            Token::SetTimeNext(1),
        ];
        let (sequence, reporter) = decode_collecting(quarter_grid(), &tokens);

        assert!(sequence.notes.iter().all(|note| note.pitch != 60));
        assert_eq!(sequence.notes, vec![Note::new(64, 127, 0.0, 0.5)]);
        assert_eq!(sequence.total_time, 1.25);
        assert_eq!(reporter.error_count(), 0);
        assert_eq!(reporter.hanging_notes(), 1);
        assert_eq!(
            reporter.issues,
            vec![Issue::HangingNotes {
                count: 1,
                removed: true
            }]
        );
    }

    #[test]
    fn hanging_notes_fixed() {
        let config = CodecConfig {
            errors: HangingNotePolicy::Fix,
            ..quarter_grid()
        };
        let tokens = [
            Token::NoteOn(60),
            Token::NoteOn(64),
            Token::SetTime(2),
            Token::NoteOff(64),
            Token::SetTimeNext(1),
        ];
        let (sequence, reporter) = decode_collecting(config, &tokens);

        let hanging: Vec<&Note> = sequence.notes.iter().filter(|n| n.pitch == 60).collect();
        assert_eq!(hanging.len(), 1);
        assert_eq!(hanging[0].end_time, sequence.total_time);
        assert_eq!(sequence.total_time, 1.25);
        assert_eq!(
            reporter.issues,
            vec![Issue::HangingNotes {
                count: 1,
                removed: false
            }]
        );
    }

    #[test]
    fn blanket_off_closes_everything() {
        let config = CodecConfig {
            use_all_off_event: true,
            use_drum_events: true,
            ..quarter_grid()
        };
        let tokens = [
            Token::NoteOn(60),
            Token::NoteOn(60),
            Token::DrumOn(36),
            Token::SetTime(2),
            Token::AllNotesOff,
            Token::SetTime(3),
            Token::AllNotesOff,
        ];
        let (sequence, reporter) = decode_collecting(config, &tokens);

        assert_eq!(sequence.notes.len(), 3);
        assert!(sequence.notes.iter().all(|note| note.end_time == 0.5));
        assert!(sequence.notes[2].is_drum);
        assert_eq!(reporter.error_count(), 1);
        assert_eq!(reporter.issues[0], Issue::EmptyAllNotesOff { time: 0.75 });
    }

    #[test]
    fn velocity_buckets_decode_to_lower_bound() {
        let tokens = [
            Token::SetVelocity(1),
            Token::NoteOn(60),
            Token::SetVelocity(32),
            Token::NoteOn(62),
            Token::SetTime(1),
            Token::NoteOff(60),
            Token::NoteOff(62),
        ];
        let (sequence, _) = decode_collecting(quarter_grid(), &tokens);

        let velocities: Vec<u8> = sequence.notes.iter().map(|note| note.velocity).collect();
        assert_eq!(velocities, vec![0, 124]);
    }

    #[test]
    fn top_velocity_bucket_stays_in_range() {
        for (velocity_unit, top_bucket, expected) in [(5, 26, 125), (3, 43, 126), (127, 2, 127)] {
            let config = CodecConfig {
                velocity_unit,
                ..quarter_grid()
            };
            let tokens = [
                Token::SetVelocity(top_bucket),
                Token::NoteOn(60),
                Token::SetTime(1),
                Token::NoteOff(60),
            ];
            let (sequence, reporter) = decode_collecting(config, &tokens);

            assert!(reporter.is_clean());
            assert_eq!(sequence.notes[0].velocity, expected, "unit {}", velocity_unit);
        }
    }

    #[test]
    fn round_trip_on_grid() {
        env_logger::try_init().unwrap_or(());

        let config = CodecConfig {
            use_drum_events: true,
            ..CodecConfig::default()
        };
        let codec = BeatRelativeCodec::new(config).unwrap();

        let notes = vec![
            Note::new(60, 100, 0.0, 1.0),
            Note::new(64, 80, 0.0, 0.5),
            Note::new(67, 80, 0.5, 4.25),
            Note::drum(36, 120, 1.0, 1.0 + 1.0 / 12.0),
            Note::drum(42, 64, 1.5, 1.75),
            Note::new(60, 100, 6.0, 7.5),
            Note::new(72, 4, 6.0, 6.0),
        ];

        let ids = match codec.encode(&notes, EncodeOptions::default()).unwrap() {
            crate::codec::Encoded::Ids(ids) => ids,
            other => panic!("expected ids, got {:?}", other),
        };

        let mut reporter = CollectingReporter::new();
        let decoded = codec.decode_with(&ids, &mut reporter).unwrap();

        assert!(reporter.is_clean(), "{:?}", reporter.issues);
        assert_eq!(decoded.total_time, 7.5);

        let expected = sorted(notes);
        let actual = sorted(decoded.notes);
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected.iter()) {
            assert_eq!(a.pitch, e.pitch);
            assert_eq!(a.velocity, e.velocity);
            assert_eq!(a.is_drum, e.is_drum);
            assert!((a.start_time - e.start_time).abs() < 1e-9, "{:?} vs {:?}", a, e);
            assert!((a.end_time - e.end_time).abs() < 1e-9, "{:?} vs {:?}", a, e);
        }
    }

    #[test]
    fn round_trip_with_blanket_off() {
        let config = CodecConfig {
            use_all_off_event: true,
            ..quarter_grid()
        };
        let codec = BeatRelativeCodec::new(config).unwrap();

        let notes = vec![
            Note::new(60, 100, 0.0, 1.0),
            Note::new(64, 100, 0.0, 1.0),
            Note::new(67, 100, 0.0, 1.0),
            Note::new(62, 100, 1.5, 2.0),
        ];

        let tokens = codec.encode_tokens(&notes, true, true).unwrap();
        assert_eq!(
            tokens
                .iter()
                .filter(|token| **token == Token::AllNotesOff)
                .count(),
            2
        );

        let decoded = codec.decode(&tokens).unwrap();
        assert_eq!(sorted(decoded.notes), sorted(notes));
        assert_eq!(decoded.total_time, 2.0);
    }

    #[test]
    fn decoded_notes_never_end_before_they_start() {
        let config = CodecConfig {
            errors: HangingNotePolicy::Fix,
            ..quarter_grid()
        };
        let tokens = [
            Token::SetTimeNext(2),
            Token::NoteOn(60),
            Token::SetTime(1),
            Token::NoteOff(60),
            Token::NoteOn(61),
            Token::SetTimeNext(0),
            Token::NoteOn(62),
            Token::NoteOff(61),
        ];
        let (sequence, _) = decode_collecting(config, &tokens);

        assert_eq!(sequence.notes.len(), 3);
        assert!(sequence.notes.iter().all(|note| note.end_time >= note.start_time));
    }
}
