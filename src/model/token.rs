use crate::error::CodecError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single word of the beat-relative vocabulary.
///
/// The textual form mirrors the token names used by the model's training data:
/// `<pad>`, `<s>`, `</s>`, `NoteOn(60)`, `NoteOff(*)`, `SetTimeNext(0)`...
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    Pad,
    Start,
    End,
    NoteOn(u8),
    NoteOff(u8),
    /// Releases every sounding note at once, written `NoteOff(*)`.
    AllNotesOff,
    DrumOn(u8),
    DrumOff(u8),
    /// Move to a step inside the current beat.
    SetTime(u32),
    /// Move to a step inside the next beat.
    SetTimeNext(u32),
    /// Velocity bucket, starting at 1.
    SetVelocity(u32),
}

impl Token {
    /// Any single-note release, melodic or drum. [`Token::AllNotesOff`] is not included.
    pub fn is_note_off(&self) -> bool {
        matches!(self, Token::NoteOff(_) | Token::DrumOff(_))
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Pad => write!(f, "<pad>"),
            Token::Start => write!(f, "<s>"),
            Token::End => write!(f, "</s>"),
            Token::NoteOn(pitch) => write!(f, "NoteOn({})", pitch),
            Token::NoteOff(pitch) => write!(f, "NoteOff({})", pitch),
            Token::AllNotesOff => write!(f, "NoteOff(*)"),
            Token::DrumOn(pitch) => write!(f, "DrumOn({})", pitch),
            Token::DrumOff(pitch) => write!(f, "DrumOff({})", pitch),
            Token::SetTime(step) => write!(f, "SetTime({})", step),
            Token::SetTimeNext(step) => write!(f, "SetTimeNext({})", step),
            Token::SetVelocity(bucket) => write!(f, "SetVelocity({})", bucket),
        }
    }
}

impl FromStr for Token {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let parse_err = |reason: &str| CodecError::Parse {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        match s {
            "<pad>" => return Ok(Token::Pad),
            "<s>" => return Ok(Token::Start),
            "</s>" => return Ok(Token::End),
            "NoteOff(*)" => return Ok(Token::AllNotesOff),
            _ => {}
        }

        let Some((name, rest)) = s.split_once('(') else {
            return Err(parse_err("expected `Name(value)`"));
        };
        let Some(value) = rest.strip_suffix(')') else {
            return Err(parse_err("missing closing parenthesis"));
        };

        let pitch = || {
            value
                .parse::<u8>()
                .map_err(|_| parse_err("pitch must be an integer in 0..=255"))
        };
        let number = || {
            value
                .parse::<u32>()
                .map_err(|_| parse_err("value must be a non-negative integer"))
        };

        match name {
            "NoteOn" => Ok(Token::NoteOn(pitch()?)),
            "NoteOff" => Ok(Token::NoteOff(pitch()?)),
            "DrumOn" => Ok(Token::DrumOn(pitch()?)),
            "DrumOff" => Ok(Token::DrumOff(pitch()?)),
            "SetTime" => Ok(Token::SetTime(number()?)),
            "SetTimeNext" => Ok(Token::SetTimeNext(number()?)),
            "SetVelocity" => Ok(Token::SetVelocity(number()?)),
            _ => Err(parse_err("unknown event name")),
        }
    }
}
