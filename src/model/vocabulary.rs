use crate::error::{CodecError, Result};
use crate::model::config::CodecConfig;
use crate::model::token::Token;
use std::collections::HashMap;

pub const NUM_PITCHES: u8 = 128;

/// Fixed bijection between tokens and integer ids.
///
/// Built once from a validated [`CodecConfig`]; two equal configurations always produce the
/// same vocabulary, so the table itself never needs to be persisted.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<Token>,
    ids: HashMap<Token, u32>,
}

impl Vocabulary {
    pub fn new(config: &CodecConfig) -> Result<Self> {
        config.validate()?;

        let pitches = || 0..NUM_PITCHES;
        let steps = || 0..config.units_per_beat;

        let mut tokens: Vec<Token> = vec![Token::Pad, Token::Start, Token::End];
        tokens.extend(pitches().map(Token::NoteOn));
        tokens.extend(pitches().map(Token::NoteOff));

        if config.use_all_off_event {
            tokens.push(Token::AllNotesOff);
        }

        if config.use_drum_events {
            tokens.extend(pitches().map(Token::DrumOn));
            tokens.extend(pitches().map(Token::DrumOff));
        }

        tokens.extend(steps().map(Token::SetTime));
        tokens.extend(steps().map(Token::SetTimeNext));

        if config.use_velocity {
            tokens.extend((1..=config.velocity_buckets()).map(Token::SetVelocity));
        }

        let ids = tokens
            .iter()
            .enumerate()
            .map(|(id, token)| (*token, id as u32))
            .collect();

        Ok(Self { tokens, ids })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn contains(&self, token: &Token) -> bool {
        self.ids.contains_key(token)
    }

    pub fn to_id(&self, token: &Token) -> Result<u32> {
        self.ids
            .get(token)
            .copied()
            .ok_or(CodecError::UnknownToken(*token))
    }

    pub fn from_id(&self, id: u32) -> Result<Token> {
        self.tokens
            .get(id as usize)
            .copied()
            .ok_or(CodecError::UnknownId(id))
    }

    pub fn to_ids(&self, tokens: &[Token]) -> Result<Vec<u32>> {
        tokens.iter().map(|token| self.to_id(token)).collect()
    }

    pub fn from_ids(&self, ids: &[u32]) -> Result<Vec<Token>> {
        ids.iter().map(|&id| self.from_id(id)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Token> {
        self.tokens.iter()
    }

    pub fn start_token(&self) -> Token {
        Token::Start
    }

    pub fn end_token(&self) -> Token {
        Token::End
    }
}
