use crate::error::{CodecError, Result};
use crate::model::config::CodecConfig;
use crate::model::token::Token;
use crate::model::vocabulary::Vocabulary;
use crate::report::LogReporter;

mod decode;
mod encode;
pub mod queue;

pub use encode::compress_note_offs;

/// Converts beat-relative note collections to vocabulary tokens and back.
///
/// Immutable after construction and safe to share between threads; every encode or decode
/// call keeps its own state.
#[derive(Debug, Clone)]
pub struct BeatRelativeCodec {
    config: CodecConfig,
    vocabulary: Vocabulary,
}

impl BeatRelativeCodec {
    pub fn new(config: CodecConfig) -> Result<Self> {
        let vocabulary = Vocabulary::new(&config)?;

        Ok(Self { config, vocabulary })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    fn log_reporter(&self) -> LogReporter {
        LogReporter::new(self.config.warn_on_errors)
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub as_ids: bool,
    pub add_start: bool,
    pub add_end: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            as_ids: true,
            add_start: false,
            add_end: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoded {
    Ids(Vec<u32>),
    Tokens(Vec<Token>),
}

impl Encoded {
    pub fn len(&self) -> usize {
        match self {
            Encoded::Ids(ids) => ids.len(),
            Encoded::Tokens(tokens) => tokens.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Anything the decoder accepts as one item of a token stream.
pub trait TokenInput {
    /// Resolve to a token of `vocabulary`, failing on anything outside of it.
    fn resolve(&self, vocabulary: &Vocabulary) -> Result<Token>;
}

impl TokenInput for Token {
    fn resolve(&self, vocabulary: &Vocabulary) -> Result<Token> {
        if vocabulary.contains(self) {
            Ok(*self)
        } else {
            Err(CodecError::UnknownToken(*self))
        }
    }
}

impl TokenInput for u32 {
    fn resolve(&self, vocabulary: &Vocabulary) -> Result<Token> {
        vocabulary.from_id(*self)
    }
}

impl<T: TokenInput + ?Sized> TokenInput for &T {
    fn resolve(&self, vocabulary: &Vocabulary) -> Result<Token> {
        (**self).resolve(vocabulary)
    }
}
