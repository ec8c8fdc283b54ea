use crate::model::token::Token;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, CodecError>;

/// Errors that abort an encode/decode call or codec construction.
///
/// Recoverable problems (orphan note-offs, time regressions, hanging notes...) are never
/// returned through this type, they go to a [`crate::Reporter`] instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    #[error("Invalid token id: {0}")]
    UnknownId(u32),

    #[error("Invalid token: {0}")]
    UnknownToken(Token),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to parse '{input}': {reason}")]
    Parse { input: String, reason: String },
}
