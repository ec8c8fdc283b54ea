use crate::model::config::{Args, CodecConfig, HangingNotePolicy, load_config};
use crate::model::token::Token;
use crate::model::vocabulary::Vocabulary;
use anyhow::{Result, anyhow, bail};
use log::info;
use serde_json::Value;

pub fn parse_error_policy(s: &str) -> HangingNotePolicy {
    match s.to_lowercase().as_str() {
        "r" | "remove" | "drop" => HangingNotePolicy::Remove,
        "f" | "fix" | "close" => HangingNotePolicy::Fix,
        other => {
            info!("Unknown hanging note policy '{}', defaulting to `remove`..!", other);
            HangingNotePolicy::Remove
        }
    }
}

/// Start from the config file (or defaults) and apply every flag given on the command line.
pub fn config_from_args(args: &Args) -> Result<CodecConfig> {
    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => CodecConfig::default(),
    };

    if let Some(units_per_beat) = args.units_per_beat {
        config.units_per_beat = units_per_beat;
    }
    if let Some(velocity_unit) = args.velocity_unit {
        config.velocity_unit = velocity_unit;
    }
    if let Some(default_velocity) = args.default_velocity {
        config.default_velocity = default_velocity;
    }
    if let Some(errors) = args.errors.as_deref() {
        config.errors = parse_error_policy(errors);
    }

    config.use_velocity &= !args.no_velocity;
    config.use_all_off_event |= args.use_all_off_event;
    config.use_drum_events |= args.use_drum_events;
    config.warn_on_errors |= args.warn_on_errors;

    config.validate()?;

    Ok(config)
}

/// Parse a JSON array whose items are token ids or token strings such as `"NoteOn(60)"`.
pub fn parse_token_stream(json: &str, vocabulary: &Vocabulary) -> Result<Vec<Token>> {
    let Value::Array(items) = serde_json::from_str::<Value>(json)? else {
        bail!("Expected a JSON array of token ids or token strings..!");
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Number(n) => {
                let id = n
                    .as_u64()
                    .and_then(|id| u32::try_from(id).ok())
                    .ok_or_else(|| anyhow!("Item {} is not a valid token id: {}", i, n))?;
                Ok(vocabulary.from_id(id)?)
            }
            Value::String(s) => Ok(s.parse::<Token>()?),
            other => Err(anyhow!("Item {} is neither an id nor a token: {}", i, other)),
        })
        .collect()
}
