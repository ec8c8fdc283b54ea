use crate::error::{CodecError, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What to do with notes that are still sounding when a token stream ends.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HangingNotePolicy {
    /// Drop hanging notes from the decoded sequence.
    #[default]
    Remove,

    /// Close hanging notes at the end of the decoded sequence.
    Fix,
}

impl fmt::Display for HangingNotePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HangingNotePolicy::Remove => write!(f, "remove"),
            HangingNotePolicy::Fix => write!(f, "fix"),
        }
    }
}

/// Immutable codec configuration. Equal configurations always produce equal vocabularies.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct CodecConfig {
    /// Grid resolution within one beat.
    pub units_per_beat: u32,
    /// Width of one velocity bucket.
    pub velocity_unit: u32,
    pub use_velocity: bool,
    /// Substituted for out-of-range velocities on encode, and the initial velocity on decode.
    pub default_velocity: u8,
    pub use_all_off_event: bool,
    pub use_drum_events: bool,
    pub errors: HangingNotePolicy,
    /// Report recoverable problems at warn level instead of debug.
    pub warn_on_errors: bool,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            units_per_beat: 12,
            velocity_unit: 4,
            use_velocity: true,
            default_velocity: 127,
            use_all_off_event: false,
            use_drum_events: false,
            errors: HangingNotePolicy::Remove,
            warn_on_errors: false,
        }
    }
}

impl CodecConfig {
    pub fn validate(&self) -> Result<()> {
        if self.units_per_beat == 0 {
            return Err(CodecError::InvalidConfig(
                "units_per_beat must be at least 1".into(),
            ));
        }

        if self.velocity_unit == 0 {
            return Err(CodecError::InvalidConfig(
                "velocity_unit must be at least 1".into(),
            ));
        }

        if !(1..=127).contains(&self.default_velocity) {
            return Err(CodecError::InvalidConfig(format!(
                "default_velocity must be in 1..=127, got {}",
                self.default_velocity
            )));
        }

        Ok(())
    }

    /// Number of `SetVelocity` buckets needed to cover velocities 0..=127, zero when
    /// `velocity_unit` is 0.
    pub fn velocity_buckets(&self) -> u32 {
        match self.velocity_unit {
            0 => 0,
            unit => 128u32.div_ceil(unit),
        }
    }
}

/// Load a codec configuration from a JSON file. Missing fields take their default values.
pub fn load_config<P: AsRef<Path>>(path: P) -> anyhow::Result<CodecConfig> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        anyhow::anyhow!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        )
    })?;
    let config: CodecConfig = serde_json::from_str(&content)?;
    config.validate()?;

    Ok(config)
}

#[derive(Parser, Debug)]
#[command(
    name = "groove_codec",
    about = "Encode beat-relative note sequences into model tokens, and decode them back!"
)]
pub struct Args {
    /// Path to the input JSON file: a note sequence when encoding, a list of ids or token strings when decoding.
    pub input: PathBuf,

    /// Decode a token list instead of encoding a note sequence.
    #[arg(short, long, default_value_t = false)]
    pub decode: bool,

    /// Emit token strings instead of integer ids when encoding.
    #[arg(short = 't', long = "tokens", default_value_t = false)]
    pub as_tokens: bool,

    /// Prepend the start token when encoding.
    #[arg(long, default_value_t = false)]
    pub add_start: bool,

    /// Append the end token when encoding.
    #[arg(long, default_value_t = false)]
    pub add_end: bool,

    /// Treat note times as seconds at this constant tempo (quarter notes per minute).
    /// Without it, times are already expressed in beats.
    #[arg(short, long)]
    pub qpm: Option<f64>,

    /// JSON codec configuration file. Flags below override its values.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Grid resolution within one beat.
    #[arg(long)]
    pub units_per_beat: Option<u32>,

    /// Width of one velocity bucket.
    #[arg(long)]
    pub velocity_unit: Option<u32>,

    /// Disable SetVelocity tokens.
    #[arg(long, default_value_t = false)]
    pub no_velocity: bool,

    /// Velocity used in place of invalid ones, and before the first SetVelocity when decoding.
    #[arg(long)]
    pub default_velocity: Option<u8>,

    /// Enable the blanket NoteOff(*) token.
    #[arg(long = "all-off", default_value_t = false)]
    pub use_all_off_event: bool,

    /// Enable DrumOn/DrumOff tokens.
    #[arg(long = "drums", default_value_t = false)]
    pub use_drum_events: bool,

    /// Hanging note policy: remove|fix.
    #[arg(short, long)]
    pub errors: Option<String>,

    /// Report recoverable codec problems as warnings.
    #[arg(short, long, default_value_t = false)]
    pub warn_on_errors: bool,

    /// Dry run (log the first dry_run_max output items instead of printing JSON).
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    /// Maximum items to log in dry run.
    #[arg(long, default_value_t = 80)]
    pub dry_run_max: usize,
}
