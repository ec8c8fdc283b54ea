use anyhow::{Context, Result};
use clap::Parser;
use groove_codec::{
    Args, BeatRelativeCodec, EncodeOptions, Encoded, NoteSequence, TempoMap, config_from_args,
    parse_token_stream,
};
use log::{debug, info};
use std::fs;

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = config_from_args(&args)?;
    let tempo = args.qpm.map(TempoMap::constant).transpose()?;

    debug!("Codec configuration: {:?}", config);
    let codec = BeatRelativeCodec::new(config)?;
    info!("Vocabulary size: {} tokens", codec.vocabulary().len());

    let input = fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read input file {}", args.input.display()))?;

    if args.decode {
        let tokens = parse_token_stream(&input, codec.vocabulary())?;
        info!("Decoding {} tokens..!", tokens.len());

        let mut sequence = codec.decode(&tokens)?;
        if let Some(tempo) = &tempo {
            sequence = tempo.denormalize(&sequence);
        }

        if args.dry_run {
            info!("Previewing at most {} notes..!", args.dry_run_max);
            for (i, note) in sequence.notes.iter().take(args.dry_run_max).enumerate() {
                info!(
                    "Note {}: pitch={} velocity={} start={:.3} end={:.3} drum={}",
                    i, note.pitch, note.velocity, note.start_time, note.end_time, note.is_drum
                );
            }
            return Ok(());
        }

        println!("{}", serde_json::to_string_pretty(&sequence)?);
    } else {
        let mut sequence: NoteSequence = serde_json::from_str(&input)
            .with_context(|| format!("Invalid note sequence in {}", args.input.display()))?;
        if let Some(tempo) = &tempo {
            sequence = tempo.normalize(&sequence);
        }

        info!("Encoding {} notes..!", sequence.notes.len());
        let options = EncodeOptions {
            as_ids: !args.as_tokens,
            add_start: args.add_start,
            add_end: args.add_end,
        };
        let encoded = codec.encode(&sequence.notes, options)?;

        if args.dry_run {
            info!("Previewing at most {} of {} tokens..!", args.dry_run_max, encoded.len());
            let tokens = match &encoded {
                Encoded::Ids(ids) => codec.vocabulary().from_ids(ids)?,
                Encoded::Tokens(tokens) => tokens.clone(),
            };
            for (i, token) in tokens.iter().take(args.dry_run_max).enumerate() {
                info!("Token {}: {}", i, token);
            }
            return Ok(());
        }

        let json = match encoded {
            Encoded::Ids(ids) => serde_json::to_string(&ids)?,
            Encoded::Tokens(tokens) => serde_json::to_string(
                &tokens.iter().map(ToString::to_string).collect::<Vec<_>>(),
            )?,
        };
        println!("{}", json);
    }

    Ok(())
}
