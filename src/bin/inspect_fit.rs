use anyhow::{Context, Result};
use clap::Parser;
use fitsnake::{
    decode::{Decoder, FitDecoder},
    schema::{derive_headers, MessageFilter, Profile},
};
use serde::Serialize;
use std::{collections::BTreeMap, fs::File, io::BufReader, path::PathBuf};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

/// Print the message types, row counts and derived column headers of FIT files as YAML.
#[derive(Parser, Debug)]
#[command(author, version)]
struct Args {
    /// FIT files to inspect
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Include message types that are not part of the FIT profile
    #[arg(long)]
    all_messages: bool,
}

/// What one message type looks like once tabulated.
#[derive(Serialize)]
struct MessageSummary {
    rows: usize,
    headers: Vec<String>,
}

#[derive(Serialize)]
struct FileSummary {
    decode_errors: Vec<String>,
    messages: BTreeMap<String, MessageSummary>,
}

fn main() -> Result<()> {
    fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let profile = Profile::builtin();
    let filter = MessageFilter::new(&profile);

    let mut out: BTreeMap<String, FileSummary> = BTreeMap::new();
    for path in &args.inputs {
        let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let decoded = FitDecoder
            .decode(&mut BufReader::new(file))
            .with_context(|| format!("decoding {}", path.display()))?;
        for err in &decoded.errors {
            warn!("{}: {}", path.display(), err);
        }

        let messages = if args.all_messages {
            decoded.messages
        } else {
            filter.filter(decoded.messages)
        };

        let summary = FileSummary {
            decode_errors: decoded.errors,
            messages: messages
                .iter()
                .map(|(name, rows)| {
                    (
                        name.to_string(),
                        MessageSummary {
                            rows: rows.len(),
                            headers: derive_headers(rows),
                        },
                    )
                })
                .collect(),
        };
        out.insert(path.display().to_string(), summary);
    }

    print!("{}", serde_yaml::to_string(&out)?);
    Ok(())
}
