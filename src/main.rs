use anyhow::Result;
use clap::{error::ErrorKind, Args, CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use fitsnake::{
    batch::{
        resolve_jobs, run_batch, BatchReport, ConsolePrompt, Converter, Decision, FixedDecision,
        OutputFormat, Prompt,
    },
    decode::FitDecoder,
    schema::{MessageFilter, Profile},
};
use std::{path::PathBuf, process::ExitCode};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Convert FIT activity files to JSON or XLSX",
    long_about = None
)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert FIT file(s) to pretty-printed JSON
    Json(ConvertArgs),
    /// Convert FIT file(s) to XLSX workbooks, one sheet per message type
    Xlsx(ConvertArgs),
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Source FIT data file(s)
    #[arg(required = true, value_parser = existing_file, value_hint = ValueHint::FilePath)]
    infile: Vec<PathBuf>,

    /// Output file or directory. Default is the same directory as the input file
    #[arg(short, long, value_hint = ValueHint::AnyPath)]
    outpath: Option<PathBuf>,

    /// Keep message types that are not part of the FIT profile
    #[arg(long)]
    all_messages: bool,

    /// YAML file (`messages: [...]`) replacing the built-in FIT profile
    #[arg(long, value_parser = existing_file, conflicts_with = "all_messages")]
    profile: Option<PathBuf>,

    /// What to do when a file fails to convert
    #[arg(long, value_enum, default_value_t = OnError::Ask)]
    on_error: OnError,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum OnError {
    /// Ask on the terminal whether to carry on
    Ask,
    /// Skip the failed file and carry on
    Continue,
    /// Stop the whole batch
    Abort,
}

fn existing_file(raw: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(raw);
    if path.is_file() {
        Ok(path)
    } else if path.exists() {
        Err(format!("{} is not a file", raw))
    } else {
        Err(format!("{} does not exist", raw))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // ─── 1) init logging ─────────────────────────────────────────────
    let default_level = if cli.verbose { "debug" } else { "info" };
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let (format, args) = match cli.command {
        Command::Json(args) => (OutputFormat::Json, args),
        Command::Xlsx(args) => (OutputFormat::Xlsx, args),
    };

    match run(format, &args) {
        Ok(report) if report.aborted => ExitCode::FAILURE,
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn run(format: OutputFormat, args: &ConvertArgs) -> Result<BatchReport> {
    // ─── 2) resolve every output path before writing anything ────────
    let jobs = match resolve_jobs(&args.infile, args.outpath.as_deref(), format) {
        Ok(jobs) => jobs,
        Err(err) => Cli::command()
            .error(ErrorKind::ArgumentConflict, err)
            .exit(),
    };

    // ─── 3) build the message-type allow-list once ───────────────────
    let profile = match &args.profile {
        Some(path) => Profile::from_yaml_path(path)?,
        None => Profile::builtin(),
    };
    let filter = MessageFilter::new(&profile);
    let active_filter = if args.all_messages {
        info!("profile filter disabled, keeping every message type");
        None
    } else {
        info!("{} message types in profile", profile.len());
        Some(&filter)
    };

    // ─── 4) convert one file at a time ───────────────────────────────
    let decoder = FitDecoder;
    let converter = Converter::new(&decoder, active_filter, format);
    let mut prompt: Box<dyn Prompt> = match args.on_error {
        OnError::Ask => Box::new(ConsolePrompt::stdio()),
        OnError::Continue => Box::new(FixedDecision(Decision::Continue)),
        OnError::Abort => Box::new(FixedDecision(Decision::Abort)),
    };

    let report = run_batch(&jobs, &converter, prompt.as_mut());

    for (input, reason) in &report.failed {
        warn!("skipped {}: {}", input.display(), reason);
    }
    if report.aborted {
        error!("aborted");
    } else if report.is_clean() {
        info!("file conversion complete");
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_xlsx_subcommand() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("ride.fit");
        fs::write(&input, b"").unwrap();

        let cli = Cli::try_parse_from([
            "fitsnake",
            "-v",
            "xlsx",
            input.to_str().unwrap(),
            "-o",
            dir.path().to_str().unwrap(),
            "--on-error",
            "continue",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Command::Xlsx(args) => {
                assert_eq!(args.infile, vec![input]);
                assert_eq!(args.outpath.as_deref(), Some(dir.path()));
                assert_eq!(args.on_error, OnError::Continue);
                assert!(!args.all_messages);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn rejects_missing_and_directory_inputs() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("missing.fit");

        assert!(Cli::try_parse_from(["fitsnake", "json", missing.to_str().unwrap()]).is_err());
        assert!(Cli::try_parse_from(["fitsnake", "json", dir.path().to_str().unwrap()]).is_err());
        assert!(Cli::try_parse_from(["fitsnake", "json"]).is_err());
    }

    #[test]
    fn version_flag_short_circuits() {
        let err = Cli::try_parse_from(["fitsnake", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }
}
