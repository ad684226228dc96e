// src/batch/mod.rs
pub mod jobs;
pub mod prompt;

pub use jobs::{resolve_jobs, ConfigError, ConversionJob, OutputFormat};
pub use prompt::{parse_answer, ConsolePrompt, Decision, FixedDecision, Prompt};

use anyhow::{Context, Result};
use std::{fs::File, io::BufReader, path::PathBuf, time::Instant};
use tracing::{error, info, instrument, warn};

use crate::decode::Decoder;
use crate::schema::MessageFilter;

/// What a successful conversion produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertSummary {
    pub message_types: usize,
    pub rows: usize,
    pub decode_errors: usize,
}

/// Decode → filter → write, for one job at a time.
pub struct Converter<'a> {
    decoder: &'a dyn Decoder,
    filter: Option<&'a MessageFilter<'a>>,
    format: OutputFormat,
}

impl<'a> Converter<'a> {
    /// `filter = None` keeps every message type the decoder produced.
    pub fn new(
        decoder: &'a dyn Decoder,
        filter: Option<&'a MessageFilter<'a>>,
        format: OutputFormat,
    ) -> Self {
        Self {
            decoder,
            filter,
            format,
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    #[instrument(level = "info", skip(self, job), fields(input = %job.input.display()))]
    pub fn convert(&self, job: &ConversionJob) -> Result<ConvertSummary> {
        info!(
            "converting {} to {}",
            job.input.display(),
            job.output.display()
        );

        let file = File::open(&job.input)
            .with_context(|| format!("opening {}", job.input.display()))?;
        let mut reader = BufReader::new(file);
        let decoded = self
            .decoder
            .decode(&mut reader)
            .with_context(|| format!("decoding {}", job.input.display()))?;

        if !decoded.errors.is_empty() {
            warn!("encountered errors decoding {}:", job.input.display());
            for err in &decoded.errors {
                warn!("    {}", err);
            }
        }

        let messages = match self.filter {
            Some(filter) => filter.filter(decoded.messages),
            None => decoded.messages,
        };

        self.format
            .write(&messages, &job.output)
            .with_context(|| format!("writing {}", job.output.display()))?;

        Ok(ConvertSummary {
            message_types: messages.len(),
            rows: messages.row_count(),
            decode_errors: decoded.errors.len(),
        })
    }
}

/// Outcome of a whole batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub converted: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
    pub aborted: bool,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty() && !self.aborted
    }
}

/// Convert `jobs` in order. After a failure `prompt` decides whether the
/// remaining jobs run; outputs already written are left alone either way.
pub fn run_batch(
    jobs: &[ConversionJob],
    converter: &Converter<'_>,
    prompt: &mut dyn Prompt,
) -> BatchReport {
    let mut report = BatchReport::default();
    let start = Instant::now();

    for (idx, job) in jobs.iter().enumerate() {
        match converter.convert(job) {
            Ok(summary) => {
                info!(
                    types = summary.message_types,
                    rows = summary.rows,
                    decode_errors = summary.decode_errors,
                    "OK {}",
                    job.output.display()
                );
                report.converted.push(job.output.clone());
            }
            Err(err) => {
                error!(
                    "error converting {} to {}: {:#}",
                    job.input.display(),
                    job.output.display(),
                    err
                );
                report.failed.push((job.input.clone(), format!("{:#}", err)));

                let remaining = jobs.len() - idx - 1;
                let decision = match prompt.decide(job, &err) {
                    Ok(decision) => decision,
                    Err(prompt_err) => {
                        error!("prompt failed: {:#}", prompt_err);
                        Decision::Abort
                    }
                };
                if decision == Decision::Abort {
                    if remaining > 0 {
                        warn!("aborting batch, {} file(s) not processed", remaining);
                    }
                    report.aborted = true;
                    break;
                }
            }
        }
    }

    info!(
        converted = report.converted.len(),
        failed = report.failed.len(),
        elapsed = ?start.elapsed(),
        "batch finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::{Decoded, FieldValue, MessageSet, Record};
    use crate::schema::Profile;
    use anyhow::anyhow;
    use std::{fs, io::Read, path::Path};
    use tempfile::tempdir;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,fitsnake=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    /// Treats the file content as a row count; `bad` content fails to decode.
    struct StubDecoder;

    impl Decoder for StubDecoder {
        fn decode(&self, reader: &mut dyn Read) -> Result<Decoded> {
            let mut text = String::new();
            reader.read_to_string(&mut text)?;
            let rows: usize = text
                .trim()
                .parse()
                .map_err(|_| anyhow!("not a FIT file"))?;

            let mut messages = MessageSet::new();
            for i in 0..rows {
                messages.push(
                    "record",
                    Record::new().with("distance", FieldValue::UInt(i as u64)),
                );
            }
            messages.push("65280", Record::new());
            Ok(Decoded {
                messages,
                errors: vec!["CRC mismatch".to_string()],
            })
        }
    }

    /// Replays scripted answers and counts how often it was asked.
    struct Scripted {
        answers: Vec<Decision>,
        asked: usize,
    }

    impl Prompt for Scripted {
        fn decide(&mut self, _job: &ConversionJob, _error: &anyhow::Error) -> Result<Decision> {
            let answer = self.answers.get(self.asked).copied().unwrap_or(Decision::Abort);
            self.asked += 1;
            Ok(answer)
        }
    }

    fn inputs(dir: &Path, contents: &[&str]) -> Vec<PathBuf> {
        contents
            .iter()
            .enumerate()
            .map(|(i, body)| {
                let path = dir.join(format!("ride{}.fit", i));
                fs::write(&path, body).unwrap();
                path
            })
            .collect()
    }

    #[test]
    fn converts_every_file_and_filters_unknown_types() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let files = inputs(dir.path(), &["2", "3"]);
        let jobs = resolve_jobs(&files, None, OutputFormat::Json)?;

        let profile = Profile::builtin();
        let filter = MessageFilter::new(&profile);
        let converter = Converter::new(&StubDecoder, Some(&filter), OutputFormat::Json);
        let mut prompt = Scripted {
            answers: vec![],
            asked: 0,
        };

        let report = run_batch(&jobs, &converter, &mut prompt);
        assert!(report.is_clean());
        assert_eq!(report.converted.len(), 2);
        assert_eq!(prompt.asked, 0);

        let json: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("ride1.json"))?)?;
        let obj = json.as_object().unwrap();
        assert_eq!(obj.keys().collect::<Vec<_>>(), vec!["record"]);
        assert_eq!(obj["record"].as_array().unwrap().len(), 3);
        Ok(())
    }

    #[test]
    fn without_filter_unknown_types_are_kept() -> Result<()> {
        let dir = tempdir()?;
        let files = inputs(dir.path(), &["1"]);
        let jobs = resolve_jobs(&files, None, OutputFormat::Json)?;
        let converter = Converter::new(&StubDecoder, None, OutputFormat::Json);

        let summary = converter.convert(&jobs[0])?;
        assert_eq!(summary.message_types, 2);
        assert_eq!(summary.decode_errors, 1);
        Ok(())
    }

    #[test]
    fn continue_after_failure_processes_the_rest() -> Result<()> {
        init_test_logging();
        let dir = tempdir()?;
        let files = inputs(dir.path(), &["1", "garbage", "2"]);
        let jobs = resolve_jobs(&files, None, OutputFormat::Xlsx)?;

        let converter = Converter::new(&StubDecoder, None, OutputFormat::Xlsx);
        let mut prompt = Scripted {
            answers: vec![Decision::Continue],
            asked: 0,
        };

        let report = run_batch(&jobs, &converter, &mut prompt);
        assert!(!report.aborted);
        assert_eq!(prompt.asked, 1);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, files[1]);
        assert_eq!(report.converted, vec![jobs[0].output.clone(), jobs[2].output.clone()]);
        assert!(jobs[0].output.exists());
        assert!(!jobs[1].output.exists());
        assert!(jobs[2].output.exists());
        Ok(())
    }

    #[test]
    fn abort_after_failure_stops_but_keeps_earlier_outputs() -> Result<()> {
        let dir = tempdir()?;
        let files = inputs(dir.path(), &["1", "garbage", "2"]);
        let jobs = resolve_jobs(&files, None, OutputFormat::Json)?;

        let converter = Converter::new(&StubDecoder, None, OutputFormat::Json);
        let mut prompt = FixedDecision(Decision::Abort);

        let report = run_batch(&jobs, &converter, &mut prompt);
        assert!(report.aborted);
        assert_eq!(report.converted, vec![jobs[0].output.clone()]);
        assert!(jobs[0].output.exists());
        assert!(!jobs[2].output.exists());
        Ok(())
    }

    #[test]
    fn missing_input_is_a_recoverable_failure() -> Result<()> {
        let dir = tempdir()?;
        let jobs = vec![ConversionJob {
            input: dir.path().join("gone.fit"),
            output: dir.path().join("gone.json"),
        }];
        let converter = Converter::new(&StubDecoder, None, OutputFormat::Json);
        let mut prompt = FixedDecision(Decision::Continue);

        let report = run_batch(&jobs, &converter, &mut prompt);
        assert!(!report.aborted);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].1.contains("opening"));
        Ok(())
    }
}
