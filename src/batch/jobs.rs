// src/batch/jobs.rs

use anyhow::Result;
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::decode::MessageSet;
use crate::write;

/// Output format selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Xlsx,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Xlsx => "xlsx",
        }
    }

    pub fn write(self, messages: &MessageSet, path: &Path) -> Result<()> {
        match self {
            OutputFormat::Json => write::write_json(messages, path),
            OutputFormat::Xlsx => write::write_xlsx(messages, path),
        }
    }
}

/// Bad combination of inputs and output target. Reported before any file is
/// touched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no input files given")]
    NoInputs,
    #[error(
        "if output path is a file, only one input file can be specified \
         ({count} given for {path:?})"
    )]
    AmbiguousOutput { path: PathBuf, count: usize },
    #[error("more than one input file would be written to {path:?}")]
    DuplicateOutput { path: PathBuf },
}

/// One input file and the output it converts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionJob {
    pub input: PathBuf,
    pub output: PathBuf,
}

/// Resolve the output path of every input up front:
///  - no `outpath`: next to the input, extension swapped
///  - `outpath` is a directory: input file name (extension swapped) inside it
///  - otherwise `outpath` is the output file, allowed for a single input only
///
/// Two inputs resolving to the same output are rejected.
pub fn resolve_jobs(
    inputs: &[PathBuf],
    outpath: Option<&Path>,
    format: OutputFormat,
) -> Result<Vec<ConversionJob>, ConfigError> {
    if inputs.is_empty() {
        return Err(ConfigError::NoInputs);
    }

    let ext = format.extension();
    let target = match outpath {
        Some(out) if !out.is_dir() && inputs.len() > 1 => {
            return Err(ConfigError::AmbiguousOutput {
                path: out.to_path_buf(),
                count: inputs.len(),
            });
        }
        other => other,
    };

    let jobs: Vec<ConversionJob> = inputs
        .iter()
        .map(|input| {
            let output = match target {
                None => input.with_extension(ext),
                Some(dir) if dir.is_dir() => {
                    let name = input.with_extension(ext);
                    match name.file_name() {
                        Some(file_name) => dir.join(file_name),
                        None => dir.join(format!("output.{}", ext)),
                    }
                }
                Some(file) => file.to_path_buf(),
            };
            ConversionJob {
                input: input.clone(),
                output,
            }
        })
        .collect();

    let mut seen = HashSet::new();
    if let Some(clash) = jobs.iter().find(|job| !seen.insert(&job.output)) {
        return Err(ConfigError::DuplicateOutput {
            path: clash.output.clone(),
        });
    }

    Ok(jobs)
}
