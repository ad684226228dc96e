// src/batch/prompt.rs

use anyhow::{Context, Result};
use std::io::{self, BufRead, Write};

use super::ConversionJob;

/// What to do with the rest of a batch after a file failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue,
    Abort,
}

/// Decision point consulted after every failed conversion.
pub trait Prompt {
    fn decide(&mut self, job: &ConversionJob, error: &anyhow::Error) -> Result<Decision>;
}

/// Same answer every time, for unattended runs.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecision(pub Decision);

impl Prompt for FixedDecision {
    fn decide(&mut self, _job: &ConversionJob, _error: &anyhow::Error) -> Result<Decision> {
        Ok(self.0)
    }
}

/// Asks `Continue? [Y/N]` on `output` and reads the answer from `input`.
pub struct ConsolePrompt<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsolePrompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl ConsolePrompt<io::StdinLock<'static>, io::Stderr> {
    /// Prompt on stderr, answer on stdin.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompt for ConsolePrompt<R, W> {
    fn decide(&mut self, _job: &ConversionJob, _error: &anyhow::Error) -> Result<Decision> {
        self.output
            .write_all(b"Continue? [Y/N] ")
            .and_then(|_| self.output.flush())
            .context("writing prompt")?;

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .context("reading prompt answer")?;
        if read == 0 {
            // EOF: nobody there to say yes
            return Ok(Decision::Abort);
        }
        Ok(parse_answer(&line))
    }
}

/// `y` (any case) continues; anything else aborts.
pub fn parse_answer(line: &str) -> Decision {
    if line.trim().eq_ignore_ascii_case("y") {
        Decision::Continue
    } else {
        Decision::Abort
    }
}
