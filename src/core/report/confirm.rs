use std::io::{self, BufRead, BufReader, Stdin, Stdout, Write};

use super::table::MatchReport;
use crate::core::error::{EngineError, EngineResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Abort,
}

/// The one point where the run waits for the user.
pub trait Confirm: Send {
    fn confirm(&mut self, report: &MatchReport<'_>) -> EngineResult<Decision>;

    /// Show the report without asking anything.
    fn show(&mut self, _report: &MatchReport<'_>) -> EngineResult<()> {
        Ok(())
    }
}

/// Shows the report and asks `continue? (y/n)` until it gets an answer.
/// End of input counts as "no".
pub struct PromptConfirmer<R, W> {
    input: R,
    output: W,
}

impl PromptConfirmer<BufReader<Stdin>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stdout())
    }
}

impl<R: BufRead, W: Write> PromptConfirmer<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead + Send, W: Write + Send> Confirm for PromptConfirmer<R, W> {
    fn confirm(&mut self, report: &MatchReport<'_>) -> EngineResult<Decision> {
        self.show(report)?;

        let pending = report.counts().downloadable();
        loop {
            write!(self.output, "{pending} mod(s) to download, continue? (y/n) ")
                .and_then(|_| self.output.flush())
                .map_err(EngineError::Prompt)?;

            let mut line = String::new();
            let read = self.input.read_line(&mut line).map_err(EngineError::Prompt)?;
            if read == 0 {
                return Ok(Decision::Abort);
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" => return Ok(Decision::Proceed),
                "n" | "no" => return Ok(Decision::Abort),
                _ => continue,
            }
        }
    }

    fn show(&mut self, report: &MatchReport<'_>) -> EngineResult<()> {
        write!(self.output, "{}", report.render())
            .and_then(|_| self.output.flush())
            .map_err(EngineError::Prompt)
    }
}

/// Always proceeds. Still prints the report when given somewhere to print it.
#[derive(Default)]
pub struct Unattended {
    echo: Option<Box<dyn Write + Send>>,
}

impl Unattended {
    pub fn to_stdout() -> Self {
        Self {
            echo: Some(Box::new(io::stdout())),
        }
    }
}

impl Confirm for Unattended {
    fn confirm(&mut self, report: &MatchReport<'_>) -> EngineResult<Decision> {
        self.show(report)?;
        Ok(Decision::Proceed)
    }

    fn show(&mut self, report: &MatchReport<'_>) -> EngineResult<()> {
        if let Some(out) = self.echo.as_mut() {
            write!(out, "{}", report.render()).map_err(EngineError::Prompt)?;
        }
        Ok(())
    }
}
