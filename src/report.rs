use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

use crate::error::Result;
use crate::workflow::types::PollOutcome;

pub const EXIT_PASSED: u8 = 0;
pub const EXIT_FAILED: u8 = 1;

/// Publishes step outputs and the final failure signal to the host.
pub trait Reporter: Send + Sync {
    fn set_output(&self, name: &str, value: &str) -> Result<()>;

    fn fail(&self, message: &str) -> Result<()>;
}

/// Reporter for GitHub Actions steps.
///
/// Outputs are appended to the `GITHUB_OUTPUT` file when it is set and printed
/// to stdout otherwise. Failures are emitted as `::error::` workflow commands.
#[derive(Debug, Clone, Default)]
pub struct ActionsReporter {
    output_path: Option<PathBuf>,
}

impl ActionsReporter {
    pub fn new(output_path: Option<PathBuf>) -> Self {
        Self { output_path }
    }

    pub fn from_env() -> Self {
        let output_path = std::env::var_os("GITHUB_OUTPUT")
            .filter(|p| !p.is_empty())
            .map(PathBuf::from);
        Self::new(output_path)
    }
}

impl Reporter for ActionsReporter {
    fn set_output(&self, name: &str, value: &str) -> Result<()> {
        tracing::debug!(name, value, "Setting output");
        match &self.output_path {
            Some(path) => {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                writeln!(file, "{name}={value}")?;
            }
            None => println!("{name}={value}"),
        }
        Ok(())
    }

    fn fail(&self, message: &str) -> Result<()> {
        write_error(&mut std::io::stdout().lock(), message)?;
        Ok(())
    }
}

/// Publish the final answer of a wait and return the process exit code.
///
/// Only a passed run exits cleanly. Failed runs and errors are reported
/// through [`Reporter::fail`].
pub fn finish(result: &anyhow::Result<PollOutcome>, reporter: &dyn Reporter) -> Result<u8> {
    match result {
        Ok(outcome @ PollOutcome::Passed { .. }) => {
            tracing::info!(run_id = outcome.run_id(), "{outcome}");
            Ok(EXIT_PASSED)
        }
        Ok(outcome) => {
            tracing::error!(run_id = outcome.run_id(), "{outcome}");
            reporter.fail(&outcome.to_string())?;
            Ok(EXIT_FAILED)
        }
        Err(e) => {
            let message = format!("{e:#}");
            tracing::error!(error = %message, "Waiting for workflow run failed");
            reporter.fail(&message)?;
            Ok(EXIT_FAILED)
        }
    }
}

fn write_error(out: &mut impl Write, message: &str) -> std::io::Result<()> {
    writeln!(out, "::error::{}", escape_command_data(message))
}

/// Escape a message for use as workflow command data.
fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
