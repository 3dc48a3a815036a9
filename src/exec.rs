//! Host subprocess execution
//!
//! Every host tool the core shells out to (`ps`, `ss`, `df`, `nginx -t`,
//! `systemctl`) goes through [`CommandRunner`] so tests can substitute canned
//! output for the real system.

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A successful run that printed `stdout`
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            success: true,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A failed run that printed `stderr`
    pub fn failed(stderr: impl Into<String>) -> Self {
        Self {
            success: false,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// stdout followed by stderr, trimmed
    pub fn combined(&self) -> String {
        format!("{}{}", self.stdout, self.stderr).trim().to_string()
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` with `args` to completion. A non-zero exit is reported
    /// through [`CommandOutput::success`]; only a failure to spawn is an error.
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs commands on the local host
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| Error::Command {
                program: program.to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!(
            "{} {:?} exited with {}",
            program,
            args,
            output.status
        );

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}
