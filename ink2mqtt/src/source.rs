//! Status source: the external command whose stdout is parsed each cycle
//!
//! Handles:
//! - Splitting the configured command line into argv (no shell involved)
//! - Running it with piped stdout/stderr
//! - Optional timeout; by default a hung command stalls the loop

use std::future::Future;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command as AsyncCommand;
use tracing::debug;

use crate::error::{BridgeError, Result};

/// Default status command, needs root to reach the printer.
pub const DEFAULT_COMMAND: &str = "sudo hp-info -i";

/// Anything that can produce one dump of printer status text.
pub trait StatusSource {
    fn dump(&self) -> impl Future<Output = Result<String>> + Send;
}

/// Runs a local command and returns its stdout.
#[derive(Debug, Clone)]
pub struct CommandSource {
    command_line: String,
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
}

impl CommandSource {
    pub fn new(command_line: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut argv = shell_words::split(command_line)
            .map_err(|e| BridgeError::Config(format!("command `{command_line}`: {e}")))?;
        if argv.is_empty() {
            return Err(BridgeError::Config("status command is empty".to_string()));
        }
        let program = argv.remove(0);

        Ok(Self {
            command_line: command_line.to_string(),
            program,
            args: argv,
            timeout,
        })
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    async fn run(&self) -> Result<String> {
        let child = AsyncCommand::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| BridgeError::SourceTimeout {
                    command: self.command_line.clone(),
                    timeout: limit,
                })?,
            None => child.await,
        }
        .map_err(|source| BridgeError::SourceSpawn {
            command: self.command_line.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(BridgeError::SourceExit {
                command: self.command_line.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl StatusSource for CommandSource {
    async fn dump(&self) -> Result<String> {
        debug!("Running status command: {}", self.command_line);
        self.run().await
    }
}
