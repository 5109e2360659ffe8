//! Explain command implementation.
//!
//! Runs a command; when it fails, the failure is explained by a completion block.

use super::open_store;
use crate::cli::Output;
use crate::config::Settings;
use crate::interpret::{ExceptionInterpreter, Reconstruct, INTERPRETATION_MARKER};
use crate::workflow::Function;
use anyhow::Result;
use std::io::Write;
use std::process::Command;
use thiserror::Error;
use tracing::debug;

/// A command that could not be started or exited unsuccessfully.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct CommandFailure {
    pub message: String,
    /// Exit code, if the process ran and exited normally.
    pub status: Option<i32>,
    /// Captured stderr, one entry per line.
    pub stderr: Vec<String>,
}

impl Reconstruct for CommandFailure {
    fn reconstruct(self, message: String) -> Self {
        Self { message, ..self }
    }

    fn traceback(&self) -> Vec<String> {
        self.stderr.clone()
    }
}

/// Run `command`, echoing its output.
pub fn run_command(command: &[String]) -> std::result::Result<(), CommandFailure> {
    let Some((program, args)) = command.split_first() else {
        return Err(CommandFailure {
            message: "no command given".to_string(),
            status: None,
            stderr: Vec::new(),
        });
    };

    debug!("Running {:?}", command);
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| CommandFailure {
            message: format!("failed to start '{}': {}", program, e),
            status: None,
            stderr: Vec::new(),
        })?;

    echo(std::io::stdout(), &output.stdout, "stdout");
    echo(std::io::stderr(), &output.stderr, "stderr");

    if output.status.success() {
        return Ok(());
    }

    let stderr: Vec<String> = String::from_utf8_lossy(&output.stderr)
        .lines()
        .map(str::to_string)
        .collect();
    let status = output.status.code();

    let mut message = match status {
        Some(code) => format!("'{}' exited with status {}", command.join(" "), code),
        None => format!("'{}' was terminated by a signal", command.join(" ")),
    };
    if let Some(last) = stderr.iter().rev().find(|line| !line.trim().is_empty()) {
        message.push_str(": ");
        message.push_str(last.trim());
    }

    Err(CommandFailure {
        message,
        status,
        stderr,
    })
}

/// Forward captured child output. Returns whether it was written.
fn echo(mut out: impl Write, bytes: &[u8], stream: &str) -> bool {
    match out.write_all(bytes).and_then(|()| out.flush()) {
        Ok(()) => true,
        Err(e) => {
            debug!("Could not echo command {}: {}", stream, e);
            false
        }
    }
}

/// Run the explain command. Returns the exit code to use.
pub fn run_explain(
    block: Option<String>,
    prefix: Option<String>,
    tail: Option<usize>,
    command: &[String],
    settings: &Settings,
) -> Result<i32> {
    let block = block.unwrap_or_else(|| settings.interpret.block.clone());
    let prefix = prefix.unwrap_or_else(|| settings.interpret.prompt_prefix.clone());
    let tail = tail.unwrap_or(settings.interpret.traceback_tail);

    let name = command.first().cloned().unwrap_or_default();
    let run = ExceptionInterpreter::new(block, open_store(settings))
        .with_prompt_prefix(prefix)
        .with_traceback_tail(tail)
        .decorate(Function::new(name, run_command))?;

    match run.call(command) {
        Ok(()) => Ok(0),
        Err(failure) => {
            Output::interpretation(&failure.message, INTERPRETATION_MARKER);
            Ok(failure.status.unwrap_or(1))
        }
    }
}
