//! Command mode
//!
//! The shell runs the main process without any surfaces, prints what it says
//! and exits with the code it asks for (or with its exit status).

use std::io::Write;
use std::sync::Arc;

use crate::main_process::{Invocation, ProcessBridge, ProcessHandle, ProcessOutput};
use crate::protocol::{self, NumericField};
use crate::shutdown::{command_procedure, ShutdownCoordinator};
use crate::Result;

/// What to do with one line of main process output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relay {
    Print(String),
    Exit(i32),
    /// `exit` with a malformed code
    Skip,
}

/// Decide how to relay a line: the decoded `value` field when present,
/// otherwise the line itself
pub fn relay_line(line: &str) -> Relay {
    let command = protocol::decode(line);

    if command.name == "exit" {
        return match NumericField::<i32>::read(&command, "value") {
            NumericField::Value(code) => Relay::Exit(code),
            NumericField::Missing | NumericField::Invalid => {
                tracing::debug!("Ignoring exit without a valid code: {}", line);
                Relay::Skip
            }
        };
    }

    match command.get("value") {
        Some(_) => Relay::Print(command.decoded("value")),
        None => Relay::Print(line.to_string()),
    }
}

/// Run the main process to completion and return the shell's exit code
pub async fn run<O, E>(
    invocation: &Invocation,
    coordinator: &ShutdownCoordinator,
    out: &mut O,
    err: &mut E,
) -> Result<i32>
where
    O: Write,
    E: Write,
{
    let (bridge, output) = ProcessBridge::spawn(invocation)?;
    let bridge = Arc::new(bridge);
    let handle: Arc<dyn ProcessHandle> = bridge.clone();
    coordinator.set(command_procedure(handle));

    let ProcessOutput {
        mut stdout,
        mut stderr,
    } = output;
    let mut stdout_open = true;
    let mut stderr_open = true;

    while stdout_open || stderr_open {
        tokio::select! {
            status = coordinator.requested() => {
                coordinator.invoke(status);
                if bridge.wait_with_grace().await.is_none() {
                    tracing::warn!("{} still running after shutdown", bridge.program());
                }
                return Ok(status);
            }
            line = stdout.recv(), if stdout_open => match line {
                Some(line) => match relay_line(&line) {
                    Relay::Print(text) => {
                        writeln!(out, "{}", text)?;
                        out.flush()?;
                    }
                    Relay::Exit(code) => {
                        out.flush()?;
                        return Ok(code);
                    }
                    Relay::Skip => {}
                },
                None => stdout_open = false,
            },
            line = stderr.recv(), if stderr_open => match line {
                Some(line) => writeln!(err, "{}", line)?,
                None => stderr_open = false,
            },
        }
    }

    out.flush()?;
    err.flush()?;

    tokio::select! {
        status = coordinator.requested() => {
            coordinator.invoke(status);
            Ok(status)
        }
        report = bridge.wait() => {
            tracing::debug!("{} finished: {:?}", bridge.program(), report);
            Ok(report.exit_code())
        }
    }
}
