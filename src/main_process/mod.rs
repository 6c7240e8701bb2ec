//! Child process management
//!
//! This module handles spawning, monitoring, and communicating with child
//! processes (the main logic process and renderer processes) via the line
//! protocol over stdio.

mod invocation;
mod process;

pub use invocation::{EnvBlock, Invocation};
pub use process::{terminate, ExitReport, ProcessBridge, ProcessOutput};

use crate::Result;

/// What the router and the shutdown procedures need from a child process
pub trait ProcessHandle: Send + Sync {
    /// Write one line to the child's stdin
    fn write_line(&self, line: &str) -> Result<()>;

    /// Stop the child; idempotent
    fn terminate(&self);
}

impl ProcessHandle for ProcessBridge {
    fn write_line(&self, line: &str) -> Result<()> {
        self.write(line)
    }

    fn terminate(&self) {
        self.kill();
    }
}
