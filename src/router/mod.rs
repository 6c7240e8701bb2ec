//! Command routing between the main process and the surfaces
//!
//! The two directions are asymmetric: the main process may drive
//! any surface operation, while surfaces only get a handful of shell-privileged
//! verbs intercepted. Everything else a surface says goes to the main process
//! untouched.
//!
//! The router is owned by the primary loop; its methods are the only place
//! where surface state changes.

mod from_main;
mod from_surface;

use std::io::Write;
use std::sync::Arc;

use crate::main_process::ProcessHandle;
use crate::surface::Surface;
use crate::Result;

/// What the primary loop should do after a dispatch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Tear everything down and start over
    Restart,
    /// Shut down with the given exit code
    Exit(i32),
}

pub struct Router {
    surfaces: Vec<Arc<dyn Surface>>,
    main: Arc<dyn ProcessHandle>,
    console: Box<dyn Write + Send>,
    exit_code: i32,
}

impl Router {
    pub fn new(surfaces: Vec<Arc<dyn Surface>>, main: Arc<dyn ProcessHandle>) -> Self {
        Self {
            surfaces,
            main,
            console: Box::new(std::io::stdout()),
            exit_code: 0,
        }
    }

    /// Send `stdout` commands somewhere other than the shell's stdout
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = console;
        self
    }

    /// Exit code carried by the last processed `exit` command
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Surface addressed by a command; no index means `fallback`
    fn surface(&self, index: Option<usize>, fallback: usize) -> Option<Arc<dyn Surface>> {
        let index = index.unwrap_or(fallback);
        let surface = self.surfaces.get(index).cloned();
        if surface.is_none() {
            tracing::debug!("No surface with index {}, dropping command", index);
        }
        surface
    }

    /// Recoverable failures stop at the router
    fn absorb(&self, what: &str, result: Result<()>) {
        if let Err(e) = result {
            tracing::warn!("{} failed: {}", what, e);
        }
    }

    fn print(&mut self, text: &str) {
        let result = writeln!(self.console, "{}", text).and_then(|()| self.console.flush());
        if let Err(e) = result {
            tracing::warn!("Failed to write to stdout: {}", e);
        }
    }
}
