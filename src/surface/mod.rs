//! Render surfaces
//!
//! A surface is the addressable target for UI-affecting commands. The router
//! never reaches into a surface directly: it calls the operations below, and
//! resolutions or notifications reach the surface only as serialized command
//! lines through [`Surface::eval`].
//!
//! Surfaces report outbound messages through their [`Outbox`], which feeds the
//! primary loop. All surface methods are called from that loop only.

pub mod external;
mod headless;
mod render_process;

pub use headless::{HeadlessSurface, WindowState};
pub use render_process::RenderProcessSurface;

use std::path::PathBuf;

use serde::Serialize;
use tokio::sync::mpsc;

use crate::main_process::{EnvBlock, ProcessBridge};
use crate::protocol::replies::{
    resolve_to_main, resolve_to_surface, NULL_VALUE, STATE_FAILED, STATE_OK,
};
pub use crate::protocol::DialogOptions;
use crate::protocol::{encode_value, Command};
use crate::Result;

/// Screen dimensions as reported to the main process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScreenSize {
    pub width: u32,
    pub height: u32,
}

/// Screen assumed until a renderer reports its own
pub const DEFAULT_SCREEN: ScreenSize = ScreenSize {
    width: 1920,
    height: 1080,
};

/// Static settings a surface is created with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceOptions {
    pub index: usize,
    pub title: String,
    pub width: u32,
    pub height: u32,
    pub resizable: bool,
    pub debug: bool,
    pub is_test: bool,
    pub forward_console: bool,
    pub cwd: PathBuf,
    pub env: EnvBlock,
}

impl SurfaceOptions {
    /// Arguments handed to a renderer process for this surface
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--index={}", self.index),
            format!("--title={}", encode_value(&self.title)),
            format!("--width={}", self.width),
            format!("--height={}", self.height),
        ];

        if !self.resizable {
            args.push("--resizable=false".to_string());
        }
        if !self.env.is_empty() {
            args.push(format!("--env={}", self.env.encode()));
        }
        if self.debug {
            args.push("--debug=1".to_string());
        }
        if self.is_test {
            args.push("--test".to_string());
        }

        args
    }
}

/// Line a surface produced, tagged with the surface it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceMessage {
    pub origin: usize,
    pub line: String,
}

/// Message channel from a surface into the primary loop
#[derive(Debug, Clone)]
pub struct Outbox {
    index: usize,
    tx: mpsc::UnboundedSender<SurfaceMessage>,
}

impl Outbox {
    pub fn new(index: usize, tx: mpsc::UnboundedSender<SurfaceMessage>) -> Self {
        Self { index, tx }
    }

    /// Report a raw protocol line as if the surface had produced it
    pub fn send(&self, line: impl Into<String>) {
        let message = SurfaceMessage {
            origin: self.index,
            line: line.into(),
        };
        if self.tx.send(message).is_err() {
            tracing::debug!("Surface {} outbox closed, dropping message", self.index);
        }
    }
}

/// Who is waiting for the outcome of an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply<'a> {
    /// Fire-and-forget
    None,
    /// The main process asked, with this seq
    Main(&'a str),
    /// The surface itself asked, with this seq
    Surface(&'a str),
}

impl<'a> Reply<'a> {
    pub fn to_main(seq: &'a str) -> Self {
        if seq.is_empty() {
            Self::None
        } else {
            Self::Main(seq)
        }
    }

    pub fn to_surface(seq: &'a str) -> Self {
        if seq.is_empty() {
            Self::None
        } else {
            Self::Surface(seq)
        }
    }

    pub fn seq(&self) -> &'a str {
        match self {
            Self::None => "",
            Self::Main(seq) | Self::Surface(seq) => seq,
        }
    }
}

/// One render surface
///
/// Operations taking a [`Reply`] resolve it exactly once, after the side
/// effect, unless it is `Reply::None`.
pub trait Surface: Send + Sync {
    fn index(&self) -> usize;

    fn outbox(&self) -> &Outbox;

    fn set_title(&self, reply: Reply<'_>, title: &str) -> Result<()>;

    fn show(&self, reply: Reply<'_>) -> Result<()>;

    fn hide(&self, reply: Reply<'_>) -> Result<()>;

    fn navigate(&self, reply: Reply<'_>, url: &str) -> Result<()>;

    /// Resize; a `None` dimension keeps its current value
    fn set_size(&self, reply: Reply<'_>, width: Option<u32>, height: Option<u32>) -> Result<()>;

    fn screen_size(&self) -> ScreenSize;

    fn set_system_menu(&self, reply: Reply<'_>, spec: &str) -> Result<()>;

    fn set_context_menu(&self, reply: Reply<'_>, spec: &str) -> Result<()>;

    /// Open a URL with the platform's default handler
    fn open_external(&self, url: &str) -> Result<()> {
        external::open(url)
    }

    /// Show a file dialog; the selection resolves `reply` once the user is done
    fn open_dialog(&self, reply: Reply<'_>, options: &DialogOptions) -> Result<()>;

    fn show_inspector(&self) -> Result<()>;

    /// Deliver a serialized command line to the surface
    fn eval(&self, script: &str) -> Result<()>;

    fn exit(&self, code: i32) -> Result<()>;

    /// Tear the surface down; idempotent
    fn kill(&self);

    /// Child process backing the surface, if any
    fn process(&self) -> Option<&ProcessBridge> {
        None
    }

    /// Send a resolution to whoever made the request
    fn respond(&self, reply: Reply<'_>, state: &str, value: &str) {
        match reply {
            Reply::None => {}
            Reply::Main(seq) => self
                .outbox()
                .send(resolve_to_main(self.index(), seq, state, value)),
            Reply::Surface(seq) => {
                if let Err(e) = self.eval(&resolve_to_surface(seq, state, value)) {
                    tracing::warn!("Failed to resolve request {} on surface {}: {}", seq, self.index(), e);
                }
            }
        }
    }

    /// Resolve according to the outcome of an operation
    fn settle(&self, reply: Reply<'_>, result: &Result<()>) {
        match result {
            Ok(()) => self.respond(reply, STATE_OK, NULL_VALUE),
            Err(e) => {
                let message = serde_json::Value::String(e.to_string()).to_string();
                self.respond(reply, STATE_FAILED, &encode_value(&message));
            }
        }
    }
}

/// Build the line a renderer receives for an operation on surface `index`
pub(crate) fn operation(name: &str, index: usize) -> Command {
    Command::new(name).with_index(index)
}
