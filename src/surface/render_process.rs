//! Surface backed by a renderer process
//!
//! Every operation is serialized as a protocol line and written to the
//! renderer's stdin. Lines the renderer prints are surface messages: they are
//! handed to the outbox and routed by the primary loop like any other.

use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{
    operation, DialogOptions, Outbox, Reply, ScreenSize, Surface, SurfaceOptions, DEFAULT_SCREEN,
};
use crate::main_process::{Invocation, ProcessBridge, ProcessOutput};
use crate::protocol::{self, encode_value, Command, NumericField};
use crate::Result;

pub struct RenderProcessSurface {
    index: usize,
    bridge: ProcessBridge,
    outbox: Outbox,
    screen: Arc<Mutex<ScreenSize>>,
}

impl RenderProcessSurface {
    /// Start a renderer for the surface described by `options`
    pub fn spawn(program: &Path, options: &SurfaceOptions, outbox: Outbox) -> Result<Self> {
        let invocation = Invocation::new(program)
            .args(options.launch_args())
            .current_dir(&options.cwd)
            .env(options.env.clone());

        let (bridge, output) = ProcessBridge::spawn(&invocation)?;
        let ProcessOutput {
            mut stdout,
            mut stderr,
        } = output;
        let screen = Arc::new(Mutex::new(DEFAULT_SCREEN));

        let forward_outbox = outbox.clone();
        let forward_screen = screen.clone();
        tokio::spawn(async move {
            while let Some(line) = stdout.recv().await {
                if !record_screen(&line, &forward_screen) {
                    forward_outbox.send(line);
                }
            }
        });

        let index = options.index;
        let forward_console = options.forward_console;
        tokio::spawn(async move {
            while let Some(line) = stderr.recv().await {
                if forward_console {
                    eprintln!("{}", line);
                } else {
                    tracing::debug!("Renderer {} stderr: {}", index, line);
                }
            }
        });

        tracing::info!("Renderer for surface {} started (pid {})", index, bridge.pid());

        Ok(Self {
            index,
            bridge,
            outbox,
            screen,
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.bridge.write(&command.encode())
    }

    /// Send an operation and resolve `reply` with its outcome
    fn apply(&self, reply: Reply<'_>, command: Command) -> Result<()> {
        let result = self.send(command);
        self.settle(reply, &result);
        result
    }
}

/// Renderers report their screen as `screen width=<w>&height=<h>`
fn record_screen(line: &str, screen: &Mutex<ScreenSize>) -> bool {
    let command = protocol::decode(line);
    if command.name != "screen" {
        return false;
    }

    let mut screen = screen.lock();
    if let Some(width) = NumericField::<u32>::read(&command, "width").ok() {
        screen.width = width;
    }
    if let Some(height) = NumericField::<u32>::read(&command, "height").ok() {
        screen.height = height;
    }
    true
}

impl Surface for RenderProcessSurface {
    fn index(&self) -> usize {
        self.index
    }

    fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    fn set_title(&self, reply: Reply<'_>, title: &str) -> Result<()> {
        self.apply(reply, operation("title", self.index).with_value("value", title))
    }

    fn show(&self, reply: Reply<'_>) -> Result<()> {
        self.apply(reply, operation("show", self.index))
    }

    fn hide(&self, reply: Reply<'_>) -> Result<()> {
        self.apply(reply, operation("hide", self.index))
    }

    fn navigate(&self, reply: Reply<'_>, url: &str) -> Result<()> {
        self.apply(reply, operation("navigate", self.index).with_value("value", url))
    }

    fn set_size(&self, reply: Reply<'_>, width: Option<u32>, height: Option<u32>) -> Result<()> {
        let mut command = operation("size", self.index);
        if let Some(width) = width {
            command = command.with_field("width", width.to_string());
        }
        if let Some(height) = height {
            command = command.with_field("height", height.to_string());
        }
        self.apply(reply, command)
    }

    fn screen_size(&self) -> ScreenSize {
        *self.screen.lock()
    }

    fn set_system_menu(&self, reply: Reply<'_>, spec: &str) -> Result<()> {
        self.apply(reply, operation("menu", self.index).with_value("value", spec))
    }

    fn set_context_menu(&self, reply: Reply<'_>, spec: &str) -> Result<()> {
        self.apply(reply, operation("context", self.index).with_value("value", spec))
    }

    fn open_dialog(&self, reply: Reply<'_>, options: &DialogOptions) -> Result<()> {
        // The renderer owns the dialog and resolves the seq with the selection
        let command = operation("dialog", self.index)
            .with_seq(reply.seq())
            .with_field("type", if options.is_save { "save" } else { "open" })
            .with_field("allowDirs", options.allow_dirs.to_string())
            .with_field("allowFiles", options.allow_files.to_string())
            .with_field("allowMultiple", options.allow_multiple.to_string())
            .with_field("defaultPath", encode_value(&options.default_path))
            .with_field("title", encode_value(&options.title))
            .with_field("defaultName", encode_value(&options.default_name));

        let result = self.send(command);
        if result.is_err() {
            self.settle(reply, &result);
        }
        result
    }

    fn show_inspector(&self) -> Result<()> {
        self.send(operation("inspect", self.index))
    }

    fn eval(&self, script: &str) -> Result<()> {
        self.bridge.write(script)
    }

    fn exit(&self, code: i32) -> Result<()> {
        self.send(operation("exit", self.index).with_field("value", code.to_string()))
    }

    fn kill(&self) {
        self.bridge.kill();
    }

    fn process(&self) -> Option<&ProcessBridge> {
        Some(&self.bridge)
    }
}
