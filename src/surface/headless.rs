//! Surface without a renderer
//!
//! Keeps the window state in memory. Used when no renderer executable is
//! configured or the renderer could not be started.

use std::collections::VecDeque;

use parking_lot::Mutex;

use super::{DialogOptions, Outbox, Reply, ScreenSize, Surface, SurfaceOptions, DEFAULT_SCREEN};
use crate::protocol::replies::{NULL_VALUE, STATE_OK};
use crate::Result;

/// Evaluated lines kept for inspection
pub const EVAL_HISTORY: usize = 64;

/// Observable state of a headless surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowState {
    pub title: String,
    pub visible: bool,
    pub url: Option<String>,
    pub width: u32,
    pub height: u32,
    pub system_menu: Option<String>,
    pub context_menu: Option<String>,
    pub inspector_open: bool,
    /// Most recent lines delivered through `eval`, oldest first
    pub evaluated: VecDeque<String>,
    /// Lines delivered through `eval` over the surface's lifetime
    pub eval_count: usize,
    pub exit_code: Option<i32>,
    pub killed: bool,
}

pub struct HeadlessSurface {
    index: usize,
    outbox: Outbox,
    state: Mutex<WindowState>,
}

impl HeadlessSurface {
    pub fn new(options: &SurfaceOptions, outbox: Outbox) -> Self {
        let state = WindowState {
            title: options.title.clone(),
            width: options.width,
            height: options.height,
            ..WindowState::default()
        };

        Self {
            index: options.index,
            outbox,
            state: Mutex::new(state),
        }
    }

    /// Copy of the current window state
    pub fn snapshot(&self) -> WindowState {
        self.state.lock().clone()
    }

    fn update(&self, reply: Reply<'_>, change: impl FnOnce(&mut WindowState)) -> Result<()> {
        change(&mut *self.state.lock());
        self.respond(reply, STATE_OK, NULL_VALUE);
        Ok(())
    }
}

impl Surface for HeadlessSurface {
    fn index(&self) -> usize {
        self.index
    }

    fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    fn set_title(&self, reply: Reply<'_>, title: &str) -> Result<()> {
        self.update(reply, |state| state.title = title.to_string())
    }

    fn show(&self, reply: Reply<'_>) -> Result<()> {
        self.update(reply, |state| state.visible = true)
    }

    fn hide(&self, reply: Reply<'_>) -> Result<()> {
        self.update(reply, |state| state.visible = false)
    }

    fn navigate(&self, reply: Reply<'_>, url: &str) -> Result<()> {
        self.update(reply, |state| state.url = Some(url.to_string()))
    }

    fn set_size(&self, reply: Reply<'_>, width: Option<u32>, height: Option<u32>) -> Result<()> {
        self.update(reply, |state| {
            if let Some(width) = width {
                state.width = width;
            }
            if let Some(height) = height {
                state.height = height;
            }
        })
    }

    fn screen_size(&self) -> ScreenSize {
        DEFAULT_SCREEN
    }

    fn set_system_menu(&self, reply: Reply<'_>, spec: &str) -> Result<()> {
        self.update(reply, |state| state.system_menu = Some(spec.to_string()))
    }

    fn set_context_menu(&self, reply: Reply<'_>, spec: &str) -> Result<()> {
        self.update(reply, |state| state.context_menu = Some(spec.to_string()))
    }

    fn open_dialog(&self, reply: Reply<'_>, options: &DialogOptions) -> Result<()> {
        // Nothing to show: the request resolves as cancelled
        tracing::debug!("Surface {} has no dialog support: {:?}", self.index, options);
        self.respond(reply, STATE_OK, NULL_VALUE);
        Ok(())
    }

    fn show_inspector(&self) -> Result<()> {
        self.state.lock().inspector_open = true;
        Ok(())
    }

    fn eval(&self, script: &str) -> Result<()> {
        tracing::debug!("Surface {} eval: {}", self.index, script);
        let mut state = self.state.lock();
        if state.evaluated.len() == EVAL_HISTORY {
            state.evaluated.pop_front();
        }
        state.evaluated.push_back(script.to_string());
        state.eval_count += 1;
        Ok(())
    }

    fn exit(&self, code: i32) -> Result<()> {
        self.state.lock().exit_code = Some(code);
        Ok(())
    }

    fn kill(&self) {
        let mut state = self.state.lock();
        if !state.killed {
            tracing::debug!("Surface {} closed", self.index);
            state.killed = true;
            state.visible = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tokio::sync::mpsc;

    use crate::main_process::EnvBlock;

    fn options() -> SurfaceOptions {
        SurfaceOptions {
            index: 0,
            title: "App".to_string(),
            width: 750,
            height: 520,
            resizable: true,
            debug: false,
            is_test: false,
            forward_console: false,
            cwd: PathBuf::from("."),
            env: EnvBlock::default(),
        }
    }

    #[test]
    fn test_set_size_keeps_missing_dimension() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let surface = HeadlessSurface::new(&options(), Outbox::new(0, tx));

        surface.set_size(Reply::None, None, Some(300)).unwrap();

        let state = surface.snapshot();
        assert_eq!(state.width, 750);
        assert_eq!(state.height, 300);
    }

    #[test]
    fn test_operations_resolve_after_state_change() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let surface = HeadlessSurface::new(&options(), Outbox::new(0, tx));

        surface.set_title(Reply::to_main("3"), "Renamed").unwrap();
        surface.show(Reply::None).unwrap();

        assert_eq!(surface.snapshot().title, "Renamed");
        assert!(surface.snapshot().visible);
        assert_eq!(rx.try_recv().unwrap().line, "resolve 0 seq=3 state=0&value=null");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_eval_history_is_bounded() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let surface = HeadlessSurface::new(&options(), Outbox::new(0, tx));

        for i in 0..10_000 {
            surface.eval(&format!("emit event=tick&value={}", i)).unwrap();
        }

        let state = surface.snapshot();
        assert_eq!(state.evaluated.len(), EVAL_HISTORY);
        assert_eq!(state.eval_count, 10_000);
        assert_eq!(state.evaluated.back().map(String::as_str), Some("emit event=tick&value=9999"));
        assert_eq!(
            state.evaluated.front().map(String::as_str),
            Some("emit event=tick&value=9936")
        );
    }

    #[test]
    fn test_kill_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let surface = HeadlessSurface::new(&options(), Outbox::new(0, tx));

        surface.show(Reply::None).unwrap();
        surface.kill();
        surface.kill();

        let state = surface.snapshot();
        assert!(state.killed);
        assert!(!state.visible);
    }
}
