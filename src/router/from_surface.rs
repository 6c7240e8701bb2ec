//! Surface → main process direction

use std::sync::Arc;

use super::{Flow, Router};
use crate::protocol::{self, Command, SurfaceVerb};
use crate::surface::{Reply, Surface};

impl Router {
    /// Handle one line surface `origin` produced
    ///
    /// Only shell-privileged verbs stop here; every other line, including
    /// ones that don't parse, is written to the main process as-is. An
    /// intercepted verb without an index applies to `origin`.
    pub fn dispatch_from_surface(&mut self, origin: usize, line: &str) -> Flow {
        let command = protocol::decode(line);
        match SurfaceVerb::parse(&command) {
            SurfaceVerb::Forward => {
                self.forward(line);
                Flow::Continue
            }
            verb => match self.surface(command.index, origin) {
                Some(surface) => self.apply_locally(surface, verb, &command),
                None => Flow::Continue,
            },
        }
    }

    fn apply_locally(&mut self, surface: Arc<dyn Surface>, verb: SurfaceVerb, command: &Command) -> Flow {
        // Requests a surface makes are resolved back on that surface
        let reply = Reply::to_surface(command.seq());
        match verb {
            SurfaceVerb::Title { title } => self.absorb("title", surface.set_title(reply, &title)),
            SurfaceVerb::Exit { code } => {
                if let Some(code) = code.ok() {
                    self.exit_code = code;
                }
                self.absorb("exit", surface.exit(self.exit_code));
                return Flow::Exit(self.exit_code);
            }
            SurfaceVerb::Hide => self.absorb("hide", surface.hide(Reply::None)),
            SurfaceVerb::Inspect => self.absorb("inspect", surface.show_inspector()),
            SurfaceVerb::External { url } => self.absorb("external", surface.open_external(&url)),
            SurfaceVerb::Dialog(options) => self.absorb("dialog", surface.open_dialog(reply, &options)),
            SurfaceVerb::Context { spec } => {
                self.absorb("context", surface.set_context_menu(reply, &spec))
            }
            SurfaceVerb::Forward => {}
        }
        Flow::Continue
    }

    fn forward(&self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        if let Err(e) = self.main.write_line(line) {
            tracing::warn!("Dropping message for main process: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::Harness;
    use super::*;

    #[test]
    fn test_unintercepted_lines_forward_verbatim() {
        let mut h = Harness::new();
        let lines = [
            "ping 1 seq=3 value=%7B%22a%22%3A1%7D",
            "show 0",
            "resolve 0 seq=9 state=0&value=null",
            "not a command at all",
        ];
        for line in lines {
            assert_eq!(h.router.dispatch_from_surface(1, line), Flow::Continue);
        }
        assert_eq!(h.written(), lines);
        assert!(!h.state(0).visible);
    }

    #[test]
    fn test_title_is_intercepted() {
        let mut h = Harness::new();
        h.router.dispatch_from_surface(1, "title 1 seq=3 value=From%20Renderer");
        h.pump();

        assert_eq!(h.state(1).title, "From Renderer");
        assert_eq!(h.state(1).evaluated, vec!["resolve seq=3 state=0&value=null"]);
        assert!(h.written().is_empty());
    }

    #[test]
    fn test_missing_index_targets_originating_surface() {
        let mut h = Harness::new();
        h.router.dispatch_from_surface(1, "title value=Second");

        assert_eq!(h.state(1).title, "Second");
        assert_eq!(h.state(0).title, "App");
    }

    #[test]
    fn test_hide_and_inspect_are_intercepted() {
        let mut h = Harness::new();
        h.router.dispatch_from_main("show 0");
        h.router.dispatch_from_surface(0, "hide 0 seq=6");
        h.router.dispatch_from_surface(0, "inspect");
        h.pump();

        let state = h.state(0);
        assert!(!state.visible);
        assert!(state.inspector_open);
        assert!(h.written().is_empty());
    }

    #[test]
    fn test_context_menu_resolves_seq() {
        let mut h = Harness::new();
        h.router.dispatch_from_surface(1, "context 1 seq=2 value=Copy%3A%20c");
        h.pump();

        assert_eq!(h.state(1).context_menu.as_deref(), Some("Copy: c"));
        assert_eq!(h.state(1).evaluated, vec!["resolve seq=2 state=0&value=null"]);
        assert!(h.state(0).evaluated.is_empty());
        assert!(h.written().is_empty());
    }

    #[test]
    fn test_headless_dialog_resolves_null() {
        let mut h = Harness::new();
        h.router
            .dispatch_from_surface(0, "dialog 0 seq=7 type=open&allowFiles=true&title=Pick");
        h.pump();

        assert_eq!(h.state(0).evaluated, vec!["resolve seq=7 state=0&value=null"]);
        assert!(h.written().is_empty());
    }

    #[test]
    fn test_exit_from_surface() {
        let mut h = Harness::new();
        assert_eq!(h.router.dispatch_from_surface(1, "exit 1 value=2"), Flow::Exit(2));
        assert_eq!(h.state(1).exit_code, Some(2));
        assert!(h.written().is_empty());
    }

    #[test]
    fn test_out_of_range_intercept_is_dropped() {
        let mut h = Harness::new();
        h.router.dispatch_from_surface(0, "title 5 value=Lost");
        assert_eq!(h.state(0).title, "App");
        assert_eq!(h.state(1).title, "App");
        assert!(h.written().is_empty());
    }
}
