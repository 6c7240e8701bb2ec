//! Main process → surface direction

use std::sync::Arc;

use super::{Flow, Router};
use crate::protocol::replies::{
    emit_to_surface, resolve_to_main, resolve_to_surface, NULL_VALUE, STATE_OK,
};
use crate::protocol::{self, encode_value, Command, MainVerb, NumericField};
use crate::surface::{Reply, Surface};

impl Router {
    /// Handle one line the main process printed
    pub fn dispatch_from_main(&mut self, line: &str) -> Flow {
        let command = protocol::decode(line);
        if command.is_empty() {
            tracing::debug!("Ignoring non-command output from main process: {}", line);
            return Flow::Continue;
        }

        match MainVerb::parse(&command) {
            MainVerb::Restart => Flow::Restart,
            MainVerb::Stdout { text } => {
                self.print(&text);
                Flow::Continue
            }
            MainVerb::Unknown(name) => {
                tracing::debug!("Unknown command from main process: {}", name);
                Flow::Continue
            }
            verb => match self.surface(command.index, 0) {
                Some(surface) => self.apply_to_surface(surface, verb, &command),
                None => Flow::Continue,
            },
        }
    }

    fn apply_to_surface(&mut self, surface: Arc<dyn Surface>, verb: MainVerb, command: &Command) -> Flow {
        let seq = command.seq();
        let reply = Reply::to_main(seq);
        match verb {
            MainVerb::Title { title } => self.absorb("title", surface.set_title(reply, &title)),
            MainVerb::Show => self.absorb("show", surface.show(reply)),
            MainVerb::Hide => self.absorb("hide", surface.hide(reply)),
            MainVerb::Navigate { url } => self.absorb("navigate", surface.navigate(reply, &url)),
            MainVerb::Size { width, height } => {
                if width == NumericField::Invalid || height == NumericField::Invalid {
                    tracing::debug!("Ignoring malformed dimension in: {}", command.encode());
                }
                self.absorb("size", surface.set_size(reply, width.ok(), height.ok()));
            }
            MainVerb::GetScreenSize => match serde_json::to_string(&surface.screen_size()) {
                Ok(json) => {
                    let resolved =
                        resolve_to_main(surface.index(), seq, STATE_OK, &encode_value(&json));
                    self.dispatch_from_surface(surface.index(), &resolved);
                }
                Err(e) => tracing::warn!("Failed to serialize screen size: {}", e),
            },
            MainVerb::Menu { spec } => self.absorb("menu", surface.set_system_menu(reply, &spec)),
            MainVerb::External { url } => {
                self.absorb("external", surface.open_external(&url));
                self.acknowledge(surface.index(), seq);
            }
            MainVerb::Exit { code } => {
                if let Some(code) = code.ok() {
                    self.exit_code = code;
                }
                self.absorb("exit", surface.exit(self.exit_code));
                self.acknowledge(surface.index(), seq);
                return Flow::Exit(self.exit_code);
            }
            MainVerb::Resolve { state, value } => {
                self.absorb("resolve", surface.eval(&resolve_to_surface(seq, &state, &value)));
            }
            MainVerb::Send { event, value } => {
                self.absorb("send", surface.eval(&emit_to_surface(&event, &value)));
            }
            MainVerb::Restart | MainVerb::Stdout { .. } | MainVerb::Unknown(_) => {}
        }
        Flow::Continue
    }

    /// Resolve a request the shell completes on the surface's behalf
    fn acknowledge(&mut self, index: usize, seq: &str) {
        if !seq.is_empty() {
            self.dispatch_from_surface(index, &resolve_to_main(index, seq, STATE_OK, NULL_VALUE));
        }
    }
}
