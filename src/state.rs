//! Interactive session state
//!
//! One `AppState` owns the main process, both surfaces and the router for a
//! single run of the interactive shell. A `restart` command tears it down and
//! the caller builds a fresh one from the same launch plan.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::launch::LaunchPlan;
use crate::main_process::{ProcessBridge, ProcessHandle, ProcessOutput};
use crate::router::{Flow, Router};
use crate::shutdown::{interactive_procedure, ShutdownCoordinator};
use crate::surface::{
    HeadlessSurface, Outbox, RenderProcessSurface, Surface, SurfaceMessage, SurfaceOptions,
};
use crate::Result;

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Exit(i32),
    Restart,
}

pub struct AppState {
    /// Main logic process
    pub main_process: Arc<ProcessBridge>,

    /// Surfaces in index order
    pub surfaces: Vec<Arc<dyn Surface>>,

    router: Router,
    main_stdout: mpsc::Receiver<String>,
    surface_rx: mpsc::UnboundedReceiver<SurfaceMessage>,
}

impl AppState {
    /// Create the surfaces, spawn the main process and install the
    /// interactive shutdown procedure
    pub fn start(plan: &LaunchPlan, coordinator: &ShutdownCoordinator) -> Result<Self> {
        let (surface_tx, surface_rx) = mpsc::unbounded_channel();

        let mut webview_failed = false;
        let surfaces: Vec<Arc<dyn Surface>> = plan
            .surface_options()
            .iter()
            .map(|options| {
                let outbox = Outbox::new(options.index, surface_tx.clone());
                let (surface, failed) = create_surface(plan, options, outbox);
                webview_failed |= failed && options.index == 0;
                surface
            })
            .collect();

        let (bridge, output) = match ProcessBridge::spawn(&plan.main_invocation(webview_failed)) {
            Ok(spawned) => spawned,
            Err(e) => {
                for surface in &surfaces {
                    surface.kill();
                }
                return Err(e);
            }
        };
        let main_process = Arc::new(bridge);
        let ProcessOutput {
            stdout: main_stdout,
            mut stderr,
        } = output;

        tokio::spawn(async move {
            while let Some(line) = stderr.recv().await {
                eprintln!("{}", line);
            }
        });

        let handle: Arc<dyn ProcessHandle> = main_process.clone();
        coordinator.set(interactive_procedure(handle.clone(), surfaces.clone()));

        let router = Router::new(surfaces.clone(), handle);

        tracing::info!(
            "{} started with {} surfaces (main pid {})",
            plan.config.name,
            surfaces.len(),
            main_process.pid()
        );

        Ok(Self {
            main_process,
            surfaces,
            router,
            main_stdout,
            surface_rx,
        })
    }

    /// Route messages until the session exits or restarts
    pub async fn run(mut self, coordinator: &ShutdownCoordinator) -> Outcome {
        let mut main_open = true;

        loop {
            let flow = tokio::select! {
                status = coordinator.requested() => Flow::Exit(status),
                line = self.main_stdout.recv(), if main_open => match line {
                    Some(line) => self.router.dispatch_from_main(&line),
                    None => {
                        match self.main_process.try_exit() {
                            Some(report) => tracing::warn!("Main process exited with code {}", report.exit_code()),
                            None => tracing::warn!("Main process closed its stdout"),
                        }
                        main_open = false;
                        Flow::Continue
                    }
                },
                Some(message) = self.surface_rx.recv() => {
                    self.router.dispatch_from_surface(message.origin, &message.line)
                }
            };

            match flow {
                Flow::Continue => {}
                Flow::Restart => {
                    self.teardown();
                    wait_for_exit(&self.main_process, &self.surfaces).await;
                    return Outcome::Restart;
                }
                Flow::Exit(code) => {
                    coordinator.invoke(code);
                    wait_for_exit(&self.main_process, &self.surfaces).await;
                    return Outcome::Exit(code);
                }
            }
        }
    }

    /// Stop the main process and close every surface; idempotent
    pub fn teardown(&self) {
        self.main_process.kill();
        for surface in &self.surfaces {
            surface.kill();
        }
        tracing::info!("Session torn down");
    }
}

/// Give the main process and the renderers their grace period to finish
/// after being terminated
async fn wait_for_exit(main_process: &ProcessBridge, surfaces: &[Arc<dyn Surface>]) {
    let processes = std::iter::once(main_process)
        .chain(surfaces.iter().filter_map(|surface| surface.process()));

    for process in processes {
        if process.wait_with_grace().await.is_none() {
            tracing::warn!(
                "{} (pid {}) still running after shutdown",
                process.program(),
                process.pid()
            );
        }
    }
}

/// Renderer-backed surface when possible, headless otherwise
///
/// The flag reports whether a configured renderer failed to start.
fn create_surface(plan: &LaunchPlan, options: &SurfaceOptions, outbox: Outbox) -> (Arc<dyn Surface>, bool) {
    if let Some(renderer) = plan.renderer() {
        match RenderProcessSurface::spawn(renderer, options, outbox.clone()) {
            Ok(surface) => return (Arc::new(surface), false),
            Err(e) => {
                tracing::error!(
                    "Renderer for surface {} failed to start, running headless: {}",
                    options.index,
                    e
                );
                return (Arc::new(HeadlessSurface::new(options, outbox)), true);
            }
        }
    }

    (Arc::new(HeadlessSurface::new(options, outbox)), false)
}
