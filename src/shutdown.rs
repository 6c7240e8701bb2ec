//! Process-wide shutdown coordination
//!
//! Signal listeners only record a request; the primary loop picks it up and
//! runs the installed procedure exactly once. The procedure is replaced as the
//! shell moves from startup into the command-mode or interactive path.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::main_process::ProcessHandle;
use crate::surface::Surface;
use crate::Result;

/// Teardown run with the exit status
pub type Procedure = Arc<dyn Fn(i32) + Send + Sync>;

static GLOBAL: LazyLock<ShutdownCoordinator> = LazyLock::new(ShutdownCoordinator::new);

pub struct ShutdownCoordinator {
    procedure: Mutex<Procedure>,
    requested: Mutex<Option<i32>>,
    notify: Notify,
    fired: AtomicBool,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            procedure: Mutex::new(Arc::new(|_: i32| {})),
            requested: Mutex::new(None),
            notify: Notify::new(),
            fired: AtomicBool::new(false),
        }
    }

    /// The coordinator signal listeners report to
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Replace the procedure run on shutdown
    pub fn set(&self, procedure: impl Fn(i32) + Send + Sync + 'static) {
        *self.procedure.lock() = Arc::new(procedure);
    }

    /// Ask the primary loop to shut down; the first status wins
    pub fn request(&self, status: i32) {
        {
            let mut requested = self.requested.lock();
            if requested.is_some() {
                return;
            }
            *requested = Some(status);
        }
        self.notify.notify_waiters();
    }

    /// Wait until shutdown has been requested and return the status
    pub async fn requested(&self) -> i32 {
        loop {
            let notified = self.notify.notified();
            let requested = *self.requested.lock();
            if let Some(status) = requested {
                return status;
            }
            notified.await;
        }
    }

    /// Run the procedure; returns false if it already ran
    pub fn invoke(&self, status: i32) -> bool {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!("Shutdown already in progress, ignoring status {}", status);
            return false;
        }

        tracing::info!("Shutting down with status {}", status);
        let procedure = self.procedure.lock().clone();
        procedure(status);
        true
    }

    pub fn is_shutting_down(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Procedure for command mode: only the main process needs stopping
pub fn command_procedure(process: Arc<dyn ProcessHandle>) -> impl Fn(i32) + Send + Sync + 'static {
    move |_status| process.terminate()
}

/// Procedure for interactive mode
///
/// The main process goes first so it cannot observe half-torn-down surfaces.
/// The primary loop stops once the procedure returns.
pub fn interactive_procedure(
    process: Arc<dyn ProcessHandle>,
    surfaces: Vec<Arc<dyn Surface>>,
) -> impl Fn(i32) + Send + Sync + 'static {
    move |_status| {
        process.terminate();
        for surface in &surfaces {
            surface.kill();
        }
    }
}

/// Turn SIGINT and SIGHUP into shutdown requests carrying the signal number
#[cfg(unix)]
pub fn listen_for_signals(coordinator: &'static ShutdownCoordinator) -> Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;

    tokio::spawn(async move {
        loop {
            let status = tokio::select! {
                Some(()) = interrupt.recv() => libc::SIGINT,
                Some(()) = hangup.recv() => libc::SIGHUP,
                else => break,
            };
            tracing::info!("Received signal {}", status);
            coordinator.request(status);
        }
    });

    Ok(())
}

/// Turn Ctrl+C into a shutdown request
#[cfg(not(unix))]
pub fn listen_for_signals(coordinator: &'static ShutdownCoordinator) -> Result<()> {
    const SIGINT: i32 = 2;

    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C");
            coordinator.request(SIGINT);
        }
    });

    Ok(())
}
