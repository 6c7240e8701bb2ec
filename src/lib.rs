//! Operator Shell - a line-protocol command bus between a main logic process
//! and its render surfaces
//!
//! The shell spawns the main process, creates two surfaces and routes
//! newline-delimited commands between them over stdio. Invoked with a command
//! on its command line it runs the main process without surfaces and relays its
//! output instead.

pub mod command_mode;
pub mod config;
pub mod launch;
pub mod main_process;
pub mod protocol;
pub mod router;
pub mod shutdown;
pub mod surface;

mod error;
mod state;
mod utils;

pub use error::{Error, Result};
pub use state::{AppState, Outcome};

use launch::{LaunchArgs, LaunchPlan};
use shutdown::ShutdownCoordinator;

/// Install the tracing subscriber; logs go to stderr so stdout stays clean
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("operator_shell=info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the shell for the given argv and return its exit code
pub async fn run(argv: Vec<String>) -> Result<i32> {
    let args = LaunchArgs::parse(&argv);
    let app_dir = utils::app_dir();
    let config = config::read_config(&app_dir)?;
    let plan = LaunchPlan::new(config, args, app_dir, cfg!(debug_assertions))?;

    tracing::info!("Starting {} {}", plan.config.name, plan.config.version);

    let coordinator = ShutdownCoordinator::global();
    shutdown::listen_for_signals(coordinator)?;

    if plan.args.command_mode {
        let current_dir = std::env::current_dir()?;
        let invocation = plan.command_invocation(&current_dir);
        return command_mode::run(
            &invocation,
            coordinator,
            &mut std::io::stdout(),
            &mut std::io::stderr(),
        )
        .await;
    }

    run_interactive(&plan, coordinator).await
}

/// Run interactive sessions until one exits, restarting as asked
pub async fn run_interactive(plan: &LaunchPlan, coordinator: &ShutdownCoordinator) -> Result<i32> {
    loop {
        let state = AppState::start(plan, coordinator)?;
        match state.run(coordinator).await {
            Outcome::Exit(code) => return Ok(code),
            Outcome::Restart => tracing::info!("Restarting {}", plan.config.name),
        }
    }
}
