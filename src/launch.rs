//! Command line classification and launch planning
//!
//! The shell's own argv decides between command mode (relay a single command
//! through the main process) and interactive mode. Every argument after the
//! program name is forwarded to the main process, so option parsing here is
//! limited to prefix checks.

use std::path::{Path, PathBuf};

use crate::config::AppConfig;
use crate::main_process::{EnvBlock, Invocation};
use crate::surface::SurfaceOptions;
use crate::utils::{resolve_executable, split_command};
use crate::{Error, Result};

const HELP_FLAGS: [&str; 3] = ["--help", "-help", "-h"];
const VERSION_FLAGS: [&str; 4] = ["--version", "-version", "-v", "-V"];

/// Size of the secondary surface
const SECONDARY_SIZE: (u32, u32) = (350, 120);

/// What the shell's own arguments ask for
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchArgs {
    pub command_mode: bool,
    pub is_test: bool,
    /// Arguments passed on to the main process
    pub forward: Vec<String>,
}

impl LaunchArgs {
    /// Classify `argv`, including the program name at position 0
    pub fn parse<S: AsRef<str>>(argv: &[S]) -> Self {
        let mut args = Self::default();

        for arg in argv.iter().skip(1) {
            let arg: &str = arg.as_ref();
            let verb = if HELP_FLAGS.iter().any(|flag| arg.starts_with(flag)) {
                Some("help")
            } else if VERSION_FLAGS.iter().any(|flag| arg.starts_with(flag)) {
                Some("version")
            } else {
                None
            };

            if let Some(verb) = verb {
                args.command_mode = true;
                args.forward.push(verb.to_string());
                args.forward.push(format!("--warn-arg-usage={}", arg));
                continue;
            }

            if arg.starts_with("--test") {
                args.is_test = true;
            } else if !arg.starts_with('-') {
                args.command_mode = true;
            }
            args.forward.push(arg.to_string());
        }

        args
    }
}

/// Everything needed to start the main process and the surfaces
#[derive(Debug, Clone)]
pub struct LaunchPlan {
    pub config: AppConfig,
    pub args: LaunchArgs,
    pub app_dir: PathBuf,
    pub debug: bool,
    main_program: PathBuf,
    main_args: Vec<String>,
    renderer: Option<PathBuf>,
    env: EnvBlock,
}

impl LaunchPlan {
    pub fn new(mut config: AppConfig, args: LaunchArgs, app_dir: PathBuf, debug: bool) -> Result<Self> {
        if debug {
            config.add_suffix("-dev");
        }
        if args.is_test {
            config.add_suffix("-test");
        }

        let command = config.platform_command().ok_or_else(|| {
            Error::Config(format!(
                "No main process command configured for {}",
                std::env::consts::OS
            ))
        })?;
        let (program, main_args) = split_command(command)
            .ok_or_else(|| Error::Config("Main process command is empty".to_string()))?;
        let main_program = resolve_executable(program, &app_dir)?;

        let renderer = match config.render_cmd.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => Some(resolve_executable(name, &app_dir)?),
            _ => None,
        };

        let env = EnvBlock::capture(&config.env);

        Ok(Self {
            config,
            args,
            app_dir,
            debug,
            main_program,
            main_args,
            renderer,
            env,
        })
    }

    pub fn renderer(&self) -> Option<&Path> {
        self.renderer.as_deref()
    }

    /// Main process arguments shared by both modes
    fn forwarded_args(&self) -> Vec<String> {
        let mut args = self.main_args.clone();
        args.extend(self.args.forward.iter().cloned());
        args.push(format!("--version={}", self.config.version));
        args.push(format!("--name={}", self.config.name));
        if self.debug {
            args.push("--debug=1".to_string());
        }
        args
    }

    fn invocation(&self, args: Vec<String>) -> Invocation {
        Invocation::new(&self.main_program)
            .args(args)
            .current_dir(&self.app_dir)
            .env(self.env.clone())
    }

    /// Main process for command mode, told where the user invoked the shell
    pub fn command_invocation(&self, current_dir: &Path) -> Invocation {
        let mut args = self.forwarded_args();
        args.push(format!("--op-current-directory={}", current_dir.display()));
        self.invocation(args)
    }

    /// Main process for interactive mode
    pub fn main_invocation(&self, webview_failed: bool) -> Invocation {
        let mut args = self.forwarded_args();
        if webview_failed {
            args.push("--webviewFailed".to_string());
        }
        self.invocation(args)
    }

    /// Options for the primary and secondary surface, in index order
    pub fn surface_options(&self) -> Vec<SurfaceOptions> {
        let sizes = [(self.config.width, self.config.height), SECONDARY_SIZE];
        sizes
            .into_iter()
            .enumerate()
            .map(|(index, (width, height))| SurfaceOptions {
                index,
                title: self.config.title.clone(),
                width,
                height,
                resizable: true,
                debug: self.debug,
                is_test: self.args.is_test,
                forward_console: self.config.forward_console,
                cwd: self.app_dir.clone(),
                env: self.env.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AppConfig {
        AppConfig {
            name: "notes".to_string(),
            title: "Notes".to_string(),
            version: "1.2.3".to_string(),
            linux_cmd: Some("/usr/bin/env node main.js".to_string()),
            mac_cmd: Some("/usr/bin/env node main.js".to_string()),
            win_cmd: Some("/usr/bin/env node main.js".to_string()),
            ..AppConfig::default()
        }
    }

    fn plan(argv: &[&str], debug: bool) -> LaunchPlan {
        LaunchPlan::new(config(), LaunchArgs::parse(argv), PathBuf::from("/opt/notes"), debug).unwrap()
    }

    #[test]
    fn test_no_arguments_is_interactive() {
        let args = LaunchArgs::parse(&["notes"]);
        assert!(!args.command_mode);
        assert!(args.forward.is_empty());
    }

    #[test]
    fn test_positional_argument_selects_command_mode() {
        let args = LaunchArgs::parse(&["notes", "--verbose=1", "list", "--all"]);
        assert!(args.command_mode);
        assert_eq!(args.forward, vec!["--verbose=1", "list", "--all"]);
    }

    #[test]
    fn test_flags_alone_stay_interactive() {
        let args = LaunchArgs::parse(&["notes", "--window=2"]);
        assert!(!args.command_mode);
        assert_eq!(args.forward, vec!["--window=2"]);
    }

    #[test]
    fn test_help_and_version_become_commands() {
        let args = LaunchArgs::parse(&["notes", "-h"]);
        assert!(args.command_mode);
        assert_eq!(args.forward, vec!["help", "--warn-arg-usage=-h"]);

        let args = LaunchArgs::parse(&["notes", "--version"]);
        assert!(args.command_mode);
        assert_eq!(args.forward, vec!["version", "--warn-arg-usage=--version"]);
    }

    #[test]
    fn test_test_flag() {
        let args = LaunchArgs::parse(&["notes", "--test=ui"]);
        assert!(args.is_test);
        assert!(!args.command_mode);
        assert_eq!(args.forward, vec!["--test=ui"]);
    }

    #[test]
    fn test_command_invocation_args() {
        let plan = plan(&["notes", "build"], false);
        let invocation = plan.command_invocation(Path::new("/home/me/project"));

        assert_eq!(invocation.program, PathBuf::from("/usr/bin/env"));
        assert_eq!(
            invocation.args,
            vec![
                "node",
                "main.js",
                "build",
                "--version=1.2.3",
                "--name=notes",
                "--op-current-directory=/home/me/project",
            ]
        );
        assert_eq!(invocation.cwd, PathBuf::from("/opt/notes"));
    }

    #[test]
    fn test_debug_and_test_suffixes() {
        let plan = plan(&["notes", "--test"], true);
        assert_eq!(plan.config.name, "notes-dev-test");
        assert_eq!(plan.config.title, "Notes-dev-test");

        let invocation = plan.main_invocation(true);
        assert_eq!(
            invocation.args,
            vec![
                "node",
                "main.js",
                "--test",
                "--version=1.2.3",
                "--name=notes-dev-test",
                "--debug=1",
                "--webviewFailed",
            ]
        );
    }

    #[test]
    fn test_surface_options() {
        let plan = plan(&["notes"], false);
        let options = plan.surface_options();
        assert_eq!(options.len(), 2);
        assert_eq!((options[0].index, options[0].width, options[0].height), (0, 750, 520));
        assert_eq!((options[1].index, options[1].width, options[1].height), (1, 350, 120));
        assert!(options.iter().all(|o| o.title == "Notes"));
        assert!(plan.renderer().is_none());
    }

    #[test]
    fn test_missing_platform_command() {
        let config = AppConfig::default();
        let err = LaunchPlan::new(config, LaunchArgs::default(), PathBuf::from("."), false).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }
}
