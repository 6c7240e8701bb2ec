//! Utility functions for locating the application and its executables

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Directory the shell binary lives in; falls back to the working directory
pub fn app_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Resolve a configured executable name to a path
///
/// A leading `.` means relative to the application directory, absolute paths
/// are kept, anything else is looked up in PATH.
pub fn resolve_executable(name: &str, app_dir: &Path) -> Result<PathBuf> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::Config("Executable name is empty".to_string()));
    }

    if name.starts_with('.') {
        return Ok(app_dir.join(name));
    }

    let path = Path::new(name);
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    which::which(name).map_err(|e| Error::Config(format!("Cannot find {} in PATH: {}", name, e)))
}

/// Split a configured command into its program and leading arguments
pub fn split_command(command: &str) -> Option<(&str, Vec<String>)> {
    let mut parts = command.split_whitespace();
    let program = parts.next()?;
    Some((program, parts.map(str::to_string).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_executable_resolves_against_app_dir() {
        let app_dir = Path::new("/opt/notes");
        let path = resolve_executable("./bin/main", app_dir).unwrap();
        assert_eq!(path, PathBuf::from("/opt/notes/./bin/main"));
    }

    #[test]
    fn test_absolute_executable_is_kept() {
        let path = resolve_executable("/usr/bin/env", Path::new("/opt")).unwrap();
        assert_eq!(path, PathBuf::from("/usr/bin/env"));
    }

    #[test]
    fn test_unknown_executable_is_a_config_error() {
        let err = resolve_executable("definitely-not-installed-9f3a", Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("  node  main.js --inspect ").unwrap();
        assert_eq!(program, "node");
        assert_eq!(args, vec!["main.js", "--inspect"]);
        assert!(split_command("   ").is_none());
    }

    #[test]
    fn test_app_dir_exists() {
        assert!(app_dir().exists());
    }
}
