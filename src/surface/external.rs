//! Opening URLs with the platform's default handler

use std::process::{Command, Stdio};

use crate::{Error, Result};

/// Launch the platform opener for `url` without waiting for it
pub fn open(url: &str) -> Result<()> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::Surface("Refusing to open an empty URL".to_string()));
    }

    // Security: a leading dash would be read as an option by the opener
    if url.starts_with('-') {
        return Err(Error::Surface(format!("Refusing to open suspicious URL: {}", url)));
    }

    let (program, mut command) = opener(url);
    command
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| Error::Spawn {
            program: program.to_string(),
            source,
        })?;

    tracing::debug!("Opened {} with {}", url, program);
    Ok(())
}

fn opener(url: &str) -> (&'static str, Command) {
    if cfg!(target_os = "macos") {
        let mut command = Command::new("open");
        command.arg(url);
        ("open", command)
    } else if cfg!(windows) {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", url]);
        ("cmd", command)
    } else {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        ("xdg-open", command)
    }
}
