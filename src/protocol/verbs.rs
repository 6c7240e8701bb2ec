//! Typed verbs for both routing directions
//!
//! Main process → surface and surface → main process carry different verb sets,
//! so each direction gets its own closed enum. Anything a direction does not
//! know is still representable (`Unknown` / `Forward`).

use std::str::FromStr;

use super::Command;

/// Result of reading a numeric field
///
/// Missing and malformed values are kept apart; each verb documents which of
/// them it ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField<T> {
    Missing,
    Invalid,
    Value(T),
}

impl<T> NumericField<T> {
    pub fn read(command: &Command, key: &str) -> Self
    where
        T: FromStr,
    {
        match command.get(key) {
            None => Self::Missing,
            Some(_) => match command.decoded(key).trim().parse() {
                Ok(value) => Self::Value(value),
                Err(_) => Self::Invalid,
            },
        }
    }

    /// The parsed value; both missing and malformed input map to `None`
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Value(value) => Some(value),
            Self::Missing | Self::Invalid => None,
        }
    }
}

/// File dialog request coming from a surface
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DialogOptions {
    pub is_save: bool,
    pub allow_dirs: bool,
    pub allow_files: bool,
    pub allow_multiple: bool,
    pub default_path: String,
    pub title: String,
    pub default_name: String,
}

impl DialogOptions {
    fn from_command(command: &Command) -> Self {
        let flag = |key: &str| command.get(key) == Some("true");
        Self {
            is_save: command.get("type") == Some("save"),
            allow_dirs: flag("allowDirs"),
            allow_files: flag("allowFiles"),
            allow_multiple: flag("allowMultiple"),
            default_path: command.decoded("defaultPath"),
            title: command.decoded("title"),
            default_name: command.decoded("defaultName"),
        }
    }
}

/// Commands the main process sends towards a surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MainVerb {
    Title { title: String },
    /// Restart the whole orchestrator
    Restart,
    Show,
    Hide,
    Navigate { url: String },
    /// Each dimension is applied only when it parsed
    Size {
        width: NumericField<u32>,
        height: NumericField<u32>,
    },
    GetScreenSize,
    Menu { spec: String },
    External { url: String },
    /// A missing or malformed code leaves the current exit code untouched
    Exit { code: NumericField<i32> },
    /// Complete a pending surface request; `value` stays encoded
    Resolve { state: String, value: String },
    /// Emit a named event to a surface; `value` stays encoded
    Send { event: String, value: String },
    /// Print to the shell's own stdout
    Stdout { text: String },
    Unknown(String),
}

impl MainVerb {
    pub fn parse(command: &Command) -> Self {
        match command.name.as_str() {
            "title" => Self::Title {
                title: command.decoded("value"),
            },
            "restart" => Self::Restart,
            "show" => Self::Show,
            "hide" => Self::Hide,
            "navigate" => Self::Navigate {
                url: command.decoded("value"),
            },
            "size" => Self::Size {
                width: NumericField::read(command, "width"),
                height: NumericField::read(command, "height"),
            },
            "getScreenSize" => Self::GetScreenSize,
            "menu" => Self::Menu {
                spec: command.decoded("value"),
            },
            "external" => Self::External {
                url: command.decoded("value"),
            },
            "exit" => Self::Exit {
                code: NumericField::read(command, "value"),
            },
            "resolve" => Self::Resolve {
                state: command.get("state").unwrap_or_default().to_string(),
                value: command.get("value").unwrap_or_default().to_string(),
            },
            "send" => Self::Send {
                event: command.decoded("event"),
                value: command.get("value").unwrap_or_default().to_string(),
            },
            "stdout" => Self::Stdout {
                text: command.decoded("value"),
            },
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Commands a surface sends towards the main process
///
/// Only shell-privileged verbs are intercepted; everything else is `Forward`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceVerb {
    Title { title: String },
    Exit { code: NumericField<i32> },
    Hide,
    Inspect,
    External { url: String },
    Dialog(DialogOptions),
    Context { spec: String },
    Forward,
}

impl SurfaceVerb {
    pub fn parse(command: &Command) -> Self {
        match command.name.as_str() {
            "title" => Self::Title {
                title: command.decoded("value"),
            },
            "exit" => Self::Exit {
                code: NumericField::read(command, "value"),
            },
            "hide" => Self::Hide,
            "inspect" => Self::Inspect,
            "external" => Self::External {
                url: command.decoded("value"),
            },
            "dialog" => Self::Dialog(DialogOptions::from_command(command)),
            "context" => Self::Context {
                spec: command.decoded("value"),
            },
            _ => Self::Forward,
        }
    }
}
