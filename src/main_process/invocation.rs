//! What to run and with which environment

use std::path::PathBuf;

use crate::protocol::{decode_value, encode_value};

/// Environment forwarded to child processes
///
/// On the wire it is a `KEY=value&KEY=value&` block with percent-encoded values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvBlock(Vec<(String, String)>);

impl EnvBlock {
    /// Capture the current values of the given variables; unset ones are empty
    pub fn capture<S: AsRef<str>>(keys: &[S]) -> Self {
        let pairs = keys
            .iter()
            .map(|key| key.as_ref().trim())
            .filter(|key| !key.is_empty())
            .map(|key| (key.to_string(), std::env::var(key).unwrap_or_default()))
            .collect();
        Self(pairs)
    }

    pub fn encode(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{}={}&", key, encode_value(value)))
            .collect()
    }

    pub fn parse(block: &str) -> Self {
        let pairs = block
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .filter(|(key, _)| !key.trim().is_empty())
            .map(|(key, value)| (key.trim().to_string(), decode_value(value)))
            .collect();
        Self(pairs)
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A child process to spawn
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: EnvBlock,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cwd: PathBuf::from("."),
            ..Self::default()
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn current_dir(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = cwd.into();
        self
    }

    pub fn env(mut self, env: EnvBlock) -> Self {
        self.env = env;
        self
    }
}
