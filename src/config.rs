use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Behavior switches of an [`EventContext`](crate::EventContext).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Removing a listener that is not registered is an error instead of
    /// a logged no-op.
    #[serde(default = "default_true")]
    pub strict_removal: bool,

    /// Trace every dispatched event.
    #[serde(default)]
    pub trace_events: bool,

    /// Warn when the producer closes a construct it never opened.
    #[serde(default = "default_true")]
    pub warn_on_unbalanced: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            strict_removal: default_true(),
            trace_events: false,
            warn_on_unbalanced: default_true(),
        }
    }
}

impl DispatchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        from_file(path)
    }

    pub fn from_json(s: &str) -> ConfigResult<Self> {
        from_str(s)
    }
}

impl FromStr for DispatchConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

fn default_true() -> bool {
    true
}

pub fn from_file<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> ConfigResult<T> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let config = serde_json::from_reader(reader)?;
    Ok(config)
}

pub fn from_str<T: for<'de> Deserialize<'de>>(s: &str) -> ConfigResult<T> {
    let config = serde_json::from_str(s)?;
    Ok(config)
}
