use std::fmt;
use std::time::Duration;

/// Failure while retrieving a dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    Transport(String),
    Timeout(Duration),
    Malformed(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupError::Transport(reason) => write!(f, "entry transport failed: {reason}"),
            LookupError::Timeout(after) => {
                write!(f, "entry lookup timed out after {} ms", after.as_millis())
            }
            LookupError::Malformed(reason) => write!(f, "malformed entry document: {reason}"),
        }
    }
}

impl std::error::Error for LookupError {}

impl From<quick_xml::Error> for LookupError {
    fn from(value: quick_xml::Error) -> Self {
        LookupError::Malformed(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    Transport(String),
    Disconnected,
}

impl fmt::Display for SyncError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncError::Transport(reason) => write!(f, "bookmark transport failed: {reason}"),
            SyncError::Disconnected => write!(f, "persistence owner disconnected"),
        }
    }
}

impl std::error::Error for SyncError {}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Json(serde_json::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "io error: {err}"),
            ConfigError::Json(err) => write!(f, "invalid config: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Json(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        ConfigError::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        ConfigError::Json(value)
    }
}
