use std::path::PathBuf;
use thiserror::Error;

/// Call-level failures of the enumeration engine.
///
/// Per-request problems (refused connections, timeouts, exhausted budgets)
/// are never reported here; they end up in the outcome sequence instead.
#[derive(Error, Debug)]
pub enum EnumerationError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// Problems with an engagement file, raised while loading or validating it.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed engagement file: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("include_ports contains invalid port: {0}")]
    InvalidPort(u16),

    #[error("time_window must have both start and end or be empty")]
    IncompleteTimeWindow,

    #[error("time_window.end must be after time_window.start")]
    InvertedTimeWindow,

    #[error("{field} must be > 0")]
    NotPositive { field: &'static str },

    #[error("unsupported cvss {0:?} (only v3.1 supported here)")]
    UnsupportedCvss(String),
}

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template name must not contain '.': {0}")]
    InvalidName(String),

    #[error("{0} already exists, refusing to overwrite")]
    AlreadyExists(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
