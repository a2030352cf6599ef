//! Configuration error types.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for loading and validating endpoints.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading the endpoints file or building hosts.
///
/// All of these are fatal: the process refuses to start probing with a
/// partially valid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {reason}", path.display())]
    Parse { path: PathBuf, reason: String },

    #[error("no endpoints configured in {}", .0.display())]
    NoEndpoints(PathBuf),

    #[error("endpoint #{position}: missing required field `{field}`")]
    MissingField {
        position: usize,
        field: &'static str,
    },

    #[error("endpoint #{position}: name must not be empty")]
    EmptyName { position: usize },

    #[error("endpoint `{name}`: invalid url `{url}`: {reason}")]
    InvalidUrl {
        name: String,
        url: String,
        reason: String,
    },

    #[error("endpoint `{name}`: unsupported url scheme `{scheme}` (expected http or https)")]
    UnsupportedScheme { name: String, scheme: String },

    #[error("endpoint `{name}`: url `{url}` has no hostname")]
    MissingHostname { name: String, url: String },

    #[error("endpoint `{name}`: unsupported HTTP method `{method}`")]
    UnsupportedMethod { name: String, method: String },

    #[error("endpoint `{name}`: invalid header `{header}`: {reason}")]
    InvalidHeader {
        name: String,
        header: String,
        reason: String,
    },
}
