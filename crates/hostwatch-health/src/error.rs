//! Health engine error types.

use thiserror::Error;

/// Errors raised while setting up the health engine.
///
/// Nothing in here is produced by a probe: probe failures are folded
/// into [`ProbeResult::Down`](crate::ProbeResult::Down).
#[derive(Debug, Error)]
pub enum HealthError {
    #[error("invalid runner config: {0}")]
    InvalidConfig(String),

    #[error("failed to build http client: {0}")]
    Client(String),
}

pub type HealthResult<T> = Result<T, HealthError>;
