//! hostwatch-core — the data model shared by the hostwatch crates.
//!
//! Endpoints are read from an endpoints file (YAML or TOML) into
//! [`EndpointRecord`]s, validated into immutable [`Endpoint`]s, and
//! grouped by URL hostname into [`Host`]s. Every validation failure is a
//! [`ConfigError`] raised before any probing starts.

pub mod config;
pub mod error;
pub mod model;

pub use config::{load_hosts, load_records, parse_records, EndpointRecord, FileFormat};
pub use error::{ConfigError, ConfigResult};
pub use model::{build_hosts, Endpoint, Host, HttpMethod};
