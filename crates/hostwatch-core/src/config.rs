//! Endpoints file parser.
//!
//! YAML files hold a top-level list of endpoint records:
//!
//! ```yaml
//! - name: fetch index page
//!   url: https://fetch.com/
//!   method: GET
//!   headers:
//!     user-agent: fetch-synthetic-monitor
//! - name: fetch some fake post endpoint
//!   url: https://fetch.com/some/post/endpoint
//!   method: POST
//!   body: '{"foo":"bar"}'
//! ```
//!
//! TOML files use an array of `[[endpoints]]` tables with the same keys.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConfigError, ConfigResult};
use crate::model::{build_hosts, Host};

/// One endpoint as written in the endpoints file, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub name: Option<String>,
    pub url: Option<String>,
    pub method: Option<String>,
    pub body: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
}

impl EndpointRecord {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }
}

/// Serialization format of an endpoints file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Toml,
}

impl FileFormat {
    /// `.toml` files are TOML; everything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FileFormat::Toml,
            _ => FileFormat::Yaml,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TomlEndpoints {
    #[serde(default)]
    endpoints: Vec<EndpointRecord>,
}

/// Parse endpoint records from a document in the given format.
///
/// An empty YAML document yields no records.
pub fn parse_records(content: &str, format: FileFormat) -> Result<Vec<EndpointRecord>, String> {
    match format {
        FileFormat::Yaml => {
            let records: Option<Vec<EndpointRecord>> =
                serde_yaml::from_str(content).map_err(|e| e.to_string())?;
            Ok(records.unwrap_or_default())
        }
        FileFormat::Toml => {
            let file: TomlEndpoints = toml::from_str(content).map_err(|e| e.to_string())?;
            Ok(file.endpoints)
        }
    }
}

/// Read endpoint records from a file.
pub fn load_records(path: &Path) -> ConfigResult<Vec<EndpointRecord>> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_records(&content, FileFormat::from_path(path)).map_err(|reason| ConfigError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

/// Load an endpoints file and build its hosts. A file with no endpoints
/// is rejected.
pub fn load_hosts(path: &Path) -> ConfigResult<Vec<Host>> {
    let records = load_records(path)?;
    if records.is_empty() {
        return Err(ConfigError::NoEndpoints(path.to_path_buf()));
    }
    let hosts = build_hosts(&records)?;
    info!(
        path = %path.display(),
        hosts = hosts.len(),
        endpoints = records.len(),
        "endpoints loaded"
    );
    Ok(hosts)
}
