//! Endpoints, hosts, and the grouping rule between them.

use std::collections::HashMap;
use std::fmt;

use http::{HeaderName, HeaderValue};
use tracing::debug;
use url::{Host as UrlHost, Url};

use crate::config::EndpointRecord;
use crate::error::{ConfigError, ConfigResult};

// ── HttpMethod ─────────────────────────────────────────────────────

/// The HTTP verbs an endpoint may be probed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    /// Parse a method name, ignoring ASCII case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GET" => Some(HttpMethod::Get),
            "POST" => Some(HttpMethod::Post),
            "PUT" => Some(HttpMethod::Put),
            "DELETE" => Some(HttpMethod::Delete),
            "HEAD" => Some(HttpMethod::Head),
            "OPTIONS" => Some(HttpMethod::Options),
            _ => None,
        }
    }

    /// Canonical upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// Whether a configured body is sent with this method.
    pub fn accepts_body(&self) -> bool {
        match self {
            HttpMethod::Get | HttpMethod::Head => false,
            HttpMethod::Post | HttpMethod::Put | HttpMethod::Delete | HttpMethod::Options => true,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<HttpMethod> for http::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => http::Method::GET,
            HttpMethod::Post => http::Method::POST,
            HttpMethod::Put => http::Method::PUT,
            HttpMethod::Delete => http::Method::DELETE,
            HttpMethod::Head => http::Method::HEAD,
            HttpMethod::Options => http::Method::OPTIONS,
        }
    }
}

// ── Endpoint ───────────────────────────────────────────────────────

/// A single HTTP target under observation. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    name: String,
    url: Url,
    hostname: String,
    method: HttpMethod,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

impl Endpoint {
    /// Validate a raw record. `position` is the 1-based index of the record
    /// in the endpoints file, used in error messages.
    pub fn from_record(position: usize, record: &EndpointRecord) -> ConfigResult<Self> {
        let name = record.name.as_deref().ok_or(ConfigError::MissingField {
            position,
            field: "name",
        })?;
        if name.trim().is_empty() {
            return Err(ConfigError::EmptyName { position });
        }
        let name = name.to_string();

        let raw_url = record.url.as_deref().ok_or(ConfigError::MissingField {
            position,
            field: "url",
        })?;
        let url = Url::parse(raw_url.trim()).map_err(|e| ConfigError::InvalidUrl {
            name: name.clone(),
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme {
                name,
                scheme: url.scheme().to_string(),
            });
        }
        // IPv6 literals are reported without their brackets.
        let hostname = match url.host() {
            Some(UrlHost::Ipv6(addr)) => addr.to_string(),
            Some(host) => host.to_string(),
            None => String::new(),
        };
        if hostname.is_empty() {
            return Err(ConfigError::MissingHostname {
                name,
                url: raw_url.to_string(),
            });
        }

        let method = match record.method.as_deref() {
            None => HttpMethod::default(),
            Some(m) => HttpMethod::parse(m).ok_or_else(|| ConfigError::UnsupportedMethod {
                name: name.clone(),
                method: m.to_string(),
            })?,
        };

        let mut headers = Vec::new();
        for (header, value) in record.headers.iter().flatten() {
            let invalid = |reason: String| ConfigError::InvalidHeader {
                name: name.clone(),
                header: header.clone(),
                reason,
            };
            HeaderName::from_bytes(header.as_bytes()).map_err(|e| invalid(e.to_string()))?;
            HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
            headers.push((header.clone(), value.clone()));
        }

        Ok(Self {
            name,
            url,
            hostname,
            method,
            body: record.body.clone(),
            headers,
        })
    }

    /// Display name from the endpoints file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Validated absolute `http`/`https` URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Request method, resolved when the endpoint was built.
    pub fn method(&self) -> HttpMethod {
        self.method
    }

    /// The configured body, regardless of whether the method sends it.
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// The body to put on the wire: `None` for methods without a payload.
    pub fn request_body(&self) -> Option<&str> {
        self.body().filter(|_| self.method.accepts_body())
    }

    /// Configured headers, names with their original case.
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Hostname component of the URL, lowercased. Domains keep their
    /// ASCII (punycode) form; IPv6 literals drop their brackets.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} {})", self.name, self.method, self.url)
    }
}

// ── Host ───────────────────────────────────────────────────────────

/// All endpoints sharing a URL hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    hostname: String,
    endpoints: Vec<Endpoint>,
}

impl Host {
    /// A host named `hostname` holding `endpoints` in the given order.
    pub fn new(hostname: impl Into<String>, endpoints: Vec<Endpoint>) -> Self {
        Self {
            hostname: hostname.into(),
            endpoints,
        }
    }

    /// Hostname shared by every endpoint of this host.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Endpoints in first-seen order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }
}

/// Validate records and group them into hosts.
///
/// Hosts appear in the order their hostname was first seen, and each
/// host's endpoints keep their relative order from the input. The first
/// invalid record fails the whole build.
pub fn build_hosts<'a, I>(records: I) -> ConfigResult<Vec<Host>>
where
    I: IntoIterator<Item = &'a EndpointRecord>,
{
    let mut hosts: Vec<Host> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (i, record) in records.into_iter().enumerate() {
        let endpoint = Endpoint::from_record(i + 1, record)?;
        let hostname = endpoint.hostname().to_string();

        let slot = *index.entry(hostname).or_insert_with_key(|hostname| {
            hosts.push(Host::new(hostname.clone(), Vec::new()));
            hosts.len() - 1
        });
        hosts[slot].endpoints.push(endpoint);
    }

    debug!(
        hosts = hosts.len(),
        endpoints = hosts.iter().map(|h| h.endpoints.len()).sum::<usize>(),
        "hosts built"
    );
    Ok(hosts)
}
