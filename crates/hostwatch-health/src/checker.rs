//! Health check probe logic.
//!
//! One probe is one HTTP request with a hard timeout. The endpoint is up
//! iff a response with a 2xx status arrives before the timeout; every
//! other outcome is down.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use tracing::debug;

use hostwatch_core::Endpoint;

use crate::error::{HealthError, HealthResult};

/// Per-probe timeout, measured until the response head arrives.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(500);

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Why an endpoint was classified down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownCause {
    /// No response head before the timeout.
    Timeout,
    /// TCP connect failed (refused, unreachable, DNS).
    Connect(String),
    /// A response arrived with a status outside 200..300.
    Status(u16),
    /// Any other transport or protocol error, TLS included.
    Request(String),
}

impl DownCause {
    fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            DownCause::Timeout
        } else if err.is_connect() {
            DownCause::Connect(error_chain(err))
        } else {
            DownCause::Request(error_chain(err))
        }
    }
}

impl fmt::Display for DownCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownCause::Timeout => f.write_str("timed out"),
            DownCause::Connect(e) => write!(f, "connection failed: {e}"),
            DownCause::Status(code) => write!(f, "status {code}"),
            DownCause::Request(e) => write!(f, "request failed: {e}"),
        }
    }
}

/// Result of a single probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Up { status: u16, latency: Duration },
    Down(DownCause),
}

impl ProbeResult {
    /// Classify a received status code.
    pub fn from_status(status: u16, latency: Duration) -> Self {
        if (200..300).contains(&status) {
            ProbeResult::Up { status, latency }
        } else {
            ProbeResult::Down(DownCause::Status(status))
        }
    }

    pub fn is_up(&self) -> bool {
        matches!(self, ProbeResult::Up { .. })
    }

    pub fn cause(&self) -> Option<&DownCause> {
        match self {
            ProbeResult::Up { .. } => None,
            ProbeResult::Down(cause) => Some(cause),
        }
    }
}

/// Something that can decide whether an endpoint is up right now.
///
/// Implementations must not fail: every outcome is a [`ProbeResult`].
pub trait Prober: Send + Sync {
    fn probe<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, ProbeResult>;
}

/// Probes endpoints over HTTP(S) with a shared connection pool.
#[derive(Debug, Clone)]
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    /// Build a prober with its own client. Redirects are not followed, so
    /// a 3xx counts as down.
    pub fn new(timeout: Duration) -> HealthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!("hostwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HealthError::Client(e.to_string()))?;
        Ok(Self::with_client(client, timeout))
    }

    /// Use a preconfigured client. `timeout` still bounds every probe.
    pub fn with_client(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Send one request to `endpoint` and classify the outcome.
    pub async fn check(&self, endpoint: &Endpoint) -> ProbeResult {
        let mut request = self
            .client
            .request(endpoint.method().into(), endpoint.url().clone());
        for (name, value) in endpoint.headers() {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = endpoint.request_body() {
            request = request.body(body.to_string());
        }

        let started = Instant::now();
        let result = tokio::time::timeout(self.timeout, request.send()).await;
        let latency = started.elapsed();

        // Only the status is needed; dropping the response discards the body.
        let outcome = match result {
            Ok(Ok(resp)) => ProbeResult::from_status(resp.status().as_u16(), latency),
            Ok(Err(e)) => ProbeResult::Down(DownCause::from_reqwest(&e)),
            Err(_) => ProbeResult::Down(DownCause::Timeout),
        };

        match &outcome {
            ProbeResult::Up { status, .. } => debug!(
                endpoint = %endpoint.name(),
                url = %endpoint.url(),
                status,
                latency_ms = latency.as_millis() as u64,
                "probe up"
            ),
            ProbeResult::Down(cause) => debug!(
                endpoint = %endpoint.name(),
                url = %endpoint.url(),
                %cause,
                latency_ms = latency.as_millis() as u64,
                "probe down"
            ),
        }
        outcome
    }
}

impl Prober for HttpProber {
    fn probe<'a>(&'a self, endpoint: &'a Endpoint) -> BoxFuture<'a, ProbeResult> {
        Box::pin(self.check(endpoint))
    }
}

/// Render an error followed by its source chain.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(inner) = source {
        out.push_str(": ");
        out.push_str(&inner.to_string());
        source = inner.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostwatch_core::EndpointRecord;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoint(record: EndpointRecord) -> Endpoint {
        Endpoint::from_record(1, &record).unwrap()
    }

    async fn probe_status(status: u16) -> ProbeResult {
        let server = MockServer::start().await;
        Mock::given(path("/status"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let ep = endpoint(EndpointRecord::new("s", format!("{}/status", server.uri())));
        prober.check(&ep).await
    }

    #[test]
    fn status_boundaries() {
        let d = Duration::from_millis(1);
        assert!(!ProbeResult::from_status(199, d).is_up());
        assert!(ProbeResult::from_status(200, d).is_up());
        assert!(ProbeResult::from_status(299, d).is_up());
        assert!(!ProbeResult::from_status(300, d).is_up());
        assert_eq!(
            ProbeResult::from_status(503, d),
            ProbeResult::Down(DownCause::Status(503))
        );
    }

    #[test]
    fn cause_only_for_down() {
        let up = ProbeResult::from_status(204, Duration::ZERO);
        assert_eq!(up.cause(), None);
        let down = ProbeResult::Down(DownCause::Timeout);
        assert_eq!(down.cause(), Some(&DownCause::Timeout));
        assert_eq!(DownCause::Status(404).to_string(), "status 404");
    }

    #[tokio::test]
    async fn http_200_is_up() {
        let result = probe_status(200).await;
        assert!(matches!(result, ProbeResult::Up { status: 200, .. }));
    }

    #[tokio::test]
    async fn http_299_is_up() {
        assert!(probe_status(299).await.is_up());
    }

    #[tokio::test]
    async fn http_300_is_down() {
        assert_eq!(
            probe_status(300).await,
            ProbeResult::Down(DownCause::Status(300))
        );
    }

    #[tokio::test]
    async fn redirect_is_not_followed() {
        let server = MockServer::start().await;
        Mock::given(path("/moved"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", format!("{}/ok", server.uri())),
            )
            .mount(&server)
            .await;
        Mock::given(path("/ok"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let ep = endpoint(EndpointRecord::new("r", format!("{}/moved", server.uri())));
        assert_eq!(
            prober.check(&ep).await,
            ProbeResult::Down(DownCause::Status(302))
        );
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(path("/slow"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(800)))
            .mount(&server)
            .await;

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let ep = endpoint(EndpointRecord::new("slow", format!("{}/slow", server.uri())));
        assert_eq!(prober.check(&ep).await, ProbeResult::Down(DownCause::Timeout));
    }

    #[tokio::test]
    async fn closed_port_is_connect_failure() {
        let prober = HttpProber::new(Duration::from_millis(200)).unwrap();
        let ep = endpoint(EndpointRecord::new("closed", "http://127.0.0.1:1/healthz"));
        let result = prober.check(&ep).await;
        assert!(!result.is_up());
        assert!(matches!(
            result.cause(),
            Some(DownCause::Connect(_)) | Some(DownCause::Timeout)
        ));
    }

    #[tokio::test]
    async fn sends_method_headers_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/submit"))
            .and(header("x-api-token", "abc"))
            .and(body_string(r#"{"foo":"bar"}"#))
            .respond_with(ResponseTemplate::new(201))
            .mount(&server)
            .await;

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        let ep = endpoint(
            EndpointRecord::new("post", format!("{}/submit", server.uri()))
                .with_method("post")
                .with_header("X-Api-Token", "abc")
                .with_body(r#"{"foo":"bar"}"#),
        );
        assert!(prober.check(&ep).await.is_up());

        // Same request without the header does not match and gets a 404.
        let ep = endpoint(
            EndpointRecord::new("post", format!("{}/submit", server.uri()))
                .with_method("POST")
                .with_body(r#"{"foo":"bar"}"#),
        );
        assert_eq!(
            prober.check(&ep).await,
            ProbeResult::Down(DownCause::Status(404))
        );
    }

    #[tokio::test]
    async fn every_method_is_sent_as_configured() {
        let server = MockServer::start().await;
        for verb in ["GET", "PUT", "DELETE", "HEAD", "OPTIONS"] {
            Mock::given(method(verb))
                .and(path("/verb"))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server)
                .await;
        }

        let prober = HttpProber::new(DEFAULT_PROBE_TIMEOUT).unwrap();
        for verb in ["get", "put", "delete", "head", "options"] {
            let ep = endpoint(
                EndpointRecord::new(verb, format!("{}/verb", server.uri())).with_method(verb),
            );
            assert!(prober.check(&ep).await.is_up(), "{verb} should be up");
        }
        server.verify().await;
    }

    #[test]
    fn error_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let outer = std::io::Error::other(inner);
        assert!(error_chain(&outer).contains("refused"));
    }
}
