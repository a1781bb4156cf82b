//! HTTP transport shared by the service clients.
//!
//! [`WatsonClient`] wraps a pooled `reqwest::Client` together with the service
//! base URL, credentials and API version. Service facades describe requests as
//! path segments plus query pairs and get typed values back.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::auth::Authenticator;
use crate::config::ServiceConfig;
use crate::error::{WatsonError, WatsonResult};

/// Header Watson uses to correlate a request with server-side logs.
const TRANSACTION_ID_HEADER: &str = "x-global-transaction-id";

/// Query parameters as `(name, value)` pairs.
pub type Query<'a> = &'a [(&'static str, String)];

/// Authenticated HTTP client bound to one Watson service endpoint.
///
/// Cloning is cheap; clones share the connection pool, the IAM token cache
/// and the request counter.
#[derive(Debug, Clone)]
pub struct WatsonClient {
    http: Client,
    base_url: Url,
    authenticator: Authenticator,
    version: Option<String>,
    request_counter: Arc<AtomicU64>,
}

impl WatsonClient {
    pub fn new(config: ServiceConfig) -> WatsonResult<Self> {
        config.validate()?;

        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .build()
            .map_err(|e| WatsonError::Configuration(format!("Failed to create HTTP client: {e}")))?;

        let base_url = Url::parse(&config.url)
            .map_err(|e| WatsonError::Configuration(format!("Invalid service URL: {e}")))?;

        Ok(Self {
            http,
            base_url,
            authenticator: config
                .authenticator
                .with_timeouts(config.timeout, config.connect_timeout),
            version: config.version,
            request_counter: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Number of requests issued so far through this client and its clones.
    pub fn request_count(&self) -> u64 {
        self.request_counter.load(Ordering::Relaxed)
    }

    /// Join path segments onto the base URL, percent-encoding each one.
    pub fn endpoint(&self, segments: &[&str]) -> WatsonResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                WatsonError::Configuration(format!("Service URL cannot be a base: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub async fn get_json<T>(&self, segments: &[&str], query: Query<'_>) -> WatsonResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self.execute(Method::GET, segments, query, |r| r).await?;
        parse_json(response).await
    }

    pub async fn post_json<B, T>(&self, segments: &[&str], query: Query<'_>, body: &B) -> WatsonResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)?;
        let response = self
            .execute(Method::POST, segments, query, |r| {
                r.header("Content-Type", "application/json").body(payload)
            })
            .await?;
        parse_json(response).await
    }

    /// POST a raw binary body (audio, images).
    pub async fn post_bytes<T>(
        &self,
        segments: &[&str],
        query: Query<'_>,
        body: Bytes,
        content_type: &str,
    ) -> WatsonResult<T>
    where
        T: DeserializeOwned,
    {
        let content_type = content_type.to_string();
        let response = self
            .execute(Method::POST, segments, query, |r| {
                r.header("Content-Type", content_type).body(body)
            })
            .await?;
        parse_json(response).await
    }

    pub async fn post_multipart<T>(&self, segments: &[&str], query: Query<'_>, form: Form) -> WatsonResult<T>
    where
        T: DeserializeOwned,
    {
        let response = self
            .execute(Method::POST, segments, query, |r| r.multipart(form))
            .await?;
        parse_json(response).await
    }

    /// DELETE a resource. The response body carries nothing useful and is
    /// discarded.
    pub async fn delete(&self, segments: &[&str], query: Query<'_>) -> WatsonResult<()> {
        self.execute(Method::DELETE, segments, query, |r| r).await?;
        Ok(())
    }

    async fn execute<F>(
        &self,
        method: Method,
        segments: &[&str],
        query: Query<'_>,
        build: F,
    ) -> WatsonResult<Response>
    where
        F: FnOnce(RequestBuilder) -> RequestBuilder,
    {
        let url = self.endpoint(segments)?;
        let request_id = self.request_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let path = url.path().to_string();

        debug!(
            request_id = request_id,
            method = %method,
            path = %path,
            "Sending Watson request"
        );

        let mut request = self
            .http
            .request(method.clone(), url)
            .header("Accept", "application/json");

        if let Some(ref version) = self.version {
            request = request.query(&[("version", version.as_str())]);
        }
        if !query.is_empty() {
            request = request.query(query);
        }

        let request = self.authenticator.authenticate(request).await?;

        let response = build(request).send().await.map_err(|e| {
            error!(request_id = request_id, method = %method, path = %path, error = %e, "Watson request failed");
            WatsonError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(request_id = request_id, status = %status, "Watson request succeeded");
            return Ok(response);
        }

        let transaction_id = response
            .headers()
            .get(TRANSACTION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-")
            .to_string();
        let body = response.text().await.unwrap_or_default();

        error!(
            request_id = request_id,
            method = %method,
            path = %path,
            status = %status,
            transaction_id = %transaction_id,
            "Watson API returned error"
        );

        if status == StatusCode::UNAUTHORIZED {
            warn!("Credentials rejected, dropping cached token");
            self.authenticator.reset().await;
        }

        Err(WatsonError::from_response(status, &body))
    }
}

/// Reject identifiers that [`WatsonClient::endpoint`] would not keep as a
/// segment of their own. `.` and `..` are skipped when segments are joined,
/// so the request would hit the parent collection instead.
pub(crate) fn validate_path_segment(what: &str, value: &str) -> WatsonResult<()> {
    if matches!(value, "." | "..") {
        return Err(WatsonError::InvalidRequest(format!(
            "{what} '{value}' is not a valid path segment"
        )));
    }
    Ok(())
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> WatsonResult<T> {
    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|e| {
        error!(error = %e, "Failed to parse Watson response");
        WatsonError::Deserialization(format!("{e}: {}", truncate(&body, 256)))
    })
}

fn truncate(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
