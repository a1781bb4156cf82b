//! Request authentication for Watson services.
//!
//! Watson services accept several credential styles depending on when the
//! service instance was provisioned:
//!
//! - Legacy Visual Recognition keys passed as an `api_key` query parameter
//! - Cloud Foundry username/password pairs sent as HTTP basic auth
//! - IBM Cloud IAM API keys exchanged for a short-lived bearer token
//!
//! IAM tokens are cached and refreshed shortly before they expire.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, error};

use crate::error::{WatsonError, WatsonResult};

/// IBM Cloud IAM token endpoint.
pub const IBM_IAM_URL: &str = "https://iam.cloud.ibm.com/identity/token";

/// Grant type used to exchange an API key for a bearer token.
const IAM_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Refresh this long before the token actually expires.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime assumed when the IAM response carries no `expires_in`.
const DEFAULT_TOKEN_LIFETIME: u64 = 3600;

/// Token request timeouts used until the owning client supplies its own.
const IAM_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const IAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// IAM Token Management
// =============================================================================

#[derive(Debug, Clone)]
struct IamToken {
    access_token: String,
    expires_at: Instant,
}

impl IamToken {
    fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now() + TOKEN_REFRESH_MARGIN
    }
}

#[derive(Debug, Deserialize)]
struct IamTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: u64,
}

/// Exchanges an IAM API key for bearer tokens and caches the result.
///
/// Clones share the same token cache.
#[derive(Clone)]
pub struct IamTokenManager {
    api_key: String,
    iam_url: String,
    timeout: Duration,
    connect_timeout: Duration,
    token: Arc<RwLock<Option<IamToken>>>,
}

impl IamTokenManager {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_url(api_key, IBM_IAM_URL)
    }

    /// Use a non-default IAM endpoint (private endpoints, tests).
    pub fn with_url(api_key: impl Into<String>, iam_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            iam_url: iam_url.into(),
            timeout: IAM_REQUEST_TIMEOUT,
            connect_timeout: IAM_CONNECT_TIMEOUT,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Bound the token exchange. Clones made afterwards keep sharing the
    /// token cache.
    pub fn with_timeouts(mut self, timeout: Duration, connect_timeout: Duration) -> Self {
        self.timeout = timeout;
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn iam_url(&self) -> &str {
        &self.iam_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Return a valid access token, fetching a new one if needed.
    pub async fn access_token(&self) -> WatsonResult<String> {
        {
            let guard = self.token.read().await;
            if let Some(ref token) = *guard
                && !token.is_expired()
            {
                return Ok(token.access_token.clone());
            }
        }

        let mut guard = self.token.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(ref token) = *guard
            && !token.is_expired()
        {
            return Ok(token.access_token.clone());
        }

        debug!("Fetching new IAM token");
        let token = self.fetch_token().await?;
        let access_token = token.access_token.clone();
        *guard = Some(token);

        Ok(access_token)
    }

    /// Drop the cached token so the next request fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    async fn fetch_token(&self) -> WatsonResult<IamToken> {
        if self.api_key.is_empty() {
            return Err(WatsonError::Configuration(
                "IAM API key is required".to_string(),
            ));
        }

        // Bounded so a stalled IAM endpoint fails instead of hanging callers
        let client = Client::builder()
            .timeout(self.timeout)
            .connect_timeout(self.connect_timeout)
            .pool_max_idle_per_host(4)
            .build()
            .map_err(|e| WatsonError::Configuration(format!("Failed to create IAM HTTP client: {e}")))?;

        let response = client
            .post(&self.iam_url)
            .header("Accept", "application/json")
            .form(&[("grant_type", IAM_GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WatsonError::Timeout(format!("IAM token request timed out: {e}"))
                } else {
                    WatsonError::Authentication(format!("Failed to request IAM token: {e}"))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, "IAM token request failed");
            return Err(WatsonError::Authentication(format!(
                "IAM token request failed ({status}): {body}"
            )));
        }

        let token_response: IamTokenResponse = response
            .json()
            .await
            .map_err(|e| WatsonError::Authentication(format!("Failed to parse IAM token: {e}")))?;

        let expires_in = if token_response.expires_in > 0 {
            token_response.expires_in
        } else {
            DEFAULT_TOKEN_LIFETIME
        };

        debug!(expires_in, "IAM token fetched");

        Ok(IamToken {
            access_token: token_response.access_token,
            expires_at: Instant::now() + Duration::from_secs(expires_in),
        })
    }
}

impl fmt::Debug for IamTokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IamTokenManager")
            .field("api_key", &"<redacted>")
            .field("iam_url", &self.iam_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

// =============================================================================
// Authenticator
// =============================================================================

/// Credentials attached to every outgoing request.
#[derive(Clone, Default)]
pub enum Authenticator {
    /// No credentials (local mocks, pre-authenticated proxies).
    #[default]
    None,
    /// Legacy `api_key` query parameter.
    ApiKey(String),
    /// HTTP basic authentication.
    Basic { username: String, password: String },
    /// IAM bearer token derived from an API key.
    Iam(IamTokenManager),
}

impl Authenticator {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self::ApiKey(key.into())
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn iam(api_key: impl Into<String>) -> Self {
        Self::Iam(IamTokenManager::new(api_key))
    }

    /// Short name used in logs and configuration files.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ApiKey(_) => "apikey",
            Self::Basic { .. } => "basic",
            Self::Iam(_) => "iam",
        }
    }

    /// Attach credentials to a request.
    pub async fn authenticate(&self, request: RequestBuilder) -> WatsonResult<RequestBuilder> {
        match self {
            Self::None => Ok(request),
            Self::ApiKey(key) => Ok(request.query(&[("api_key", key.as_str())])),
            Self::Basic { username, password } => {
                Ok(request.basic_auth(username, Some(password)))
            }
            Self::Iam(manager) => {
                let token = manager.access_token().await?;
                Ok(request.bearer_auth(token))
            }
        }
    }

    /// Apply the owning client's timeouts to any token exchange.
    pub fn with_timeouts(self, timeout: Duration, connect_timeout: Duration) -> Self {
        match self {
            Self::Iam(manager) => Self::Iam(manager.with_timeouts(timeout, connect_timeout)),
            other => other,
        }
    }

    /// Forget any cached credentials after the service rejected them.
    pub async fn reset(&self) {
        if let Self::Iam(manager) = self {
            manager.invalidate().await;
        }
    }
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::ApiKey(_) => write!(f, "ApiKey(<redacted>)"),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Iam(manager) => f.debug_tuple("Iam").field(manager).finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_expiry_margin() {
        let fresh = IamToken {
            access_token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(3600),
        };
        assert!(!fresh.is_expired());

        let nearly = IamToken {
            access_token: "t".to_string(),
            expires_at: Instant::now() + Duration::from_secs(30),
        };
        assert!(nearly.is_expired());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", Authenticator::api_key("super-secret"));
        assert!(!rendered.contains("super-secret"));

        let rendered = format!("{:?}", Authenticator::basic("alice", "hunter2"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("hunter2"));

        let rendered = format!("{:?}", Authenticator::iam("iam-secret"));
        assert!(!rendered.contains("iam-secret"));
        assert!(rendered.contains(IBM_IAM_URL));
    }

    #[test]
    fn test_kind() {
        assert_eq!(Authenticator::None.kind(), "none");
        assert_eq!(Authenticator::api_key("k").kind(), "apikey");
        assert_eq!(Authenticator::basic("u", "p").kind(), "basic");
        assert_eq!(Authenticator::iam("k").kind(), "iam");
    }

    #[test]
    fn test_client_timeouts_reach_iam_manager() {
        assert_eq!(IamTokenManager::new("k").timeout(), IAM_REQUEST_TIMEOUT);

        let auth = Authenticator::iam("k").with_timeouts(Duration::from_secs(2), Duration::from_secs(1));
        match auth {
            Authenticator::Iam(manager) => assert_eq!(manager.timeout(), Duration::from_secs(2)),
            other => panic!("expected IAM authenticator, got {other:?}"),
        }

        let auth = Authenticator::api_key("k").with_timeouts(Duration::from_secs(2), Duration::from_secs(1));
        assert_eq!(auth.kind(), "apikey");
    }

    #[tokio::test]
    async fn test_iam_requires_key() {
        let manager = IamTokenManager::new("");
        let err = manager.access_token().await.unwrap_err();
        assert!(matches!(err, WatsonError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_api_key_goes_into_query() {
        let client = Client::new();
        let request = Authenticator::api_key("abc 123")
            .authenticate(client.get("https://example.com/v3/classify"))
            .await
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.url().query(), Some("api_key=abc+123"));
    }

    #[tokio::test]
    async fn test_basic_sets_authorization_header() {
        let client = Client::new();
        let request = Authenticator::basic("user", "pass")
            .authenticate(client.get("https://example.com/v1/models"))
            .await
            .unwrap()
            .build()
            .unwrap();
        let header = request.headers().get("authorization").unwrap();
        assert_eq!(header.to_str().unwrap(), "Basic dXNlcjpwYXNz");
    }
}
