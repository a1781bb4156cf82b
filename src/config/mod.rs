//! Configuration for Watson service clients.
//!
//! A [`ServiceConfig`] carries everything a service client needs: the
//! endpoint URL, credentials, the API version date and HTTP timeouts. It can be
//! built directly, or loaded from environment variables, a YAML file, or a
//! Cloud Foundry `VCAP_SERVICES` document. Priority when using
//! [`ServiceConfig::load`]: YAML section > environment variables > defaults.
//!
//! # Modules
//! - `env`: environment variable loading
//! - `vcap`: `VCAP_SERVICES` credential documents
//! - `yaml`: YAML configuration file loading
//!
//! # Example
//! ```rust,no_run
//! use watson_sdk::config::{ServiceConfig, ServiceKind};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Explicit configuration
//! let config = ServiceConfig::new("https://api.us-south.visual-recognition.watson.cloud.ibm.com")
//!     .with_iam("my-api-key");
//!
//! // From VISUAL_RECOGNITION_* environment variables
//! let config = ServiceConfig::from_env(ServiceKind::VisualRecognition)?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::{Authenticator, IamTokenManager};
use crate::error::{WatsonError, WatsonResult};

mod env;
mod vcap;
mod yaml;

pub use vcap::fetch_vcap_document;
pub use yaml::{ServiceSection, WatsonConfigFile};

// =============================================================================
// Constants
// =============================================================================

/// Default Visual Recognition endpoint.
pub const DEFAULT_VISUAL_RECOGNITION_URL: &str =
    "https://gateway-a.watsonplatform.net/visual-recognition/api";

/// Default Speech-to-Text endpoint.
pub const DEFAULT_SPEECH_TO_TEXT_URL: &str = "https://stream.watsonplatform.net/speech-to-text/api";

/// API version date sent with every Visual Recognition request.
pub const DEFAULT_VISUAL_RECOGNITION_VERSION: &str = "2016-05-20";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Default connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 4;

// =============================================================================
// Service kinds and regions
// =============================================================================

/// The Watson services this crate talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    VisualRecognition,
    SpeechToText,
}

impl ServiceKind {
    /// Prefix of the environment variables for this service.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Self::VisualRecognition => "VISUAL_RECOGNITION",
            Self::SpeechToText => "SPEECH_TO_TEXT",
        }
    }

    /// Key of this service in `VCAP_SERVICES` and YAML files.
    pub fn service_name(&self) -> &'static str {
        match self {
            Self::VisualRecognition => "visual_recognition",
            Self::SpeechToText => "speech_to_text",
        }
    }

    pub fn default_url(&self) -> &'static str {
        match self {
            Self::VisualRecognition => DEFAULT_VISUAL_RECOGNITION_URL,
            Self::SpeechToText => DEFAULT_SPEECH_TO_TEXT_URL,
        }
    }

    /// Version date required by the service, if it uses one.
    pub fn default_version(&self) -> Option<&'static str> {
        match self {
            Self::VisualRecognition => Some(DEFAULT_VISUAL_RECOGNITION_VERSION),
            Self::SpeechToText => None,
        }
    }

    fn hostname_segment(&self) -> &'static str {
        match self {
            Self::VisualRecognition => "visual-recognition",
            Self::SpeechToText => "speech-to-text",
        }
    }
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.service_name())
    }
}

/// IBM Cloud regions hosting Watson services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IbmRegion {
    /// Dallas, Texas (US South)
    #[default]
    UsSouth,
    /// Washington, D.C. (US East)
    UsEast,
    /// Frankfurt, Germany (EU Central)
    EuDe,
    /// London, UK (EU GB)
    EuGb,
    /// Sydney, Australia (AU SYD)
    AuSyd,
    /// Tokyo, Japan (JP TOK)
    JpTok,
    /// Seoul, South Korea (KR SEO)
    KrSeo,
}

impl IbmRegion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UsSouth => "us-south",
            Self::UsEast => "us-east",
            Self::EuDe => "eu-de",
            Self::EuGb => "eu-gb",
            Self::AuSyd => "au-syd",
            Self::JpTok => "jp-tok",
            Self::KrSeo => "kr-seo",
        }
    }

    /// Public endpoint of `kind` in this region.
    pub fn service_url(&self, kind: ServiceKind) -> String {
        format!(
            "https://api.{}.{}.watson.cloud.ibm.com",
            self.as_str(),
            kind.hostname_segment()
        )
    }
}

impl std::fmt::Display for IbmRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for IbmRegion {
    type Err = WatsonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "us-south" | "dallas" => Ok(Self::UsSouth),
            "us-east" | "washington" => Ok(Self::UsEast),
            "eu-de" | "frankfurt" => Ok(Self::EuDe),
            "eu-gb" | "london" => Ok(Self::EuGb),
            "au-syd" | "sydney" => Ok(Self::AuSyd),
            "jp-tok" | "tokyo" => Ok(Self::JpTok),
            "kr-seo" | "seoul" => Ok(Self::KrSeo),
            other => Err(WatsonError::Configuration(format!(
                "Unsupported IBM Cloud region: {other}"
            ))),
        }
    }
}

// =============================================================================
// Service configuration
// =============================================================================

/// Connection settings for a single Watson service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Service endpoint without the version path (`/v1`, `/v3`).
    pub url: String,
    pub authenticator: Authenticator,
    /// `version` query parameter sent with every request.
    pub version: Option<String>,
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub pool_max_idle_per_host: usize,
}

impl ServiceConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into().trim_end_matches('/').to_string(),
            authenticator: Authenticator::None,
            version: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            pool_max_idle_per_host: DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }

    /// Defaults for `kind`: public URL, version date, no credentials.
    pub fn for_service(kind: ServiceKind) -> Self {
        let mut config = Self::new(kind.default_url());
        config.version = kind.default_version().map(str::to_string);
        config
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_authenticator(mut self, authenticator: Authenticator) -> Self {
        self.authenticator = authenticator;
        self
    }

    /// Legacy `api_key` query parameter credentials.
    pub fn with_api_key(self, api_key: impl Into<String>) -> Self {
        self.with_authenticator(Authenticator::api_key(api_key))
    }

    pub fn with_basic(self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.with_authenticator(Authenticator::basic(username, password))
    }

    pub fn with_iam(self, api_key: impl Into<String>) -> Self {
        self.with_authenticator(Authenticator::iam(api_key))
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Load `<PREFIX>_*` environment variables for `kind`.
    pub fn from_env(kind: ServiceKind) -> WatsonResult<Self> {
        env::from_lookup(kind, |key| std::env::var(key).ok())
    }

    /// Read credentials for `kind` from a `VCAP_SERVICES` document.
    pub fn from_vcap(document: &str, kind: ServiceKind) -> WatsonResult<Self> {
        vcap::from_document(document, kind)
    }

    /// Load `kind` from a YAML file, falling back to the environment when the
    /// file has no section for it.
    pub fn load(kind: ServiceKind, path: Option<&Path>) -> WatsonResult<Self> {
        if let Some(path) = path {
            let file = WatsonConfigFile::from_path(path)?;
            if let Some(section) = file.section(kind) {
                return section.to_config(kind);
            }
        }
        Self::from_env(kind)
    }

    /// Check that the URL is usable before any request is made.
    pub fn validate(&self) -> WatsonResult<()> {
        let parsed = url::Url::parse(&self.url)
            .map_err(|e| WatsonError::Configuration(format!("Invalid service URL '{}': {e}", self.url)))?;

        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(WatsonError::Configuration(format!(
                "Service URL must use http or https, got: {}",
                parsed.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(WatsonError::Configuration(
                "Timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Credential fields shared by every configuration source.
#[derive(Debug, Default)]
pub(crate) struct Credentials {
    pub auth_type: Option<String>,
    /// IAM API key.
    pub apikey: Option<String>,
    /// Legacy Visual Recognition key.
    pub legacy_api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub iam_url: Option<String>,
}

impl Credentials {
    /// Pick an authenticator: an explicit `auth_type` wins, otherwise IAM,
    /// then the legacy key, then basic auth.
    pub fn into_authenticator(self) -> WatsonResult<Authenticator> {
        let Credentials {
            auth_type,
            apikey,
            legacy_api_key,
            username,
            password,
            iam_url,
        } = self;

        let iam = |key: String| match &iam_url {
            Some(url) => Authenticator::Iam(IamTokenManager::with_url(key, url.clone())),
            None => Authenticator::iam(key),
        };

        match auth_type.as_deref().map(str::to_lowercase).as_deref() {
            Some("none" | "noauth") => Ok(Authenticator::None),
            Some("iam") => apikey
                .or(legacy_api_key)
                .map(iam)
                .ok_or_else(|| missing("IAM authentication requires an API key")),
            Some("apikey" | "api_key" | "legacy") => legacy_api_key
                .or(apikey)
                .map(Authenticator::ApiKey)
                .ok_or_else(|| missing("API key authentication requires an API key")),
            Some("basic") => match (username, password) {
                (Some(u), Some(p)) => Ok(Authenticator::basic(u, p)),
                _ => Err(missing("Basic authentication requires a username and password")),
            },
            Some(other) => Err(WatsonError::Configuration(format!(
                "Unsupported authentication type: {other}. Supported types: iam, apikey, basic, none"
            ))),
            None => {
                if let Some(key) = apikey {
                    Ok(iam(key))
                } else if let Some(key) = legacy_api_key {
                    Ok(Authenticator::ApiKey(key))
                } else if let (Some(u), Some(p)) = (username, password) {
                    Ok(Authenticator::basic(u, p))
                } else {
                    Err(missing("No credentials found"))
                }
            }
        }
    }
}

fn missing(message: &str) -> WatsonError {
    WatsonError::Configuration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_service_urls() {
        assert_eq!(
            IbmRegion::UsSouth.service_url(ServiceKind::SpeechToText),
            "https://api.us-south.speech-to-text.watson.cloud.ibm.com"
        );
        assert_eq!(
            IbmRegion::EuDe.service_url(ServiceKind::VisualRecognition),
            "https://api.eu-de.visual-recognition.watson.cloud.ibm.com"
        );
    }

    #[test]
    fn test_region_from_str() {
        assert_eq!("eu-gb".parse::<IbmRegion>().unwrap(), IbmRegion::EuGb);
        assert_eq!(" Tokyo ".parse::<IbmRegion>().unwrap(), IbmRegion::JpTok);
        assert!("mars-north".parse::<IbmRegion>().is_err());
    }

    #[test]
    fn test_for_service_defaults() {
        let vr = ServiceConfig::for_service(ServiceKind::VisualRecognition);
        assert_eq!(vr.url, DEFAULT_VISUAL_RECOGNITION_URL);
        assert_eq!(vr.version.as_deref(), Some("2016-05-20"));
        assert_eq!(vr.timeout, DEFAULT_TIMEOUT);

        let stt = ServiceConfig::for_service(ServiceKind::SpeechToText);
        assert_eq!(stt.url, DEFAULT_SPEECH_TO_TEXT_URL);
        assert!(stt.version.is_none());
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        let config = ServiceConfig::new("http://localhost:8080/api/");
        assert_eq!(config.url, "http://localhost:8080/api");
    }

    #[test]
    fn test_validate() {
        assert!(ServiceConfig::new("https://example.com/api").validate().is_ok());
        assert!(ServiceConfig::new("not a url").validate().is_err());
        assert!(ServiceConfig::new("ftp://example.com").validate().is_err());
        assert!(
            ServiceConfig::new("https://example.com")
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_credentials_precedence() {
        let creds = Credentials {
            apikey: Some("iam-key".into()),
            username: Some("u".into()),
            password: Some("p".into()),
            ..Default::default()
        };
        assert_eq!(creds.into_authenticator().unwrap().kind(), "iam");

        let creds = Credentials {
            legacy_api_key: Some("legacy".into()),
            ..Default::default()
        };
        assert_eq!(creds.into_authenticator().unwrap().kind(), "apikey");

        let creds = Credentials {
            username: Some("u".into()),
            password: Some("p".into()),
            ..Default::default()
        };
        assert_eq!(creds.into_authenticator().unwrap().kind(), "basic");

        assert!(Credentials::default().into_authenticator().is_err());
    }

    #[test]
    fn test_explicit_auth_type() {
        let creds = Credentials {
            auth_type: Some("BASIC".into()),
            apikey: Some("ignored".into()),
            username: Some("u".into()),
            password: Some("p".into()),
            ..Default::default()
        };
        assert_eq!(creds.into_authenticator().unwrap().kind(), "basic");

        let creds = Credentials {
            auth_type: Some("basic".into()),
            username: Some("u".into()),
            ..Default::default()
        };
        assert!(creds.into_authenticator().is_err());

        let creds = Credentials {
            auth_type: Some("none".into()),
            ..Default::default()
        };
        assert_eq!(creds.into_authenticator().unwrap().kind(), "none");

        let creds = Credentials {
            auth_type: Some("kerberos".into()),
            ..Default::default()
        };
        assert!(creds.into_authenticator().is_err());
    }
}
