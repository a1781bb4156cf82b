//! Error types shared by every Watson service client.

use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Errors returned by the Watson service clients.
#[derive(Debug, Error)]
pub enum WatsonError {
    /// The request was rejected locally before any I/O was issued.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IAM token exchange failed or the service answered 401/403.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Any other non-2xx answer from the service.
    #[error("Watson API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Failed to deserialize response: {0}")]
    Deserialization(String),

    /// A classifier reached the `failed` state while being polled.
    #[error("Classifier training failed: {0}")]
    ClassifierFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type WatsonResult<T> = Result<T, WatsonError>;

impl WatsonError {
    /// Whether a caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::RateLimited(_) => true,
            Self::Api { status, .. } => (500..=599).contains(status),
            _ => false,
        }
    }

    /// HTTP status carried by the error, when it came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::NotFound(_) => Some(404),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }

    /// Map a non-success response into the matching variant.
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let message = extract_error_message(body);
        match status.as_u16() {
            401 | 403 => Self::Authentication(format!("{status}: {message}")),
            404 => Self::NotFound(message),
            429 => Self::RateLimited(message),
            code => Self::Api {
                status: code,
                message,
            },
        }
    }
}

impl From<reqwest::Error> for WatsonError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(format!("Request timed out: {e}"))
        } else if e.is_decode() {
            Self::Deserialization(e.to_string())
        } else {
            Self::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for WatsonError {
    fn from(e: serde_json::Error) -> Self {
        Self::Deserialization(e.to_string())
    }
}

/// Error body shapes used across Watson services.
///
/// Visual Recognition answers `{"error": {"description": ..., "code": ...}}`,
/// Speech-to-Text answers `{"error": "...", "code": 400}` and the IAM gateway
/// uses `errorMessage`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorField>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorField {
    Text(String),
    Detail {
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        message: Option<String>,
    },
}

fn extract_error_message(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) else {
        return body.trim().to_string();
    };

    let from_error = parsed.error.and_then(|field| match field {
        ErrorField::Text(text) => Some(text),
        ErrorField::Detail {
            description,
            message,
        } => description.or(message),
    });

    from_error
        .or(parsed.description)
        .or(parsed.message)
        .or(parsed.error_message)
        .unwrap_or_else(|| body.trim().to_string())
}
