//! `VCAP_SERVICES` credential documents.
//!
//! Two shapes are accepted for a service entry:
//!
//! ```json
//! { "visual_recognition": { "url": "...", "api_key": "..." } }
//! { "speech_to_text": [ { "credentials": { "url": "...", "username": "...", "password": "..." } } ] }
//! ```
//!
//! The first is what the Watson SDK test infrastructure serves; the second is
//! the Cloud Foundry format.

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{Credentials, ServiceConfig, ServiceKind};
use crate::error::{WatsonError, WatsonResult};

#[derive(Debug, Default, Deserialize)]
struct VcapCredentials {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    apikey: Option<String>,
    #[serde(default)]
    iam_apikey: Option<String>,
    #[serde(default)]
    api_key: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    iam_url: Option<String>,
}

pub(super) fn from_document(document: &str, kind: ServiceKind) -> WatsonResult<ServiceConfig> {
    let root: Value = serde_json::from_str(document)
        .map_err(|e| WatsonError::Configuration(format!("Invalid VCAP_SERVICES document: {e}")))?;

    let entry = root.get(kind.service_name()).ok_or_else(|| {
        WatsonError::Configuration(format!("No '{}' entry in VCAP_SERVICES", kind.service_name()))
    })?;

    let credentials_value = match entry {
        Value::Array(instances) => instances
            .first()
            .and_then(|instance| instance.get("credentials"))
            .cloned()
            .ok_or_else(|| {
                WatsonError::Configuration(format!(
                    "'{}' has no bound instance with credentials",
                    kind.service_name()
                ))
            })?,
        Value::Object(map) => map.get("credentials").cloned().unwrap_or_else(|| entry.clone()),
        _ => {
            return Err(WatsonError::Configuration(format!(
                "'{}' entry must be an object or an array",
                kind.service_name()
            )));
        }
    };

    let creds: VcapCredentials = serde_json::from_value(credentials_value)
        .map_err(|e| WatsonError::Configuration(format!("Invalid credentials: {e}")))?;

    let mut config = ServiceConfig::for_service(kind);
    if let Some(url) = creds.url {
        config = config.with_url(url);
    }

    config.authenticator = Credentials {
        auth_type: None,
        apikey: creds.apikey.or(creds.iam_apikey),
        legacy_api_key: creds.api_key,
        username: creds.username,
        password: creds.password,
        iam_url: creds.iam_url,
    }
    .into_authenticator()?;

    debug!(
        service = %kind,
        auth = config.authenticator.kind(),
        "Loaded credentials from VCAP_SERVICES"
    );

    config.validate()?;
    Ok(config)
}

/// Download a `VCAP_SERVICES` document from a credential server protected by
/// basic auth.
pub async fn fetch_vcap_document(url: &str, username: &str, password: &str) -> WatsonResult<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?;

    let response = client
        .get(url)
        .basic_auth(username, Some(password))
        .send()
        .await?;

    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(WatsonError::from_response(status, &body));
    }

    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_entry_with_legacy_key() {
        let doc = r#"{
            "visual_recognition": {
                "url": "https://gateway-a.watsonplatform.net/visual-recognition/api",
                "api_key": "0123456789"
            }
        }"#;

        let config = from_document(doc, ServiceKind::VisualRecognition).unwrap();
        assert_eq!(config.authenticator.kind(), "apikey");
        assert_eq!(config.version.as_deref(), Some("2016-05-20"));
    }

    #[test]
    fn test_cloud_foundry_array() {
        let doc = r#"{
            "speech_to_text": [
                {
                    "name": "stt-instance",
                    "credentials": {
                        "url": "https://stream.watsonplatform.net/speech-to-text/api",
                        "username": "user",
                        "password": "pass"
                    }
                }
            ]
        }"#;

        let config = from_document(doc, ServiceKind::SpeechToText).unwrap();
        assert_eq!(config.authenticator.kind(), "basic");
        assert_eq!(
            config.url,
            "https://stream.watsonplatform.net/speech-to-text/api"
        );
    }

    #[test]
    fn test_iam_apikey_wins() {
        let doc = r#"{"speech_to_text": {"credentials": {"apikey": "iam", "username": "u", "password": "p"}}}"#;
        let config = from_document(doc, ServiceKind::SpeechToText).unwrap();
        assert_eq!(config.authenticator.kind(), "iam");
    }

    #[test]
    fn test_missing_service() {
        let err = from_document(r#"{"other": {}}"#, ServiceKind::SpeechToText).unwrap_err();
        assert!(err.to_string().contains("speech_to_text"));
    }

    #[test]
    fn test_empty_array() {
        let err = from_document(r#"{"speech_to_text": []}"#, ServiceKind::SpeechToText).unwrap_err();
        assert!(matches!(err, WatsonError::Configuration(_)));
    }

    #[test]
    fn test_invalid_json() {
        assert!(from_document("{not json", ServiceKind::SpeechToText).is_err());
    }
}
