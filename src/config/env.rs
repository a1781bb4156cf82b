//! Environment variable loading.
//!
//! For a service with prefix `P` (`VISUAL_RECOGNITION`, `SPEECH_TO_TEXT`):
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `P_URL` | Service endpoint |
//! | `P_REGION` | IBM Cloud region, used when `P_URL` is unset |
//! | `P_AUTH_TYPE` | `iam`, `apikey`, `basic` or `none` |
//! | `P_APIKEY` | IAM API key |
//! | `P_API_KEY` | Legacy Visual Recognition key |
//! | `P_USERNAME` / `P_PASSWORD` | Basic auth credentials |
//! | `P_IAM_URL` | Alternative IAM token endpoint |
//! | `P_VERSION` | API version date |
//! | `P_TIMEOUT_SECS` | Request timeout |

use std::time::Duration;

use super::{Credentials, IbmRegion, ServiceConfig, ServiceKind};
use crate::error::{WatsonError, WatsonResult};

pub(super) fn from_lookup<F>(kind: ServiceKind, lookup: F) -> WatsonResult<ServiceConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let prefix = kind.env_prefix();
    let var = |name: &str| {
        lookup(&format!("{prefix}_{name}"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let mut config = ServiceConfig::for_service(kind);

    if let Some(url) = var("URL") {
        config = config.with_url(url);
    } else if let Some(region) = var("REGION") {
        let region: IbmRegion = region.parse()?;
        config = config.with_url(region.service_url(kind));
    }

    let credentials = Credentials {
        auth_type: var("AUTH_TYPE"),
        apikey: var("APIKEY"),
        legacy_api_key: var("API_KEY"),
        username: var("USERNAME"),
        password: var("PASSWORD"),
        iam_url: var("IAM_URL"),
    };
    config.authenticator = credentials.into_authenticator()?;

    if let Some(version) = var("VERSION") {
        config.version = Some(version);
    }

    if let Some(timeout) = var("TIMEOUT_SECS") {
        let secs: u64 = timeout.parse().map_err(|_| {
            WatsonError::Configuration(format!("{prefix}_TIMEOUT_SECS must be an integer, got '{timeout}'"))
        })?;
        config.timeout = Duration::from_secs(secs);
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_iam_from_env() {
        let config = from_lookup(
            ServiceKind::SpeechToText,
            lookup_from(&[
                ("SPEECH_TO_TEXT_URL", "https://stt.example.com/api/"),
                ("SPEECH_TO_TEXT_APIKEY", "iam-key"),
                ("SPEECH_TO_TEXT_TIMEOUT_SECS", "120"),
            ]),
        )
        .unwrap();

        assert_eq!(config.url, "https://stt.example.com/api");
        assert_eq!(config.authenticator.kind(), "iam");
        assert_eq!(config.timeout, Duration::from_secs(120));
        assert!(config.version.is_none());
    }

    #[test]
    fn test_region_fallback() {
        let config = from_lookup(
            ServiceKind::VisualRecognition,
            lookup_from(&[
                ("VISUAL_RECOGNITION_REGION", "eu-de"),
                ("VISUAL_RECOGNITION_API_KEY", "legacy"),
                ("VISUAL_RECOGNITION_VERSION", "2018-03-19"),
            ]),
        )
        .unwrap();

        assert_eq!(
            config.url,
            "https://api.eu-de.visual-recognition.watson.cloud.ibm.com"
        );
        assert_eq!(config.authenticator.kind(), "apikey");
        assert_eq!(config.version.as_deref(), Some("2018-03-19"));
    }

    #[test]
    fn test_blank_values_are_ignored() {
        let err = from_lookup(
            ServiceKind::SpeechToText,
            lookup_from(&[("SPEECH_TO_TEXT_APIKEY", "   ")]),
        )
        .unwrap_err();
        assert!(matches!(err, WatsonError::Configuration(_)));
    }

    #[test]
    fn test_bad_timeout() {
        let err = from_lookup(
            ServiceKind::SpeechToText,
            lookup_from(&[
                ("SPEECH_TO_TEXT_APIKEY", "k"),
                ("SPEECH_TO_TEXT_TIMEOUT_SECS", "soon"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("SPEECH_TO_TEXT_TIMEOUT_SECS"));
    }

    #[test]
    #[serial]
    fn test_from_process_env() {
        // SAFETY: serialized with other environment-mutating tests.
        unsafe {
            std::env::set_var("SPEECH_TO_TEXT_USERNAME", "user");
            std::env::set_var("SPEECH_TO_TEXT_PASSWORD", "pass");
        }

        let config = ServiceConfig::from_env(ServiceKind::SpeechToText);

        unsafe {
            std::env::remove_var("SPEECH_TO_TEXT_USERNAME");
            std::env::remove_var("SPEECH_TO_TEXT_PASSWORD");
        }

        let config = config.unwrap();
        assert_eq!(config.authenticator.kind(), "basic");
        assert_eq!(config.url, super::super::DEFAULT_SPEECH_TO_TEXT_URL);
    }
}
