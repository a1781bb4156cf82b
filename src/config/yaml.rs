use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use super::{Credentials, IbmRegion, ServiceConfig, ServiceKind};
use crate::error::{WatsonError, WatsonResult};

/// Complete YAML configuration structure
///
/// All fields are optional so a file may configure a single service.
///
/// # Example YAML structure
/// ```yaml
/// visual_recognition:
///   url: "https://gateway-a.watsonplatform.net/visual-recognition/api"
///   auth_type: "apikey"
///   api_key: "your-legacy-key"
///   version: "2016-05-20"
///
/// speech_to_text:
///   region: "eu-gb"
///   apikey: "your-iam-api-key"
///   timeout_secs: 300
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct WatsonConfigFile {
    pub visual_recognition: Option<ServiceSection>,
    pub speech_to_text: Option<ServiceSection>,
}

/// Per-service section of the YAML file
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServiceSection {
    pub url: Option<String>,
    pub region: Option<IbmRegion>,
    pub auth_type: Option<String>,
    pub apikey: Option<String>,
    pub api_key: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub iam_url: Option<String>,
    pub version: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl WatsonConfigFile {
    pub fn from_path(path: &Path) -> WatsonResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            WatsonError::Configuration(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> WatsonResult<Self> {
        serde_yaml::from_str(contents)
            .map_err(|e| WatsonError::Configuration(format!("Invalid YAML configuration: {e}")))
    }

    pub fn section(&self, kind: ServiceKind) -> Option<&ServiceSection> {
        match kind {
            ServiceKind::VisualRecognition => self.visual_recognition.as_ref(),
            ServiceKind::SpeechToText => self.speech_to_text.as_ref(),
        }
    }
}

impl ServiceSection {
    pub fn to_config(&self, kind: ServiceKind) -> WatsonResult<ServiceConfig> {
        let mut config = ServiceConfig::for_service(kind);

        if let Some(ref url) = self.url {
            config = config.with_url(url.clone());
        } else if let Some(region) = self.region {
            config = config.with_url(region.service_url(kind));
        }

        config.authenticator = Credentials {
            auth_type: self.auth_type.clone(),
            apikey: self.apikey.clone(),
            legacy_api_key: self.api_key.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            iam_url: self.iam_url.clone(),
        }
        .into_authenticator()?;

        if let Some(ref version) = self.version {
            config.version = Some(version.clone());
        }
        if let Some(secs) = self.timeout_secs {
            config.timeout = Duration::from_secs(secs);
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
visual_recognition:
  url: "http://localhost:9000/visual-recognition/api"
  api_key: "legacy-key"
  version: "2018-03-19"
speech_to_text:
  region: "eu-gb"
  apikey: "iam-key"
  timeout_secs: 300
"#;

    #[test]
    fn test_parse_sections() {
        let file = WatsonConfigFile::from_yaml(SAMPLE).unwrap();

        let vr = file
            .section(ServiceKind::VisualRecognition)
            .unwrap()
            .to_config(ServiceKind::VisualRecognition)
            .unwrap();
        assert_eq!(vr.url, "http://localhost:9000/visual-recognition/api");
        assert_eq!(vr.authenticator.kind(), "apikey");
        assert_eq!(vr.version.as_deref(), Some("2018-03-19"));

        let stt = file
            .section(ServiceKind::SpeechToText)
            .unwrap()
            .to_config(ServiceKind::SpeechToText)
            .unwrap();
        assert_eq!(
            stt.url,
            "https://api.eu-gb.speech-to-text.watson.cloud.ibm.com"
        );
        assert_eq!(stt.authenticator.kind(), "iam");
        assert_eq!(stt.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_partial_file() {
        let file = WatsonConfigFile::from_yaml("speech_to_text:\n  auth_type: none\n").unwrap();
        assert!(file.section(ServiceKind::VisualRecognition).is_none());
        let stt = file
            .section(ServiceKind::SpeechToText)
            .unwrap()
            .to_config(ServiceKind::SpeechToText)
            .unwrap();
        assert_eq!(stt.authenticator.kind(), "none");
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(WatsonConfigFile::from_yaml("speech_to_text: [unclosed").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = ServiceConfig::load(ServiceKind::VisualRecognition, Some(file.path())).unwrap();
        assert_eq!(config.authenticator.kind(), "apikey");
    }

    #[test]
    fn test_missing_file() {
        let err = WatsonConfigFile::from_path(Path::new("/nonexistent/watson.yaml")).unwrap_err();
        assert!(matches!(err, WatsonError::Configuration(_)));
    }
}
