//! Speech-to-Text v1 service client.

use bytes::Bytes;
use tracing::{debug, info};

use super::models::{RecognizeParams, SpeechModel, SpeechModels, SpeechRecognitionResults};
use crate::config::{ServiceConfig, ServiceKind};
use crate::error::{WatsonError, WatsonResult};
use crate::http::{WatsonClient, validate_path_segment};

const API_VERSION: &str = "v1";

/// Client for the Speech-to-Text REST interface.
///
/// # Example
///
/// ```rust,no_run
/// use watson_sdk::config::{ServiceConfig, ServiceKind};
/// use watson_sdk::speech_to_text::{RecognizeParams, SpeechToTextService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let service = SpeechToTextService::new(ServiceConfig::from_env(ServiceKind::SpeechToText)?)?;
///
///     let audio = std::fs::read("weather.wav")?;
///     let params = RecognizeParams::new("audio/wav").with_keywords(["hail"], 0.5);
///     let results = service.recognize(audio, &params).await?;
///
///     println!("{}", results.transcript());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SpeechToTextService {
    client: WatsonClient,
}

impl SpeechToTextService {
    pub fn new(config: ServiceConfig) -> WatsonResult<Self> {
        Ok(Self {
            client: WatsonClient::new(config)?,
        })
    }

    /// Build a client from `SPEECH_TO_TEXT_*` environment variables.
    pub fn from_env() -> WatsonResult<Self> {
        Self::new(ServiceConfig::from_env(ServiceKind::SpeechToText)?)
    }

    pub fn from_client(client: WatsonClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &WatsonClient {
        &self.client
    }

    /// Transcribe a complete audio file sent as the request body.
    pub async fn recognize(
        &self,
        audio: impl Into<Bytes>,
        params: &RecognizeParams,
    ) -> WatsonResult<SpeechRecognitionResults> {
        let audio = audio.into();
        if audio.is_empty() {
            return Err(WatsonError::InvalidRequest("Audio must not be empty".to_string()));
        }
        if params.content_type.trim().is_empty() {
            return Err(WatsonError::InvalidRequest(
                "Audio content type is required".to_string(),
            ));
        }
        validate_threshold("keywords_threshold", params.keywords_threshold)?;
        validate_threshold("word_alternatives_threshold", params.word_alternatives_threshold)?;
        if !params.keywords.is_empty() && params.keywords_threshold.is_none() {
            return Err(WatsonError::InvalidRequest(
                "keywords_threshold is required when keywords are given".to_string(),
            ));
        }

        let query = recognize_query(params);

        debug!(
            audio_bytes = audio.len(),
            content_type = %params.content_type,
            model = params.model.as_deref().unwrap_or("default"),
            "Recognizing audio"
        );

        let results: SpeechRecognitionResults = self
            .client
            .post_bytes(&[API_VERSION, "recognize"], &query, audio, &params.content_type)
            .await?;

        info!(
            results = results.results.as_ref().map_or(0, Vec::len),
            "Recognition complete"
        );

        Ok(results)
    }

    pub async fn list_models(&self) -> WatsonResult<SpeechModels> {
        self.client.get_json(&[API_VERSION, "models"], &[]).await
    }

    pub async fn get_model(&self, model_id: &str) -> WatsonResult<SpeechModel> {
        if model_id.trim().is_empty() {
            return Err(WatsonError::InvalidRequest("Model ID is required".to_string()));
        }
        validate_path_segment("Model ID", model_id)?;
        self.client.get_json(&[API_VERSION, "models", model_id], &[]).await
    }
}

fn validate_threshold(name: &str, value: Option<f64>) -> WatsonResult<()> {
    match value {
        Some(v) if !(0.0..=1.0).contains(&v) => Err(WatsonError::InvalidRequest(format!(
            "{name} must be between 0.0 and 1.0, got {v}"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn recognize_query(params: &RecognizeParams) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();

    if let Some(ref model) = params.model {
        query.push(("model", model.clone()));
    }
    if let Some(ref id) = params.customization_id {
        query.push(("customization_id", id.clone()));
    }
    if let Some(ref id) = params.acoustic_customization_id {
        query.push(("acoustic_customization_id", id.clone()));
    }
    if !params.keywords.is_empty() {
        query.push(("keywords", params.keywords.join(",")));
    }
    if let Some(v) = params.keywords_threshold {
        query.push(("keywords_threshold", v.to_string()));
    }
    if let Some(v) = params.word_alternatives_threshold {
        query.push(("word_alternatives_threshold", v.to_string()));
    }
    if let Some(v) = params.max_alternatives {
        query.push(("max_alternatives", v.to_string()));
    }

    let flags = [
        ("word_confidence", params.word_confidence),
        ("timestamps", params.timestamps),
        ("profanity_filter", params.profanity_filter),
        ("smart_formatting", params.smart_formatting),
        ("speaker_labels", params.speaker_labels),
    ];
    for (name, value) in flags {
        if let Some(v) = value {
            query.push((name, v.to_string()));
        }
    }

    if let Some(v) = params.inactivity_timeout {
        query.push(("inactivity_timeout", v.to_string()));
    }

    query
}
