//! Speech-to-Text v1 payload types.
//!
//! Every optional field is `None` when absent from the response and is
//! omitted again on serialization, so a value round-trips to the same JSON
//! shape it came from.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// =============================================================================
// Recognition results
// =============================================================================

/// Response of a `recognize` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechRecognitionResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<SpeechRecognitionResult>>,
    /// Index of the first result in `results` within the whole session.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}

impl SpeechRecognitionResults {
    /// Concatenated best transcript of all final results.
    pub fn transcript(&self) -> String {
        self.results
            .iter()
            .flatten()
            .filter(|r| r.is_final())
            .filter_map(|r| r.best_alternative())
            .map(|alt| alt.transcript.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// One utterance of recognized speech.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechRecognitionResult {
    /// Whether the results for this utterance will not be updated further.
    #[serde(rename = "final", default, skip_serializing_if = "Option::is_none")]
    pub final_results: Option<bool>,
    /// Alternative transcripts, best first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Vec<SpeechRecognitionAlternative>>,
    /// Spotted keywords, keyed by the requested keyword string. Keywords
    /// without matches are absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords_result: Option<BTreeMap<String, Vec<KeywordResult>>>,
    /// Alternative hypotheses for individual words.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_alternatives: Option<Vec<WordAlternativeResults>>,
}

impl SpeechRecognitionResult {
    pub fn is_final(&self) -> bool {
        self.final_results.unwrap_or(false)
    }

    pub fn best_alternative(&self) -> Option<&SpeechRecognitionAlternative> {
        self.alternatives.as_ref().and_then(|alts| alts.first())
    }

    /// Occurrences of `keyword`, empty when it was not spotted.
    pub fn keyword_hits(&self, keyword: &str) -> &[KeywordResult] {
        self.keywords_result
            .as_ref()
            .and_then(|map| map.get(keyword))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// A transcript hypothesis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechRecognitionAlternative {
    pub transcript: String,
    /// Only present for final results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    /// `[word, start, end]` triples.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamps: Option<Vec<WordTimestamp>>,
    /// `[word, confidence]` pairs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub word_confidence: Option<Vec<WordConfidence>>,
}

/// Word-level timestamp `[word, start_time, end_time]`.
pub type WordTimestamp = (String, f64, f64);

/// Word-level confidence `[word, confidence]`.
pub type WordConfidence = (String, f64);

/// A spotted keyword occurrence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KeywordResult {
    /// The keyword as it appears in the transcript.
    pub normalized_text: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
}

/// Alternatives for a span of audio.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordAlternativeResults {
    pub start_time: f64,
    pub end_time: f64,
    pub alternatives: Vec<WordAlternativeResult>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WordAlternativeResult {
    pub confidence: f64,
    pub word: String,
}

// =============================================================================
// Models
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechModels {
    pub models: Vec<SpeechModel>,
}

/// A recognition model offered by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeechModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Sampling rate in Hz.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supported_features: Option<SupportedFeatures>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sessions: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SupportedFeatures {
    pub custom_language_model: bool,
    pub speaker_labels: bool,
}

// =============================================================================
// Request parameters
// =============================================================================

/// Options for a `recognize` call.
///
/// Only the fields that are set end up in the query string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecognizeParams {
    /// MIME type of the audio, e.g. `audio/wav` or `audio/l16;rate=16000`.
    pub content_type: String,
    pub model: Option<String>,
    pub customization_id: Option<String>,
    pub acoustic_customization_id: Option<String>,
    pub keywords: Vec<String>,
    /// Minimum confidence for a keyword hit (0.0 to 1.0).
    pub keywords_threshold: Option<f64>,
    /// Minimum confidence for a word alternative (0.0 to 1.0).
    pub word_alternatives_threshold: Option<f64>,
    pub max_alternatives: Option<u32>,
    pub word_confidence: Option<bool>,
    pub timestamps: Option<bool>,
    pub profanity_filter: Option<bool>,
    pub smart_formatting: Option<bool>,
    pub speaker_labels: Option<bool>,
    /// Seconds of silence after which the service closes the session.
    pub inactivity_timeout: Option<i32>,
}

impl RecognizeParams {
    pub fn new(content_type: impl Into<String>) -> Self {
        Self {
            content_type: content_type.into(),
            ..Default::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I, threshold: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self.keywords_threshold = Some(threshold);
        self
    }

    pub fn with_word_alternatives_threshold(mut self, threshold: f64) -> Self {
        self.word_alternatives_threshold = Some(threshold);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULT_JSON: &str = r#"{
        "results": [
            {
                "final": true,
                "alternatives": [
                    {
                        "transcript": "thunderstorms could produce large hail ",
                        "confidence": 0.89,
                        "timestamps": [["thunderstorms", 1.49, 2.32], ["could", 2.32, 2.54]],
                        "word_confidence": [["thunderstorms", 0.95], ["could", 1.0]]
                    },
                    {"transcript": "thunderstorms could produce large hell "}
                ],
                "keywords_result": {
                    "hail": [
                        {"normalized_text": "hail", "start_time": 3.5, "end_time": 3.9, "confidence": 0.98}
                    ]
                },
                "word_alternatives": [
                    {
                        "start_time": 3.5,
                        "end_time": 3.9,
                        "alternatives": [
                            {"confidence": 0.98, "word": "hail"},
                            {"confidence": 0.02, "word": "hell"}
                        ]
                    }
                ]
            }
        ],
        "result_index": 0
    }"#;

    #[test]
    fn test_parse_full_result() {
        let results: SpeechRecognitionResults = serde_json::from_str(RESULT_JSON).unwrap();
        let result = &results.results.as_ref().unwrap()[0];

        assert_eq!(result.final_results, Some(true));
        assert!(result.is_final());

        let best = result.best_alternative().unwrap();
        assert!((best.confidence.unwrap() - 0.89).abs() < f64::EPSILON);
        let timestamps = best.timestamps.as_ref().unwrap();
        assert_eq!(timestamps[0].0, "thunderstorms");
        assert!((timestamps[0].2 - 2.32).abs() < 1e-9);

        let hits = result.keyword_hits("hail");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].normalized_text, "hail");
        assert!(result.keyword_hits("tornado").is_empty());

        let alternatives = result.word_alternatives.as_ref().unwrap();
        assert_eq!(alternatives[0].alternatives[1].word, "hell");

        assert_eq!(results.transcript(), "thunderstorms could produce large hail");
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let result: SpeechRecognitionResult =
            serde_json::from_str(r#"{"alternatives": [{"transcript": "hi"}]}"#).unwrap();
        assert!(result.final_results.is_none());
        assert!(result.keywords_result.is_none());
        assert!(result.word_alternatives.is_none());

        let json = serde_json::to_value(&result).unwrap();
        let object = json.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert!(!object.contains_key("final"));
        assert!(!object["alternatives"][0].as_object().unwrap().contains_key("confidence"));
    }

    #[test]
    fn test_final_is_renamed_on_output() {
        let result = SpeechRecognitionResult {
            final_results: Some(false),
            ..Default::default()
        };
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"final":false}"#);
    }

    #[test]
    fn test_interim_results_are_skipped_in_transcript() {
        let results: SpeechRecognitionResults = serde_json::from_str(
            r#"{"results": [
                {"final": false, "alternatives": [{"transcript": "hel"}]},
                {"final": true, "alternatives": [{"transcript": "hello "}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(results.transcript(), "hello");
        assert_eq!(SpeechRecognitionResults::default().transcript(), "");
    }

    #[test]
    fn test_parse_models() {
        let models: SpeechModels = serde_json::from_str(
            r#"{"models": [{
                "name": "en-US_BroadbandModel",
                "language": "en-US",
                "rate": 16000,
                "url": "https://stream.watsonplatform.net/speech-to-text/api/v1/models/en-US_BroadbandModel",
                "supported_features": {"custom_language_model": true, "speaker_labels": true},
                "description": "US English broadband model."
            }]}"#,
        )
        .unwrap();
        let model = &models.models[0];
        assert_eq!(model.rate, Some(16000));
        assert!(model.supported_features.as_ref().unwrap().speaker_labels);
    }

    #[test]
    fn test_params_builder() {
        let params = RecognizeParams::new("audio/wav")
            .with_model("en-US_BroadbandModel")
            .with_keywords(["hail", "tornado"], 0.5)
            .with_word_alternatives_threshold(0.9);
        assert_eq!(params.keywords, vec!["hail", "tornado"]);
        assert_eq!(params.keywords_threshold, Some(0.5));
        assert_eq!(params.word_alternatives_threshold, Some(0.9));
    }
}
