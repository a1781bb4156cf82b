//! IBM Watson Speech-to-Text v1.
//!
//! Sessionless recognition over HTTP: a complete audio file is posted as the
//! request body and the service answers with the final transcripts.
//!
//! # Features
//!
//! - Alternative transcripts with confidence scores
//! - Word-level timestamps and confidences
//! - Keyword spotting (`keywords` + `keywords_threshold`)
//! - Word alternatives (`word_alternatives_threshold`)
//! - Model listing and lookup
//!
//! # Audio Formats
//!
//! The `content_type` of [`RecognizeParams`] is forwarded verbatim, e.g.
//! `audio/wav`, `audio/flac`, `audio/ogg;codecs=opus`, `audio/l16;rate=16000`.
//!
//! # References
//!
//! - [API Reference](https://cloud.ibm.com/apidocs/speech-to-text)

pub mod models;
mod service;

pub use models::{
    KeywordResult, RecognizeParams, SpeechModel, SpeechModels, SpeechRecognitionAlternative,
    SpeechRecognitionResult, SpeechRecognitionResults, SupportedFeatures, WordAlternativeResult,
    WordAlternativeResults, WordConfidence, WordTimestamp,
};
pub use service::SpeechToTextService;

/// Speech recognition model used when none is requested.
pub const DEFAULT_MODEL: &str = "en-US_BroadbandModel";
