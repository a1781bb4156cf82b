//! IBM Watson Visual Recognition v3.
//!
//! # Features
//!
//! - Classify images by URL or upload against built-in and custom classifiers
//! - Detect faces with age and gender estimates
//! - Train, retrain, inspect and delete custom classifiers
//! - Wait for a classifier to finish training
//!
//! # Classifier lifecycle
//!
//! ```text
//! create_classifier ──▶ training ──▶ ready ──update_classifier──▶ retraining ──▶ ready
//!                           │                                          │
//!                           └──────────────▶ failed ◀──────────────────┘
//! ```
//!
//! Deleting a classifier within roughly ten seconds of creating it can make
//! it disappear without a proper delete on the service side; callers that
//! create and immediately delete should wait first.
//!
//! # References
//!
//! - [API Reference](https://cloud.ibm.com/apidocs/visual-recognition/visual-recognition-v3)

pub mod models;
mod readiness;
mod service;

pub use models::{
    ClassResult, ClassifiedImage, ClassifiedImages, Classifier, ClassifierClass, ClassifierResult,
    ClassifierStatus, Classifiers, ClassifyParams, DetectedFaces, ErrorInfo, Face, FaceAge,
    FaceGender, FaceIdentity, FaceLocation, ImageFile, ImageWithFaces, WarningInfo,
};
pub use readiness::{DEFAULT_MAX_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT, PollOptions};
pub use service::{ClassifierExamples, VisualRecognitionService};
