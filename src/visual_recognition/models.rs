//! Visual Recognition v3 payload types.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// =============================================================================
// Classification
// =============================================================================

/// Response of a classify call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedImages {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ClassifiedImage>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_processed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_classes: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<WarningInfo>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedImage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
    /// File name of an uploaded image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<Vec<ClassifierResult>>,
}

impl ClassifiedImages {
    /// Images in the response, empty when the field was absent.
    pub fn images(&self) -> &[ClassifiedImage] {
        self.images.as_deref().unwrap_or_default()
    }
}

impl ClassifiedImage {
    pub fn classifiers(&self) -> &[ClassifierResult] {
        self.classifiers.as_deref().unwrap_or_default()
    }

    /// Highest scoring class across all classifiers.
    pub fn top_class(&self) -> Option<&ClassResult> {
        self.classifiers()
            .iter()
            .flat_map(|c| c.classes())
            .max_by(|a, b| a.score.total_cmp(&b.score))
    }
}

/// Classes returned by one classifier for one image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierResult {
    pub name: String,
    pub classifier_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassResult>>,
}

impl ClassifierResult {
    pub fn classes(&self) -> &[ClassResult] {
        self.classes.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassResult {
    #[serde(rename = "class")]
    pub class_name: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hierarchy: Option<String>,
}

// =============================================================================
// Face detection
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectedFaces {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImageWithFaces>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images_processed: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<WarningInfo>>,
}

impl DetectedFaces {
    pub fn images(&self) -> &[ImageWithFaces] {
        self.images.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageWithFaces {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faces: Option<Vec<Face>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ImageWithFaces {
    pub fn faces(&self) -> &[Face] {
        self.faces.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Face {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<FaceAge>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<FaceGender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub face_location: Option<FaceLocation>,
    /// Celebrity match, only returned by older API versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<FaceIdentity>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceAge {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    pub score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceGender {
    /// `MALE` or `FEMALE`.
    pub gender: String,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceLocation {
    pub width: f64,
    pub height: f64,
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaceIdentity {
    pub name: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_hierarchy: Option<String>,
}

// =============================================================================
// Classifiers
// =============================================================================

/// Training state of a custom classifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ClassifierStatus {
    Ready,
    Training,
    Retraining,
    Failed,
    /// A status this crate does not know about, lowercased.
    Unknown(String),
}

impl ClassifierStatus {
    /// Parse a status string, ignoring case and surrounding whitespace.
    pub fn parse(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "ready" => Self::Ready,
            "training" => Self::Training,
            "retraining" => Self::Retraining,
            "failed" => Self::Failed,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ready => "ready",
            Self::Training => "training",
            Self::Retraining => "retraining",
            Self::Failed => "failed",
            Self::Unknown(s) => s,
        }
    }

    /// Whether the service will not change this status on its own.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl std::fmt::Display for ClassifierStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ClassifierStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ClassifierStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// A custom classifier as described by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    pub classifier_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ClassifierStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrained: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classes: Option<Vec<ClassifierClass>>,
    /// Why training failed, when it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core_ml_enabled: Option<bool>,
}

impl Classifier {
    pub fn is_ready(&self) -> bool {
        self.status == Some(ClassifierStatus::Ready)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassifierClass {
    #[serde(rename = "class")]
    pub class_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classifiers {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classifiers: Option<Vec<Classifier>>,
}

impl Classifiers {
    pub fn classifiers(&self) -> &[Classifier] {
        self.classifiers.as_deref().unwrap_or_default()
    }
}

// =============================================================================
// Errors and warnings
// =============================================================================

/// Per-image error reported inside a successful response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<u16>,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WarningInfo {
    pub warning_id: String,
    pub description: String,
}

// =============================================================================
// Request parameters
// =============================================================================

/// Options shared by the classify calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClassifyParams {
    /// Classifiers to apply; the service defaults to `default`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub classifier_ids: Vec<String>,
    /// `IBM`, `me`, or both.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owners: Vec<String>,
    /// Minimum score for a class to be returned (0.0 to 1.0).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

impl ClassifyParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_classifier_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.classifier_ids = ids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_owners<I, S>(mut self, owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.owners = owners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = Some(threshold);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.classifier_ids.is_empty() && self.owners.is_empty() && self.threshold.is_none()
    }
}

/// An image uploaded in a multipart request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFile {
    pub data: bytes::Bytes,
    pub file_name: String,
    /// MIME type, e.g. `image/jpeg`, or `application/zip` for an archive.
    pub content_type: String,
}

impl ImageFile {
    pub fn new(
        data: impl Into<bytes::Bytes>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            data: data.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
        }
    }

    /// Guess the MIME type from the file extension.
    pub fn from_bytes(data: impl Into<bytes::Bytes>, file_name: impl Into<String>) -> Self {
        let file_name = file_name.into();
        let content_type = mime_for_file_name(&file_name).to_string();
        Self::new(data, file_name, content_type)
    }
}

pub(crate) fn mime_for_file_name(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "tif" | "tiff" => "image/tiff",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}
