//! Visual Recognition v3 service client.

use std::collections::BTreeMap;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use super::models::{ClassifiedImages, Classifier, Classifiers, ClassifyParams, DetectedFaces, ImageFile};
use crate::config::{ServiceConfig, ServiceKind};
use crate::error::{WatsonError, WatsonResult};
use crate::http::{WatsonClient, validate_path_segment};

const API_VERSION: &str = "v3";
const ZIP_MIME: &str = "application/zip";

/// Training archives for creating or updating a classifier.
///
/// Each positive set is a zip of images of one class; the optional negative
/// set is a zip of images that match none of the classes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassifierExamples {
    pub positive: BTreeMap<String, Bytes>,
    pub negative: Option<Bytes>,
}

impl ClassifierExamples {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positive(mut self, class_name: impl Into<String>, zip: impl Into<Bytes>) -> Self {
        self.positive.insert(class_name.into(), zip.into());
        self
    }

    pub fn with_negative(mut self, zip: impl Into<Bytes>) -> Self {
        self.negative = Some(zip.into());
        self
    }

    /// Number of archives that will be uploaded.
    pub fn example_set_count(&self) -> usize {
        self.positive.len() + usize::from(self.negative.is_some())
    }

    fn validate(&self) -> WatsonResult<()> {
        for (class_name, zip) in &self.positive {
            if class_name.trim().is_empty() || class_name.chars().any(char::is_whitespace) {
                return Err(WatsonError::InvalidRequest(format!(
                    "Invalid class name '{class_name}': must be non-empty without whitespace"
                )));
            }
            if zip.is_empty() {
                return Err(WatsonError::InvalidRequest(format!(
                    "Positive examples for class '{class_name}' are empty"
                )));
            }
        }
        if self.negative.as_ref().is_some_and(Bytes::is_empty) {
            return Err(WatsonError::InvalidRequest(
                "Negative examples are empty".to_string(),
            ));
        }
        Ok(())
    }

    fn append_to(self, mut form: Form) -> WatsonResult<Form> {
        for (class_name, zip) in self.positive {
            let part = zip_part(zip, format!("{class_name}_positive_examples.zip"))?;
            form = form.part(format!("{class_name}_positive_examples"), part);
        }
        if let Some(zip) = self.negative {
            form = form.part("negative_examples", zip_part(zip, "negative_examples.zip".to_string())?);
        }
        Ok(form)
    }
}

fn zip_part(zip: Bytes, file_name: String) -> WatsonResult<Part> {
    Part::bytes(zip.to_vec())
        .file_name(file_name)
        .mime_str(ZIP_MIME)
        .map_err(|e| WatsonError::InvalidRequest(format!("Invalid MIME type: {e}")))
}

fn image_part(image: ImageFile) -> WatsonResult<Part> {
    if image.data.is_empty() {
        return Err(WatsonError::InvalidRequest("Image data must not be empty".to_string()));
    }
    Part::bytes(image.data.to_vec())
        .file_name(image.file_name)
        .mime_str(&image.content_type)
        .map_err(|e| WatsonError::InvalidRequest(format!("Invalid MIME type: {e}")))
}

/// Client for the Visual Recognition v3 API.
///
/// # Example
///
/// ```rust,no_run
/// use watson_sdk::config::ServiceConfig;
/// use watson_sdk::visual_recognition::{ClassifyParams, VisualRecognitionService};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ServiceConfig::for_service(watson_sdk::config::ServiceKind::VisualRecognition)
///         .with_api_key(std::env::var("VISUAL_RECOGNITION_API_KEY")?);
///     let service = VisualRecognitionService::new(config)?;
///
///     let params = ClassifyParams::new()
///         .with_classifier_ids(["default"])
///         .with_owners(["IBM", "me"]);
///     let result = service.classify("https://example.com/cat.jpg", &params).await?;
///
///     for image in result.images() {
///         if let Some(class) = image.top_class() {
///             println!("{} ({:.2})", class.class_name, class.score);
///         }
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct VisualRecognitionService {
    client: WatsonClient,
}

impl VisualRecognitionService {
    pub fn new(config: ServiceConfig) -> WatsonResult<Self> {
        Ok(Self {
            client: WatsonClient::new(config)?,
        })
    }

    /// Build a client from `VISUAL_RECOGNITION_*` environment variables.
    pub fn from_env() -> WatsonResult<Self> {
        Self::new(ServiceConfig::from_env(ServiceKind::VisualRecognition)?)
    }

    pub fn from_client(client: WatsonClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &WatsonClient {
        &self.client
    }

    // -------------------------------------------------------------------------
    // Classification
    // -------------------------------------------------------------------------

    /// Classify the image at `image_url`.
    pub async fn classify(&self, image_url: &str, params: &ClassifyParams) -> WatsonResult<ClassifiedImages> {
        validate_image_url(image_url)?;
        validate_classify_params(params)?;

        let mut query = vec![("url", image_url.to_string())];
        query.extend(classify_query(params));

        debug!(url = image_url, "Classifying image by URL");
        self.client.get_json(&[API_VERSION, "classify"], &query).await
    }

    /// Classify an uploaded image or zip of images.
    pub async fn classify_image(&self, image: ImageFile, params: &ClassifyParams) -> WatsonResult<ClassifiedImages> {
        validate_classify_params(params)?;

        debug!(file_name = %image.file_name, bytes = image.data.len(), "Classifying uploaded image");

        let mut form = Form::new().part("images_file", image_part(image)?);
        if !params.is_empty() {
            let parameters = serde_json::to_string(params)?;
            let part = Part::text(parameters)
                .mime_str("application/json")
                .map_err(|e| WatsonError::InvalidRequest(format!("Invalid MIME type: {e}")))?;
            form = form.part("parameters", part);
        }

        self.client
            .post_multipart(&[API_VERSION, "classify"], &[], form)
            .await
    }

    // -------------------------------------------------------------------------
    // Face detection
    // -------------------------------------------------------------------------

    pub async fn detect_faces(&self, image_url: &str) -> WatsonResult<DetectedFaces> {
        validate_image_url(image_url)?;

        debug!(url = image_url, "Detecting faces by URL");
        self.client
            .get_json(&[API_VERSION, "detect_faces"], &[("url", image_url.to_string())])
            .await
    }

    pub async fn detect_faces_image(&self, image: ImageFile) -> WatsonResult<DetectedFaces> {
        debug!(file_name = %image.file_name, bytes = image.data.len(), "Detecting faces in uploaded image");

        let form = Form::new().part("images_file", image_part(image)?);
        self.client
            .post_multipart(&[API_VERSION, "detect_faces"], &[], form)
            .await
    }

    // -------------------------------------------------------------------------
    // Classifiers
    // -------------------------------------------------------------------------

    /// List custom classifiers with names, IDs and status only.
    pub async fn get_classifiers_brief(&self) -> WatsonResult<Classifiers> {
        self.client.get_json(&[API_VERSION, "classifiers"], &[]).await
    }

    /// List custom classifiers with full details.
    pub async fn get_classifiers_verbose(&self) -> WatsonResult<Classifiers> {
        self.client
            .get_json(&[API_VERSION, "classifiers"], &[("verbose", "true".to_string())])
            .await
    }

    /// Train a new classifier.
    ///
    /// Needs at least two archives: two positive classes, or one positive
    /// class plus negative examples.
    pub async fn create_classifier(&self, name: &str, examples: ClassifierExamples) -> WatsonResult<Classifier> {
        if name.trim().is_empty() {
            return Err(WatsonError::InvalidRequest("Classifier name is required".to_string()));
        }
        if examples.positive.is_empty() {
            return Err(WatsonError::InvalidRequest(
                "At least one set of positive examples is required".to_string(),
            ));
        }
        if examples.example_set_count() < 2 {
            return Err(WatsonError::InvalidRequest(
                "Provide two positive example sets, or one positive and one negative set".to_string(),
            ));
        }
        examples.validate()?;

        let classes: Vec<&str> = examples.positive.keys().map(String::as_str).collect();
        info!(name = name, classes = ?classes, "Creating classifier");

        let form = examples.append_to(Form::new().text("name", name.to_string()))?;
        let classifier: Classifier = self
            .client
            .post_multipart(&[API_VERSION, "classifiers"], &[], form)
            .await?;

        info!(classifier_id = %classifier.classifier_id, "Created classifier");
        Ok(classifier)
    }

    pub async fn get_classifier(&self, classifier_id: &str) -> WatsonResult<Classifier> {
        validate_classifier_id(classifier_id)?;
        self.client
            .get_json(&[API_VERSION, "classifiers", classifier_id], &[])
            .await
    }

    /// Add classes or examples to an existing classifier, which retrains it.
    pub async fn update_classifier(
        &self,
        classifier_id: &str,
        examples: ClassifierExamples,
    ) -> WatsonResult<Classifier> {
        validate_classifier_id(classifier_id)?;
        if examples.example_set_count() == 0 {
            return Err(WatsonError::InvalidRequest(
                "At least one set of examples is required to update a classifier".to_string(),
            ));
        }
        examples.validate()?;

        info!(classifier_id = classifier_id, "Updating classifier");

        let form = examples.append_to(Form::new())?;
        self.client
            .post_multipart(&[API_VERSION, "classifiers", classifier_id], &[], form)
            .await
    }

    pub async fn delete_classifier(&self, classifier_id: &str) -> WatsonResult<()> {
        validate_classifier_id(classifier_id)?;

        self.client
            .delete(&[API_VERSION, "classifiers", classifier_id], &[])
            .await?;

        info!(classifier_id = classifier_id, "Deleted classifier");
        Ok(())
    }
}

fn validate_image_url(image_url: &str) -> WatsonResult<()> {
    let parsed = url::Url::parse(image_url)
        .map_err(|e| WatsonError::InvalidRequest(format!("Invalid image URL '{image_url}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(WatsonError::InvalidRequest(format!(
            "Image URL must use http or https, got: {}",
            parsed.scheme()
        )));
    }
    Ok(())
}

fn validate_classify_params(params: &ClassifyParams) -> WatsonResult<()> {
    match params.threshold {
        Some(t) if !(0.0..=1.0).contains(&t) => Err(WatsonError::InvalidRequest(format!(
            "threshold must be between 0.0 and 1.0, got {t}"
        ))),
        _ => Ok(()),
    }
}

pub(crate) fn validate_classifier_id(classifier_id: &str) -> WatsonResult<()> {
    if classifier_id.trim().is_empty() {
        return Err(WatsonError::InvalidRequest("Classifier ID is required".to_string()));
    }
    validate_path_segment("Classifier ID", classifier_id)
}

pub(crate) fn classify_query(params: &ClassifyParams) -> Vec<(&'static str, String)> {
    let mut query = Vec::new();
    if !params.classifier_ids.is_empty() {
        query.push(("classifier_ids", params.classifier_ids.join(",")));
    }
    if !params.owners.is_empty() {
        query.push(("owners", params.owners.join(",")));
    }
    if let Some(threshold) = params.threshold {
        query.push(("threshold", threshold.to_string()));
    }
    query
}
