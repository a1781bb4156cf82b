//! Polling a classifier until training settles.
//!
//! Training happens asynchronously on the service. The poll re-reads the
//! classifier at a fixed interval until it reaches the wanted status, fails,
//! or the attempt/time budget runs out. Dropping the returned future stops
//! the poll.

use std::time::Duration;

use tokio::time::{Instant, sleep, timeout_at};
use tracing::{debug, info, warn};

use super::models::{Classifier, ClassifierStatus};
use super::service::{VisualRecognitionService, validate_classifier_id};
use crate::error::{WatsonError, WatsonResult};

/// Default delay between two status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default number of status checks before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 120;

/// Default overall time budget.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(30 * 60);

/// Bounds for [`VisualRecognitionService::wait_for_classifier_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollOptions {
    pub interval: Duration,
    pub max_attempts: u32,
    pub timeout: Duration,
}

impl Default for PollOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_POLL_TIMEOUT,
        }
    }
}

impl PollOptions {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl VisualRecognitionService {
    /// Poll `classifier_id` until its status equals `target`.
    ///
    /// Returns [`WatsonError::ClassifierFailed`] if the classifier enters the
    /// `failed` state while waiting for anything else, and
    /// [`WatsonError::Timeout`] when the attempts or the time budget are
    /// exhausted.
    pub async fn wait_for_classifier_status(
        &self,
        classifier_id: &str,
        target: ClassifierStatus,
        options: PollOptions,
    ) -> WatsonResult<Classifier> {
        validate_classifier_id(classifier_id)?;
        if options.max_attempts == 0 {
            return Err(WatsonError::InvalidRequest(
                "max_attempts must be at least 1".to_string(),
            ));
        }

        let deadline = Instant::now() + options.timeout;

        for attempt in 1..=options.max_attempts {
            let classifier = timeout_at(deadline, self.get_classifier(classifier_id))
                .await
                .map_err(|_| timed_out(classifier_id, options.timeout))??;

            let status = classifier
                .status
                .clone()
                .unwrap_or_else(|| ClassifierStatus::Unknown(String::new()));

            info!(
                classifier_id = classifier_id,
                status = %status,
                attempt = attempt,
                "Classifier status"
            );

            if status == target {
                return Ok(classifier);
            }

            if status == ClassifierStatus::Failed {
                let reason = classifier
                    .explanation
                    .unwrap_or_else(|| format!("classifier {classifier_id} failed training"));
                warn!(classifier_id = classifier_id, reason = %reason, "Classifier training failed");
                return Err(WatsonError::ClassifierFailed(reason));
            }

            if attempt == options.max_attempts {
                break;
            }

            if Instant::now() + options.interval > deadline {
                return Err(timed_out(classifier_id, options.timeout));
            }

            debug!(delay_ms = options.interval.as_millis() as u64, "Waiting before next status check");
            sleep(options.interval).await;
        }

        Err(WatsonError::Timeout(format!(
            "classifier {classifier_id} did not reach '{target}' after {} attempts",
            options.max_attempts
        )))
    }

    /// Shorthand for waiting until the classifier is `ready`.
    pub async fn wait_until_ready(&self, classifier_id: &str, options: PollOptions) -> WatsonResult<Classifier> {
        self.wait_for_classifier_status(classifier_id, ClassifierStatus::Ready, options)
            .await
    }
}

fn timed_out(classifier_id: &str, budget: Duration) -> WatsonError {
    WatsonError::Timeout(format!(
        "classifier {classifier_id} status poll exceeded {}s",
        budget.as_secs()
    ))
}
