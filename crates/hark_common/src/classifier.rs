//! Semantic Classifier Adapter v0.3.0
//!
//! Wraps an external zero-shot classification backend behind a trait, with a
//! real HTTP implementation and a fake client for testing.
//!
//! Zero-shot classification always ranks the full label set; "no intent
//! found" is not an outcome of this stage. A low top confidence is the
//! arbiter's problem, not the classifier's.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Classifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Minimum top confidence the arbiter accepts for a semantic-only
    /// decision. Carried here so the handle and its policy travel together.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

fn default_endpoint() -> String {
    "http://localhost:8000".to_string()
}

fn default_model() -> String {
    "facebook/bart-large-mnli".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_threshold() -> f64 {
    0.5
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
            threshold: default_threshold(),
        }
    }
}

/// Classifier errors.
///
/// `EmptyInput` is recoverable per utterance; the others mean the backend
/// itself is unusable and are fatal to the process at startup.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ClassifierError {
    #[error("empty transcript or empty label set")]
    EmptyInput,

    #[error("classifier backend unreachable: {0}")]
    Unavailable(String),

    #[error("classifier request timeout after {0} seconds")]
    Timeout(u64),

    #[error("invalid classifier response: {0}")]
    InvalidResponse(String),
}

/// Ranked zero-shot result. `ranked` covers the full label set in
/// descending confidence; `intent`/`confidence` mirror its head.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub intent: String,
    pub confidence: f64,
    pub ranked: Vec<(String, f64)>,
}

impl ClassificationResult {
    /// Build from parallel label/score lists, re-sorting defensively by
    /// descending score. Sort is stable, so equal scores keep backend order.
    pub fn from_ranked(mut ranked: Vec<(String, f64)>) -> Result<Self, ClassifierError> {
        if ranked.is_empty() {
            return Err(ClassifierError::InvalidResponse(
                "backend returned no labels".to_string(),
            ));
        }
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        let (intent, confidence) = ranked[0].clone();
        Ok(Self {
            intent,
            confidence,
            ranked,
        })
    }
}

/// Zero-shot classification handle. One instance per process, injected into
/// the arbiter; no process-wide singleton.
pub trait IntentClassifier: Send + Sync {
    fn classify(&self, text: &str, labels: &[String])
        -> Result<ClassificationResult, ClassifierError>;
}

/// Real implementation against an HTTP zero-shot endpoint
/// (HF-inference-style: POST {inputs, parameters.candidate_labels} ->
/// {labels, scores}).
pub struct HttpClassifier {
    config: ClassifierConfig,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f64>,
}

impl HttpClassifier {
    pub fn new(config: ClassifierConfig) -> Result<Self, ClassifierError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ClassifierError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { config, client })
    }
}

impl IntentClassifier for HttpClassifier {
    fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<ClassificationResult, ClassifierError> {
        if text.trim().is_empty() || labels.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let url = format!("{}/models/{}", self.config.endpoint, self.config.model);
        let request_body = serde_json::json!({
            "inputs": text,
            "parameters": { "candidate_labels": labels },
        });

        let response = self
            .client
            .post(&url)
            .json(&request_body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ClassifierError::Timeout(self.config.timeout_secs)
                } else {
                    ClassifierError::Unavailable(format!("request failed: {e}"))
                }
            })?;

        if !response.status().is_success() {
            return Err(ClassifierError::Unavailable(format!(
                "HTTP {} from classifier backend",
                response.status()
            )));
        }

        let body: ZeroShotResponse = response
            .json()
            .map_err(|e| ClassifierError::InvalidResponse(format!("failed to parse response: {e}")))?;

        if body.labels.len() != body.scores.len() {
            return Err(ClassifierError::InvalidResponse(format!(
                "{} labels but {} scores",
                body.labels.len(),
                body.scores.len()
            )));
        }

        let result = ClassificationResult::from_ranked(
            body.labels.into_iter().zip(body.scores).collect(),
        )?;
        tracing::debug!(
            intent = %result.intent,
            confidence = result.confidence,
            "zero-shot classification"
        );
        Ok(result)
    }
}

/// Fake classifier for tests: queued responses plus a call counter.
pub struct FakeClassifier {
    responses: std::sync::Mutex<Vec<Result<ClassificationResult, ClassifierError>>>,
    call_count: std::sync::Mutex<usize>,
}

impl FakeClassifier {
    pub fn new(responses: Vec<Result<ClassificationResult, ClassifierError>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses),
            call_count: std::sync::Mutex::new(0),
        }
    }

    /// A fake that always returns `intent` at `confidence`, with any other
    /// labels it is asked about implicitly absent from the ranking.
    pub fn always(intent: &str, confidence: f64) -> Self {
        Self::new(vec![Ok(ClassificationResult {
            intent: intent.to_string(),
            confidence,
            ranked: vec![(intent.to_string(), confidence)],
        })])
    }

    pub fn always_error(error: ClassifierError) -> Self {
        Self::new(vec![Err(error)])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl IntentClassifier for FakeClassifier {
    fn classify(
        &self,
        text: &str,
        labels: &[String],
    ) -> Result<ClassificationResult, ClassifierError> {
        if text.trim().is_empty() || labels.is_empty() {
            return Err(ClassifierError::EmptyInput);
        }

        let mut count = self.call_count.lock().unwrap();
        *count += 1;

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ClassifierError::Unavailable("no responses queued".to_string()));
        }
        if responses.len() == 1 {
            responses[0].clone()
        } else {
            responses.remove(0)
        }
    }
}
