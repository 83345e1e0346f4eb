//! Adapter around the external numeric inference backend
//!
//! The backend (model runtime plus its tokenizer and vocabulary) is opaque:
//! all that is known is `predict(normalized_text) -> f32`. It may fail, hang,
//! or return garbage. The adapter turns every one of those outcomes into the
//! neutral probability so callers always get a usable score in [0,1].

use crate::signal::SpamSignal;
use async_trait::async_trait;
use smsguard_core::{ClassificationSignal, Error, Result, SignalSource, NEUTRAL_PROBABILITY};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default upper bound on a single prediction
pub const DEFAULT_INFERENCE_TIMEOUT: Duration = Duration::from_secs(2);

/// External numeric spam model
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Raw spam score for already-normalized text
    async fn predict(&self, normalized_text: &str) -> Result<f32>;

    /// Backend name for logging
    fn name(&self) -> &str;
}

/// Backend used when no model is loaded; always neutral
#[derive(Debug, Default, Clone, Copy)]
pub struct NeutralBackend;

#[async_trait]
impl InferenceBackend for NeutralBackend {
    async fn predict(&self, _normalized_text: &str) -> Result<f32> {
        Ok(NEUTRAL_PROBABILITY as f32)
    }

    fn name(&self) -> &str {
        "neutral"
    }
}

/// Wraps a synchronous, possibly slow predictor so it runs on the blocking pool
pub struct BlockingBackend<F> {
    name: String,
    predictor: Arc<F>,
}

impl<F> BlockingBackend<F>
where
    F: Fn(&str) -> Result<f32> + Send + Sync + 'static,
{
    /// Create a new blocking backend
    pub fn new(name: impl Into<String>, predictor: F) -> Self {
        Self {
            name: name.into(),
            predictor: Arc::new(predictor),
        }
    }
}

#[async_trait]
impl<F> InferenceBackend for BlockingBackend<F>
where
    F: Fn(&str) -> Result<f32> + Send + Sync + 'static,
{
    async fn predict(&self, normalized_text: &str) -> Result<f32> {
        let predictor = Arc::clone(&self.predictor);
        let text = normalized_text.to_string();
        tokio::task::spawn_blocking(move || predictor(&text))
            .await
            .map_err(|e| Error::inference(format!("Blocking predictor panicked: {}", e)))?
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Why a prediction was replaced with the neutral value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Error,
    Timeout,
    NonFinite,
}

impl Fallback {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Timeout => "timeout",
            Self::NonFinite => "non_finite",
        }
    }
}

/// Bounded-time, never-failing view of an [`InferenceBackend`]
pub struct InferenceAdapter {
    backend: Arc<dyn InferenceBackend>,
    timeout: Duration,
}

impl InferenceAdapter {
    /// Create an adapter with the default timeout
    pub fn new(backend: Arc<dyn InferenceBackend>) -> Self {
        Self {
            backend,
            timeout: DEFAULT_INFERENCE_TIMEOUT,
        }
    }

    /// Adapter for deployments without a model
    pub fn neutral() -> Self {
        Self::new(Arc::new(NeutralBackend))
    }

    /// Override the prediction timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Configured timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Spam score in [0,1]; neutral on blank input, error, timeout, or non-finite output
    pub async fn score(&self, text: &str) -> f64 {
        if text.trim().is_empty() {
            return NEUTRAL_PROBABILITY;
        }

        let raw = match tokio::time::timeout(self.timeout, self.backend.predict(text)).await {
            Ok(Ok(value)) => value as f64,
            Ok(Err(e)) => {
                warn!("Inference backend {} failed: {}", self.backend.name(), e);
                return self.fallback(Fallback::Error);
            }
            Err(_) => {
                warn!(
                    "Inference backend {} exceeded {:?}",
                    self.backend.name(),
                    self.timeout
                );
                return self.fallback(Fallback::Timeout);
            }
        };

        if !raw.is_finite() {
            warn!("Inference backend {} returned {}", self.backend.name(), raw);
            return self.fallback(Fallback::NonFinite);
        }

        let score = raw.clamp(0.0, 1.0);
        debug!(backend = self.backend.name(), raw, score, "Inference score");
        score
    }

    fn fallback(&self, reason: Fallback) -> f64 {
        metrics::counter!("smsguard_inference_fallbacks_total", "reason" => reason.as_str())
            .increment(1);
        NEUTRAL_PROBABILITY
    }
}

#[async_trait]
impl SpamSignal for InferenceAdapter {
    async fn evaluate(&self, text: &str) -> ClassificationSignal {
        ClassificationSignal::probability(SignalSource::Inference, self.score(text).await)
    }

    fn name(&self) -> &str {
        self.backend.name()
    }

    fn source(&self) -> SignalSource {
        SignalSource::Inference
    }
}
