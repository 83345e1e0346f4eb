//! Mock signals and inference backends for testing
//!
//! Configurable stand-ins for the inference backend and for individual
//! decision signals, used to drive the hybrid engine into specific tiers.

#![allow(dead_code)]

use async_trait::async_trait;
use smsguard_classifiers::{InferenceBackend, SpamSignal};
use smsguard_core::{ClassificationSignal, Error, Result, SignalSource};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

/// Inference backend returning a fixed score
pub struct MockBackend {
    score: f32,
    latency: Option<Duration>,
    call_count: AtomicU32,
}

impl MockBackend {
    pub fn new(score: f32) -> Self {
        Self {
            score,
            latency: None,
            call_count: AtomicU32::new(0),
        }
    }

    /// Sleep this long before answering
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceBackend for MockBackend {
    async fn predict(&self, _normalized_text: &str) -> Result<f32> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        Ok(self.score)
    }

    fn name(&self) -> &str {
        "mock_backend"
    }
}

/// Inference backend that always fails
pub struct FailingBackend {
    message: String,
}

impl FailingBackend {
    pub fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

#[async_trait]
impl InferenceBackend for FailingBackend {
    async fn predict(&self, _normalized_text: &str) -> Result<f32> {
        Err(Error::inference(self.message.clone()))
    }

    fn name(&self) -> &str {
        "failing_backend"
    }
}

/// Inference backend that records the text it was given
pub struct RecordingBackend {
    seen: parking_lot::Mutex<Vec<String>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            seen: parking_lot::Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl InferenceBackend for RecordingBackend {
    async fn predict(&self, normalized_text: &str) -> Result<f32> {
        self.seen.lock().push(normalized_text.to_string());
        Ok(0.5)
    }

    fn name(&self) -> &str {
        "recording_backend"
    }
}

/// Decision signal returning a fixed probability
pub struct FixedSignal {
    source: SignalSource,
    probability: f64,
}

impl FixedSignal {
    pub fn bayes(probability: f64) -> Self {
        Self {
            source: SignalSource::Bayes,
            probability,
        }
    }

    pub fn inference(probability: f64) -> Self {
        Self {
            source: SignalSource::Inference,
            probability,
        }
    }
}

#[async_trait]
impl SpamSignal for FixedSignal {
    async fn evaluate(&self, _text: &str) -> ClassificationSignal {
        ClassificationSignal::probability(self.source, self.probability)
    }

    fn name(&self) -> &str {
        "fixed_signal"
    }

    fn source(&self) -> SignalSource {
        self.source
    }
}

/// Keyword signal returning a fixed match set
pub struct FixedKeywords {
    matches: BTreeSet<String>,
}

impl FixedKeywords {
    pub fn none() -> Self {
        Self {
            matches: BTreeSet::new(),
        }
    }

    pub fn matching(words: &[&str]) -> Self {
        Self {
            matches: words.iter().map(|w| w.to_string()).collect(),
        }
    }
}

#[async_trait]
impl SpamSignal for FixedKeywords {
    async fn evaluate(&self, _text: &str) -> ClassificationSignal {
        ClassificationSignal::keywords(self.matches.clone())
    }

    fn name(&self) -> &str {
        "fixed_keywords"
    }

    fn source(&self) -> SignalSource {
        SignalSource::Keyword
    }
}
