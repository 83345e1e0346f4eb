//! Hybrid decision engine tests
//!
//! Drives the engine with fixed signals to check tier ordering and fusion,
//! and with the real Bayes, inference, and keyword components to check the
//! wiring between them.

mod common;

use common::{FailingBackend, FixedKeywords, FixedSignal, MockBackend, RecordingBackend};
use smsguard_classifiers::{
    HybridDecisionEngine, InferenceAdapter, NaiveBayesClassifier, SpamKeywords, WordModel,
};
use std::sync::Arc;
use std::time::Duration;

fn fixed_engine(ml: f64, bayes: f64, keywords: FixedKeywords) -> HybridDecisionEngine {
    HybridDecisionEngine::new(
        Arc::new(FixedSignal::bayes(bayes)),
        Arc::new(FixedSignal::inference(ml)),
        Arc::new(keywords),
    )
    .unwrap()
}

fn trained_model() -> Arc<WordModel> {
    let model = Arc::new(WordModel::new());
    let bayes = NaiveBayesClassifier::new(model.clone()).unwrap();
    for text in [
        "win a free prize now",
        "claim your cash reward",
        "urgent prize claim call now",
        "free entry to win cash",
    ] {
        bayes.train_spam(text);
    }
    for text in [
        "are we still on for lunch",
        "running late see you soon",
        "can you pick up milk",
        "call me when you land",
    ] {
        bayes.train_ham(text);
    }
    model
}

fn real_engine(model: Arc<WordModel>, backend_score: f32) -> HybridDecisionEngine {
    HybridDecisionEngine::new(
        Arc::new(NaiveBayesClassifier::new(model).unwrap()),
        Arc::new(InferenceAdapter::new(Arc::new(MockBackend::new(backend_score)))),
        Arc::new(SpamKeywords::detector().unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_confident_ml_overrides_low_bayes() {
    let engine = fixed_engine(0.9, 0.1, FixedKeywords::none());
    let result = engine.classify("anything").await;

    assert!(result.is_spam);
    assert_eq!(result.decided_by.as_deref(), Some("ml_confident"));
    assert!((result.final_probability - 0.74).abs() < 1e-9);
    assert_eq!(result.ml_confidence, 0.9);
    assert_eq!(result.bayesian_confidence, 0.1);
}

#[tokio::test]
async fn test_keywords_need_probability_support() {
    let supported = fixed_engine(0.3, 0.6, FixedKeywords::matching(&["prize"]));
    let result = supported.classify("prize").await;
    assert!(result.is_spam);
    assert_eq!(result.decided_by.as_deref(), Some("keywords_supported"));

    let unsupported = fixed_engine(0.3, 0.4, FixedKeywords::matching(&["prize"]));
    let result = unsupported.classify("prize").await;
    assert!(!result.is_spam);
    assert!(result.matched_keywords.contains("prize"));
}

#[tokio::test]
async fn test_non_finite_signals_are_neutralized() {
    let engine = fixed_engine(f64::NAN, f64::INFINITY, FixedKeywords::none());
    let result = engine.classify("text").await;

    assert_eq!(result.ml_confidence, 0.5);
    assert_eq!(result.bayesian_confidence, 0.5);
    assert_eq!(result.final_probability, 0.5);
    assert!(!result.is_spam);
}

#[tokio::test]
async fn test_same_text_twice_is_identical() {
    let engine = real_engine(trained_model(), 0.42);
    let first = engine.classify("Claim your FREE prize!!!").await;
    let second = engine.classify("Claim your FREE prize!!!").await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_spam_text_flagged_by_real_components() {
    let engine = real_engine(trained_model(), 0.55);
    let result = engine.classify("WIN a FREE prize, claim now!!!").await;

    assert!(result.bayesian_confidence > 0.5);
    assert!(result.matched_keywords.contains("free"));
    assert!(result.is_spam);
}

#[tokio::test]
async fn test_ham_text_passes_real_components() {
    let engine = real_engine(trained_model(), 0.1);
    let result = engine.classify("running late, see you soon").await;

    assert!(result.bayesian_confidence < 0.5);
    assert!(result.matched_keywords.is_empty());
    assert!(!result.is_spam);
}

#[tokio::test]
async fn test_failing_backend_degrades_to_neutral() {
    let engine = HybridDecisionEngine::new(
        Arc::new(NaiveBayesClassifier::new(Arc::new(WordModel::new())).unwrap()),
        Arc::new(InferenceAdapter::new(Arc::new(FailingBackend::new(
            "interpreter not loaded",
        )))),
        Arc::new(SpamKeywords::detector().unwrap()),
    )
    .unwrap();

    let result = engine.classify("hello").await;
    assert_eq!(result.ml_confidence, 0.5);
    assert_eq!(result.bayesian_confidence, 0.5);
    assert_eq!(result.final_probability, 0.5);
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_times_out_to_neutral() {
    let backend = Arc::new(MockBackend::new(0.99).with_latency(Duration::from_secs(10)));
    let engine = HybridDecisionEngine::new(
        Arc::new(FixedSignal::bayes(0.2)),
        Arc::new(InferenceAdapter::new(backend.clone()).with_timeout(Duration::from_secs(2))),
        Arc::new(FixedKeywords::none()),
    )
    .unwrap();

    let result = engine.classify("slow").await;
    assert_eq!(backend.call_count(), 1);
    assert_eq!(result.ml_confidence, 0.5);
    assert!(!result.is_spam);
}

#[tokio::test]
async fn test_backend_receives_preprocessed_text() {
    let backend = Arc::new(RecordingBackend::new());
    let engine = HybridDecisionEngine::new(
        Arc::new(FixedSignal::bayes(0.5)),
        Arc::new(InferenceAdapter::new(backend.clone())),
        Arc::new(SpamKeywords::detector().unwrap()),
    )
    .unwrap();

    let result = engine.classify("CLICK HERE!!! 🎉 $$$").await;
    assert_eq!(backend.seen(), vec!["click here!".to_string()]);
    assert!(result.matched_keywords.contains("click here"));
}
