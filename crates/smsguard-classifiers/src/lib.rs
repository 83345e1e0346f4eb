//! SMS Guard Classifiers
//!
//! Spam classification for short text messages. Three independent signals
//! feed a single decision:
//! - Naive Bayes over an incrementally trained word model
//! - An external numeric inference backend behind a bounded-time adapter
//! - Case-insensitive keyword rules
//!
//! [`HybridDecisionEngine`] fuses them into a boolean verdict (ordered tiers)
//! and a continuous probability (weighted fusion). [`KeywordRuleChecker`] is
//! the lightweight keyword-only alternative.

pub mod bayes;
pub mod classifier;
pub mod config;
pub mod decision;
pub mod inference;
pub mod keywords;
pub mod preprocess;
pub mod rules;
pub mod signal;
pub mod word_model;

pub use bayes::NaiveBayesClassifier;
pub use classifier::{ClassifierBuilder, SpamClassifier};
pub use config::{ClassifierConfig, ClassifierMode};
pub use decision::{DecisionConfig, DecisionTier, FusionConfig, HybridDecisionEngine, TierRule};
pub use inference::{BlockingBackend, InferenceAdapter, InferenceBackend, NeutralBackend};
pub use keywords::{KeywordStore, MemoryKeywordStore, SpamKeywords};
pub use preprocess::{tokenize, TextPreprocessor};
pub use rules::KeywordRuleChecker;
pub use signal::{sanitize_probability, SpamSignal};
pub use word_model::{ModelSnapshot, WordCounts, WordModel, WordStats};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::bayes::NaiveBayesClassifier;
    pub use crate::classifier::{ClassifierBuilder, SpamClassifier};
    pub use crate::config::ClassifierConfig;
    pub use crate::decision::HybridDecisionEngine;
    pub use crate::inference::{InferenceAdapter, InferenceBackend};
    pub use crate::keywords::SpamKeywords;
    pub use crate::signal::SpamSignal;
    pub use crate::word_model::WordModel;
}
