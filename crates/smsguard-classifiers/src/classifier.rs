//! Configured classifier front
//!
//! Wires the word model, inference backend, and keyword sets together
//! according to a [`ClassifierConfig`] and dispatches on the configured mode.

use crate::bayes::NaiveBayesClassifier;
use crate::config::{ClassifierConfig, ClassifierMode};
use crate::decision::HybridDecisionEngine;
use crate::inference::{InferenceAdapter, InferenceBackend, NeutralBackend};
use crate::keywords::{KeywordStore, SpamKeywords};
use crate::rules::KeywordRuleChecker;
use crate::word_model::WordModel;
use smsguard_core::{ClassificationResult, Result};
use std::sync::Arc;
use tracing::{info, warn};

/// Classifier selected by configuration
pub enum SpamClassifier {
    /// Bayes, inference, and keywords fused by the decision tiers
    Hybrid {
        engine: HybridDecisionEngine,
        bayes: Arc<NaiveBayesClassifier>,
        keywords: Arc<SpamKeywords>,
    },

    /// Keyword presence alone
    KeywordOnly(KeywordRuleChecker),
}

impl SpamClassifier {
    /// Classify raw message text
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        match self {
            Self::Hybrid { engine, .. } => engine.classify(text).await,
            Self::KeywordOnly(checker) => checker.check(text),
        }
    }

    /// Active mode
    pub fn mode(&self) -> ClassifierMode {
        match self {
            Self::Hybrid { .. } => ClassifierMode::Hybrid,
            Self::KeywordOnly(_) => ClassifierMode::KeywordOnly,
        }
    }

    /// Keyword set used by this classifier
    pub fn keywords(&self) -> &Arc<SpamKeywords> {
        match self {
            Self::Hybrid { keywords, .. } => keywords,
            Self::KeywordOnly(checker) => checker.keywords(),
        }
    }

    /// Word model, if this classifier has one
    pub fn word_model(&self) -> Option<&Arc<WordModel>> {
        match self {
            Self::Hybrid { bayes, .. } => Some(bayes.model()),
            Self::KeywordOnly(_) => None,
        }
    }

    /// Feed user feedback into the word model.
    ///
    /// Returns `false` when the classifier has no model to train.
    pub fn learn(&self, text: &str, is_spam: bool) -> bool {
        match self {
            Self::Hybrid { bayes, .. } => {
                if is_spam {
                    bayes.train_spam(text);
                } else {
                    bayes.train_ham(text);
                }
                true
            }
            Self::KeywordOnly(_) => false,
        }
    }
}

/// Builder for [`SpamClassifier`]
pub struct ClassifierBuilder {
    config: ClassifierConfig,
    model: Option<Arc<WordModel>>,
    backend: Option<Arc<dyn InferenceBackend>>,
    keyword_store: Option<Arc<dyn KeywordStore>>,
}

impl ClassifierBuilder {
    /// Create a builder from configuration
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            model: None,
            backend: None,
            keyword_store: None,
        }
    }

    /// Use an already-loaded word model instead of `model_path`
    pub fn model(mut self, model: Arc<WordModel>) -> Self {
        self.model = Some(model);
        self
    }

    /// Use `backend` for inference; a neutral backend is used otherwise
    pub fn backend(mut self, backend: Arc<dyn InferenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Persist the keyword set through `store`
    pub fn keyword_store(mut self, store: Arc<dyn KeywordStore>) -> Self {
        self.keyword_store = Some(store);
        self
    }

    /// Build the classifier
    pub fn build(self) -> Result<SpamClassifier> {
        match self.config.mode {
            ClassifierMode::KeywordOnly => {
                let keywords = self.keywords("checker_keywords", &self.config.checker_keywords)?;
                info!("Keyword-only classifier with {} keywords", keywords.len());
                Ok(SpamClassifier::KeywordOnly(KeywordRuleChecker::new(keywords)))
            }
            ClassifierMode::Hybrid => {
                let keywords =
                    self.keywords("detector_keywords", &self.config.detector_keywords)?;
                let model = match &self.model {
                    Some(model) => model.clone(),
                    None => Arc::new(self.load_model()),
                };

                let bayes = Arc::new(
                    NaiveBayesClassifier::new(model)?
                        .with_whitelist(&self.config.whitelist, self.config.whitelist_penalty)?,
                );
                let backend: Arc<dyn InferenceBackend> = match &self.backend {
                    Some(backend) => backend.clone(),
                    None => Arc::new(NeutralBackend),
                };
                let inference = Arc::new(
                    InferenceAdapter::new(backend).with_timeout(self.config.inference_timeout()),
                );

                let engine =
                    HybridDecisionEngine::new(bayes.clone(), inference, keywords.clone())?
                        .with_config(self.config.decision.clone());

                info!(
                    "Hybrid classifier with {} tiers, {} keywords, vocabulary of {}",
                    engine.config().tiers.len(),
                    keywords.len(),
                    bayes.model().vocabulary_size()
                );
                Ok(SpamClassifier::Hybrid {
                    engine,
                    bayes,
                    keywords,
                })
            }
        }
    }

    fn keywords(&self, name: &str, defaults: &[String]) -> Result<Arc<SpamKeywords>> {
        let keywords = match &self.keyword_store {
            Some(store) => SpamKeywords::with_store(name, defaults.iter().cloned(), store.clone())?,
            None => SpamKeywords::new(name, defaults.iter().cloned())?,
        };
        Ok(Arc::new(keywords))
    }

    fn load_model(&self) -> WordModel {
        let Some(path) = &self.config.model_path else {
            return WordModel::new();
        };

        match WordModel::load(path) {
            Ok(model) => model,
            Err(e) => {
                warn!("Continuing with an empty word model: {}", e);
                WordModel::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_default_build_is_hybrid() {
        let classifier = ClassifierBuilder::new(ClassifierConfig::default())
            .build()
            .unwrap();
        assert_eq!(classifier.mode(), ClassifierMode::Hybrid);

        // empty model and neutral backend
        let result = classifier.classify("hello there").await;
        assert_eq!(result.ml_confidence, 0.5);
        assert_eq!(result.bayesian_confidence, 0.5);
        assert!(!result.is_spam);
    }

    #[tokio::test]
    async fn test_keyword_only_build() {
        let config = ClassifierConfig {
            mode: ClassifierMode::KeywordOnly,
            ..Default::default()
        };
        let classifier = ClassifierBuilder::new(config).build().unwrap();
        assert_eq!(classifier.mode(), ClassifierMode::KeywordOnly);
        assert!(classifier.word_model().is_none());
        assert!(!classifier.learn("anything", true));

        let result = classifier.classify("You are a WINNER").await;
        assert!(result.is_spam);
        assert_eq!(result.final_probability, 0.8);
    }

    #[tokio::test]
    async fn test_missing_model_file_falls_back_to_empty() {
        let config = ClassifierConfig {
            model_path: Some("/nonexistent/smsguard/model.json".into()),
            ..Default::default()
        };
        let classifier = ClassifierBuilder::new(config).build().unwrap();
        assert_eq!(classifier.word_model().unwrap().vocabulary_size(), 0);
    }

    #[test]
    fn test_learn_updates_shared_model() {
        let model = Arc::new(WordModel::new());
        let classifier = ClassifierBuilder::new(ClassifierConfig::default())
            .model(model.clone())
            .build()
            .unwrap();

        assert!(classifier.learn("Free Prize", true));
        assert_eq!(model.totals(), (1, 0));
        assert_eq!(model.lookup("prize").spam_count, 1);
    }
}
