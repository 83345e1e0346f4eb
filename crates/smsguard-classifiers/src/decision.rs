//! Hybrid spam decision
//!
//! Three signals feed every decision: the Naive Bayes probability and the
//! inference score (both computed on preprocessed text) and the keyword
//! matches (computed on the raw text). Two independent rules consume them:
//!
//! - an ordered list of tiers produces the boolean verdict, first match wins
//! - a two-regime weighted fusion produces the continuous probability
//!
//! The two may disagree near thresholds; each is authoritative for its own
//! output.

use crate::preprocess::TextPreprocessor;
use crate::signal::{sanitize_probability, SpamSignal};
use serde::{Deserialize, Serialize};
use smsguard_core::{ClassificationResult, Result};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Predicate of a decision tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TierRule {
    /// Inference score strictly above `threshold`
    MlAbove { threshold: f64 },

    /// Bayes probability strictly above `threshold`
    BayesAbove { threshold: f64 },

    /// Any keyword matched and either probability strictly above `threshold`
    KeywordsWithEither { threshold: f64 },

    /// Both probabilities strictly above their thresholds
    BothAbove { ml: f64, bayes: f64 },
}

impl TierRule {
    fn matches(&self, ml: f64, bayes: f64, has_keywords: bool) -> bool {
        match *self {
            Self::MlAbove { threshold } => ml > threshold,
            Self::BayesAbove { threshold } => bayes > threshold,
            Self::KeywordsWithEither { threshold } => {
                has_keywords && (ml > threshold || bayes > threshold)
            }
            Self::BothAbove { ml: ml_min, bayes: bayes_min } => ml > ml_min && bayes > bayes_min,
        }
    }
}

/// One `(predicate, outcome)` pair of the ordered decision list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTier {
    /// Tier name, reported in `decided_by`
    pub name: String,

    /// Predicate
    #[serde(flatten)]
    pub rule: TierRule,

    /// Verdict when the predicate holds
    #[serde(default = "default_tier_verdict")]
    pub is_spam: bool,
}

impl DecisionTier {
    /// Create a tier that flags spam
    pub fn spam(name: impl Into<String>, rule: TierRule) -> Self {
        Self {
            name: name.into(),
            rule,
            is_spam: true,
        }
    }
}

fn default_tier_verdict() -> bool {
    true
}

/// The stock tier list
pub fn default_tiers() -> Vec<DecisionTier> {
    vec![
        DecisionTier::spam("ml_confident", TierRule::MlAbove { threshold: 0.85 }),
        DecisionTier::spam("bayes_confident", TierRule::BayesAbove { threshold: 0.9 }),
        DecisionTier::spam(
            "keywords_supported",
            TierRule::KeywordsWithEither { threshold: 0.5 },
        ),
        DecisionTier::spam("combined", TierRule::BothAbove { ml: 0.6, bayes: 0.7 }),
    ]
}

/// Weights of the continuous fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionConfig {
    /// Inference scores above this are treated as confident
    #[serde(default = "default_confident_high")]
    pub confident_high: f64,

    /// Inference scores below this are treated as confident
    #[serde(default = "default_confident_low")]
    pub confident_low: f64,

    /// Inference weight when the inference score is confident
    #[serde(default = "default_confident_ml_weight")]
    pub confident_ml_weight: f64,

    /// Inference weight otherwise
    #[serde(default = "default_uncertain_ml_weight")]
    pub uncertain_ml_weight: f64,
}

fn default_confident_high() -> f64 {
    0.7
}

fn default_confident_low() -> f64 {
    0.3
}

fn default_confident_ml_weight() -> f64 {
    0.8
}

fn default_uncertain_ml_weight() -> f64 {
    0.3
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            confident_high: default_confident_high(),
            confident_low: default_confident_low(),
            confident_ml_weight: default_confident_ml_weight(),
            uncertain_ml_weight: default_uncertain_ml_weight(),
        }
    }
}

impl FusionConfig {
    /// Fuse the two probabilities; the result is always in [0,1]
    pub fn fuse(&self, ml: f64, bayes: f64) -> f64 {
        let ml = sanitize_probability(ml);
        let bayes = sanitize_probability(bayes);

        let ml_weight = if ml > self.confident_high || ml < self.confident_low {
            self.confident_ml_weight
        } else {
            self.uncertain_ml_weight
        };

        sanitize_probability(ml_weight * ml + (1.0 - ml_weight) * bayes)
    }
}

/// Tier list plus fusion weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionConfig {
    /// Ordered tiers, evaluated top to bottom
    #[serde(default = "default_tiers")]
    pub tiers: Vec<DecisionTier>,

    /// Continuous fusion
    #[serde(default)]
    pub fusion: FusionConfig,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            fusion: FusionConfig::default(),
        }
    }
}

impl DecisionConfig {
    /// Combine already-computed signals into a result
    pub fn decide(&self, ml: f64, bayes: f64, matched_keywords: BTreeSet<String>) -> ClassificationResult {
        let ml = sanitize_probability(ml);
        let bayes = sanitize_probability(bayes);
        let has_keywords = !matched_keywords.is_empty();

        let fired = self
            .tiers
            .iter()
            .find(|tier| tier.rule.matches(ml, bayes, has_keywords));

        ClassificationResult {
            is_spam: fired.map(|tier| tier.is_spam).unwrap_or(false),
            final_probability: self.fusion.fuse(ml, bayes),
            ml_confidence: ml,
            bayesian_confidence: bayes,
            matched_keywords,
            decided_by: fired.map(|tier| tier.name.clone()),
        }
    }
}

/// Fuses Bayes, inference, and keyword signals into one verdict
pub struct HybridDecisionEngine {
    preprocessor: TextPreprocessor,
    bayes: Arc<dyn SpamSignal>,
    inference: Arc<dyn SpamSignal>,
    keywords: Arc<dyn SpamSignal>,
    config: DecisionConfig,
}

impl HybridDecisionEngine {
    /// Create an engine with the stock decision config
    pub fn new(
        bayes: Arc<dyn SpamSignal>,
        inference: Arc<dyn SpamSignal>,
        keywords: Arc<dyn SpamSignal>,
    ) -> Result<Self> {
        Ok(Self {
            preprocessor: TextPreprocessor::new()?,
            bayes,
            inference,
            keywords,
            config: DecisionConfig::default(),
        })
    }

    /// Replace the decision config
    pub fn with_config(mut self, config: DecisionConfig) -> Self {
        self.config = config;
        self
    }

    /// Active decision config
    pub fn config(&self) -> &DecisionConfig {
        &self.config
    }

    /// Classify raw message text.
    ///
    /// The three signals are evaluated concurrently. The result is a pure
    /// function of the signals, so the same text against an unchanged model
    /// and backend yields the same result.
    pub async fn classify(&self, text: &str) -> ClassificationResult {
        let start = Instant::now();
        let normalized = self.preprocessor.preprocess(text);

        let (bayes, ml, keywords) = futures::join!(
            self.bayes.evaluate(&normalized),
            self.inference.evaluate(&normalized),
            self.keywords.evaluate(text),
        );

        let result = self.config.decide(
            ml.probability_or_neutral(),
            bayes.probability_or_neutral(),
            keywords.matched_keywords,
        );

        debug!(
            is_spam = result.is_spam,
            final_probability = result.final_probability,
            ml = result.ml_confidence,
            bayes = result.bayesian_confidence,
            keywords = result.matched_keywords.len(),
            decided_by = result.decided_by.as_deref().unwrap_or("default"),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Hybrid classification"
        );
        metrics::counter!(
            "smsguard_classifications_total",
            "mode" => "hybrid",
            "verdict" => if result.is_spam { "spam" } else { "ham" }
        )
        .increment(1);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> BTreeSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_tiers_first_match_wins() {
        let config = DecisionConfig::default();

        let result = config.decide(0.9, 0.95, BTreeSet::new());
        assert_eq!(result.decided_by.as_deref(), Some("ml_confident"));

        let result = config.decide(0.2, 0.95, BTreeSet::new());
        assert_eq!(result.decided_by.as_deref(), Some("bayes_confident"));

        let result = config.decide(0.55, 0.1, keywords(&["prize"]));
        assert_eq!(result.decided_by.as_deref(), Some("keywords_supported"));

        let result = config.decide(0.65, 0.75, BTreeSet::new());
        assert_eq!(result.decided_by.as_deref(), Some("combined"));
        assert!(result.is_spam);
    }

    #[test]
    fn test_default_is_not_spam() {
        let config = DecisionConfig::default();
        let result = config.decide(0.5, 0.5, BTreeSet::new());
        assert!(!result.is_spam);
        assert!(result.decided_by.is_none());

        // keywords alone are not enough
        let result = config.decide(0.4, 0.4, keywords(&["win"]));
        assert!(!result.is_spam);
    }

    #[test]
    fn test_thresholds_are_strict() {
        let config = DecisionConfig::default();
        assert!(!config.decide(0.85, 0.0, BTreeSet::new()).is_spam);
        assert!(!config.decide(0.0, 0.9, BTreeSet::new()).is_spam);
    }

    #[test]
    fn test_fusion_regimes() {
        let fusion = FusionConfig::default();
        assert!((fusion.fuse(0.9, 0.1) - 0.74).abs() < 1e-9);
        assert!((fusion.fuse(0.1, 0.9) - 0.26).abs() < 1e-9);
        assert!((fusion.fuse(0.5, 1.0) - 0.85).abs() < 1e-9);
    }

    #[test]
    fn test_fusion_sanitizes_inputs() {
        let fusion = FusionConfig::default();
        assert_eq!(fusion.fuse(f64::NAN, f64::NAN), 0.5);
        let value = fusion.fuse(f64::INFINITY, 1e300);
        assert!((0.0..=1.0).contains(&value));
    }

    #[test]
    fn test_boolean_and_fusion_may_disagree() {
        // keyword tier fires while fused probability stays under 0.5
        let result = DecisionConfig::default().decide(0.51, 0.2, keywords(&["claim"]));
        assert!(result.is_spam);
        assert!(result.final_probability < 0.5);
    }

    #[test]
    fn test_tiers_from_yaml() {
        let yaml = r#"
tiers:
  - name: strict_ml
    type: ml_above
    threshold: 0.95
  - name: trusted_bayes
    type: bayes_above
    threshold: 0.1
    is_spam: false
"#;
        let config: DecisionConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.tiers.len(), 2);
        assert_eq!(config.fusion, FusionConfig::default());

        let result = config.decide(0.9, 0.2, BTreeSet::new());
        assert!(!result.is_spam);
        assert_eq!(result.decided_by.as_deref(), Some("trusted_bayes"));
    }
}
