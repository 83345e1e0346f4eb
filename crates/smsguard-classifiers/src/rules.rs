//! Lightweight keyword-only classification
//!
//! Used when no inference backend or word model is deployed. The verdict
//! is a plain keyword hit; the probabilities are fixed.

use crate::keywords::SpamKeywords;
use smsguard_core::{ClassificationResult, NEUTRAL_PROBABILITY};
use std::sync::Arc;
use tracing::debug;

/// Final probability reported for a keyword hit
pub const RULE_SPAM_PROBABILITY: f64 = 0.8;

/// Final probability reported without a keyword hit
pub const RULE_HAM_PROBABILITY: f64 = 0.2;

/// Rule-based checker over a keyword set
pub struct KeywordRuleChecker {
    keywords: Arc<SpamKeywords>,
}

impl KeywordRuleChecker {
    pub fn new(keywords: Arc<SpamKeywords>) -> Self {
        Self { keywords }
    }

    /// The keyword set consulted on every check
    pub fn keywords(&self) -> &Arc<SpamKeywords> {
        &self.keywords
    }

    /// Classify `text` by keyword presence alone
    pub fn check(&self, text: &str) -> ClassificationResult {
        let matched_keywords = self.keywords.find_matches(text);
        let is_spam = !matched_keywords.is_empty();

        debug!(is_spam, keywords = matched_keywords.len(), "Keyword rule check");
        metrics::counter!(
            "smsguard_classifications_total",
            "mode" => "keyword_only",
            "verdict" => if is_spam { "spam" } else { "ham" }
        )
        .increment(1);

        ClassificationResult {
            is_spam,
            final_probability: if is_spam {
                RULE_SPAM_PROBABILITY
            } else {
                RULE_HAM_PROBABILITY
            },
            ml_confidence: NEUTRAL_PROBABILITY,
            bayesian_confidence: NEUTRAL_PROBABILITY,
            decided_by: is_spam.then(|| "keyword_rule".to_string()),
            matched_keywords,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_hit_is_spam() {
        let checker = KeywordRuleChecker::new(Arc::new(SpamKeywords::checker().unwrap()));
        let result = checker.check("URGENT: claim your prize");
        assert!(result.is_spam);
        assert_eq!(result.final_probability, 0.8);
        assert_eq!(result.ml_confidence, 0.5);
        assert_eq!(result.bayesian_confidence, 0.5);
        assert!(result.matched_keywords.contains("prize"));
    }

    #[test]
    fn test_no_hit_is_ham() {
        let checker = KeywordRuleChecker::new(Arc::new(SpamKeywords::checker().unwrap()));
        let result = checker.check("running late, start without me");
        assert!(!result.is_spam);
        assert_eq!(result.final_probability, 0.2);
        assert!(result.decided_by.is_none());
    }

    #[test]
    fn test_checker_set_excludes_detector_only_words() {
        // "cash" is only in the larger detector set
        let checker = KeywordRuleChecker::new(Arc::new(SpamKeywords::checker().unwrap()));
        assert!(!checker.check("cash on delivery").is_spam);
    }

    #[test]
    fn test_empty_set_never_flags() {
        let checker = KeywordRuleChecker::new(Arc::new(
            SpamKeywords::new("empty", Vec::<String>::new()).unwrap(),
        ));
        assert!(!checker.check("win free prize").is_spam);
    }
}
