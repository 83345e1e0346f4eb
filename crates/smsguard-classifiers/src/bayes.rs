//! Naive Bayes spam probability over a shared word model

use crate::preprocess::tokenize;
use crate::signal::{sanitize_probability, SpamSignal};
use crate::word_model::WordModel;
use aho_corasick::AhoCorasick;
use async_trait::async_trait;
use smsguard_core::{ClassificationSignal, Error, Result, SignalSource, NEUTRAL_PROBABILITY};
use std::sync::Arc;
use tracing::debug;

/// Common benign vocabulary that pulls the spam score down
pub const DEFAULT_HAM_WHITELIST: &[&str] = &[
    "meeting", "thanks", "family", "friend", "hello", "hi", "good", "morning",
    "afternoon", "evening", "night", "work", "home", "office", "school",
    "university", "college", "study", "exam", "test", "project", "assignment",
    "dinner", "lunch", "breakfast", "coffee", "tea", "water", "food", "eat",
    "drink", "sleep", "rest", "exercise", "gym", "run", "walk", "drive", "car",
    "bus", "train", "plane", "travel", "vacation", "holiday", "birthday", "party",
    "wedding", "anniversary", "congratulations", "happy", "sad", "tired", "busy",
    "free", "available", "sorry", "please", "help", "support", "service", "customer",
];

/// Log-odds subtracted from the spam score when a whitelisted word appears
pub const DEFAULT_WHITELIST_PENALTY: f64 = 2.0;

/// Laplace-smoothed Naive Bayes classifier.
///
/// Scores are accumulated in log space so long messages cannot underflow.
/// Tokens are lower-cased here even if the caller already normalized the
/// text, and training uses the same tokenization.
pub struct NaiveBayesClassifier {
    name: String,
    model: Arc<WordModel>,
    whitelist: Option<AhoCorasick>,
    whitelist_penalty: f64,
}

impl NaiveBayesClassifier {
    /// Create a classifier over `model` with the default whitelist
    pub fn new(model: Arc<WordModel>) -> Result<Self> {
        Self {
            name: "naive_bayes".to_string(),
            model,
            whitelist: None,
            whitelist_penalty: DEFAULT_WHITELIST_PENALTY,
        }
        .with_whitelist(DEFAULT_HAM_WHITELIST.iter().copied(), DEFAULT_WHITELIST_PENALTY)
    }

    /// Replace the ham whitelist and penalty
    pub fn with_whitelist<I, S>(mut self, words: I, penalty: f64) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        self.whitelist = if words.is_empty() {
            None
        } else {
            Some(
                AhoCorasick::builder()
                    .ascii_case_insensitive(true)
                    .build(&words)
                    .map_err(|e| Error::config(format!("Failed to build ham whitelist: {}", e)))?,
            )
        };
        self.whitelist_penalty = penalty;
        Ok(self)
    }

    /// The underlying word model
    pub fn model(&self) -> &Arc<WordModel> {
        &self.model
    }

    /// Check if `text` contains any whitelisted word
    pub fn has_whitelisted_word(&self, text: &str) -> bool {
        match &self.whitelist {
            Some(whitelist) => whitelist.is_match(&text.to_lowercase()),
            None => false,
        }
    }

    /// Spam probability of `text` in [0,1]; 0.5 with no data or no tokens
    pub fn probability(&self, text: &str) -> f64 {
        let tokens = tokenize(text);
        let whitelisted = self.has_whitelisted_word(text);

        let scores = self.model.with_view(|view| {
            let (total_spam, total_ham) = view.totals();
            if (total_spam == 0 && total_ham == 0) || tokens.is_empty() {
                return None;
            }

            let spam_denominator = total_spam as f64 + 2.0;
            let ham_denominator = total_ham as f64 + 2.0;

            let mut spam_log = 0.0;
            let mut ham_log = 0.0;
            for token in &tokens {
                let counts = view.lookup(token);
                spam_log += ((counts.spam_count as f64 + 1.0) / spam_denominator).ln();
                ham_log += ((counts.ham_count as f64 + 1.0) / ham_denominator).ln();
            }

            let total = (total_spam + total_ham) as f64;
            let spam_score = spam_log + (total_spam as f64 / total).ln();
            let ham_score = ham_log + (total_ham as f64 / total).ln();
            Some((spam_score, ham_score))
        });

        let Some((mut spam_score, ham_score)) = scores else {
            return NEUTRAL_PROBABILITY;
        };
        if whitelisted {
            spam_score -= self.whitelist_penalty;
        }

        let probability = sanitize_probability(1.0 / (1.0 + (ham_score - spam_score).exp()));
        debug!(
            spam_score,
            ham_score,
            whitelisted,
            probability,
            "Bayesian probability computed"
        );
        probability
    }

    /// Learn `text` as spam
    pub fn train_spam(&self, text: &str) {
        self.model.train(tokenize(text), true);
    }

    /// Learn `text` as ham
    pub fn train_ham(&self, text: &str) {
        self.model.train(tokenize(text), false);
    }
}

#[async_trait]
impl SpamSignal for NaiveBayesClassifier {
    async fn evaluate(&self, text: &str) -> ClassificationSignal {
        ClassificationSignal::probability(SignalSource::Bayes, self.probability(text))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> SignalSource {
        SignalSource::Bayes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trained() -> NaiveBayesClassifier {
        let classifier = NaiveBayesClassifier::new(Arc::new(WordModel::new())).unwrap();
        classifier.train_spam("win cash prize now");
        classifier.train_spam("claim your cash prize");
        classifier.train_spam("urgent cash offer");
        classifier.train_ham("see you at the station");
        classifier.train_ham("call me when you land");
        classifier.train_ham("dinner at seven");
        classifier
    }

    #[test]
    fn test_no_training_data_is_neutral() {
        let classifier = NaiveBayesClassifier::new(Arc::new(WordModel::new())).unwrap();
        assert_eq!(classifier.probability("win cash now"), 0.5);
        assert_eq!(classifier.probability("meeting at noon"), 0.5);
    }

    #[test]
    fn test_blank_text_is_neutral() {
        let classifier = trained();
        assert_eq!(classifier.probability(""), 0.5);
        assert_eq!(classifier.probability("   \t "), 0.5);
    }

    #[test]
    fn test_spam_vocabulary_scores_high() {
        let classifier = trained();
        let spam = classifier.probability("cash prize");
        let ham = classifier.probability("see you at the station");
        assert!(spam > 0.5, "spam probability was {}", spam);
        assert!(ham < 0.5, "ham probability was {}", ham);
    }

    #[test]
    fn test_lowercases_tokens() {
        let classifier = trained();
        assert_eq!(
            classifier.probability("CASH PRIZE"),
            classifier.probability("cash prize")
        );
    }

    #[test]
    fn test_training_shares_query_tokens() {
        let model = Arc::new(WordModel::new());
        let classifier = NaiveBayesClassifier::new(model.clone()).unwrap();
        classifier.train_spam("  FREE\tCash ");

        for token in tokenize("free CASH") {
            assert_eq!(model.lookup(&token).spam_count, 1);
        }
        assert_eq!(model.vocabulary_size(), 2);
    }

    #[test]
    fn test_matches_hand_computed_value() {
        let model = Arc::new(WordModel::new());
        let classifier = NaiveBayesClassifier::new(model)
            .unwrap()
            .with_whitelist(Vec::<String>::new(), 0.0)
            .unwrap();
        classifier.train_spam("cash");
        classifier.train_ham("lunch");

        // p_spam = (1+1)/(1+2), p_ham = (0+1)/(1+2), equal priors
        let spam_score = (2.0f64 / 3.0).ln() + 0.5f64.ln();
        let ham_score = (1.0f64 / 3.0).ln() + 0.5f64.ln();
        let expected = 1.0 / (1.0 + (ham_score - spam_score).exp());

        assert!((classifier.probability("cash") - expected).abs() < 1e-12);
    }

    #[test]
    fn test_whitelist_penalty_lowers_probability() {
        let model = Arc::new(WordModel::new());
        let with_penalty = NaiveBayesClassifier::new(model.clone()).unwrap();
        let without_penalty = NaiveBayesClassifier::new(model)
            .unwrap()
            .with_whitelist(Vec::<String>::new(), 0.0)
            .unwrap();

        with_penalty.train_spam("win cash prize");
        with_penalty.train_ham("see you soon");

        let text = "meeting tomorrow";
        assert!(with_penalty.has_whitelisted_word(text));
        assert!(with_penalty.probability(text) < without_penalty.probability(text));
    }

    #[test]
    fn test_single_class_model_stays_finite() {
        let classifier = NaiveBayesClassifier::new(Arc::new(WordModel::new())).unwrap();
        classifier.train_ham("lunch at noon");

        let probability = classifier.probability("lunch");
        assert!(probability.is_finite());
        assert_eq!(probability, 0.0);
    }

    #[tokio::test]
    async fn test_signal_source() {
        let classifier = trained();
        let signal = classifier.evaluate("cash").await;
        assert_eq!(signal.source, SignalSource::Bayes);
        assert!(signal.probability.is_some());
    }
}
