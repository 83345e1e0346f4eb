//! Word frequency model backing the Naive Bayes classifier
//!
//! The model is a map from word to spam/ham occurrence counts plus two
//! message totals. Counts only ever grow. All state sits behind a single
//! `RwLock` so that one training call (many word increments plus one totals
//! increment) is applied atomically, and readers always see a consistent
//! count pair for every word.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use smsguard_core::{Error, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::{debug, info};

/// Spam/ham occurrence counts for a single word
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordCounts {
    pub spam_count: u64,
    pub ham_count: u64,
}

impl WordCounts {
    /// Fraction of occurrences seen in spam, 0.5 for a word never seen
    pub fn spam_ratio(&self) -> f64 {
        let total = self.spam_count + self.ham_count;
        if total == 0 {
            0.5
        } else {
            self.spam_count as f64 / total as f64
        }
    }
}

/// Per-word statistics for inspection
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WordStats {
    pub word: String,
    pub spam_count: u64,
    pub ham_count: u64,
    pub spam_ratio: f64,
}

#[derive(Debug, Default)]
struct ModelState {
    words: HashMap<String, WordCounts>,
    total_spam_messages: u64,
    total_ham_messages: u64,
}

/// Read-only view of the model, valid while the read lock is held
pub struct ModelView<'a> {
    state: &'a ModelState,
}

impl ModelView<'_> {
    /// Counts for a word, `(0, 0)` if unknown
    pub fn lookup(&self, word: &str) -> WordCounts {
        self.state.words.get(word).copied().unwrap_or_default()
    }

    /// `(total_spam_messages, total_ham_messages)`
    pub fn totals(&self) -> (u64, u64) {
        (self.state.total_spam_messages, self.state.total_ham_messages)
    }
}

/// Thread-safe word frequency model
#[derive(Debug, Default)]
pub struct WordModel {
    state: RwLock<ModelState>,
}

impl WordModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one occurrence of `word` to the spam or ham count
    pub fn increment(&self, word: &str, is_spam: bool) {
        let mut state = self.state.write();
        bump(&mut state.words, word, is_spam);
    }

    /// Counts for a word, `(0, 0)` if unknown
    pub fn lookup(&self, word: &str) -> WordCounts {
        self.state.read().words.get(word).copied().unwrap_or_default()
    }

    /// `(total_spam_messages, total_ham_messages)`
    pub fn totals(&self) -> (u64, u64) {
        let state = self.state.read();
        (state.total_spam_messages, state.total_ham_messages)
    }

    /// Apply one training call: every token once, then one message total
    pub fn train<I, S>(&self, tokens: I, is_spam: bool)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.write();
        for token in tokens {
            bump(&mut state.words, token.as_ref(), is_spam);
        }
        if is_spam {
            state.total_spam_messages += 1;
        } else {
            state.total_ham_messages += 1;
        }
    }

    /// Run `f` against a consistent view of the model
    pub fn with_view<R>(&self, f: impl FnOnce(ModelView<'_>) -> R) -> R {
        let state = self.state.read();
        f(ModelView { state: &state })
    }

    /// Number of distinct words seen
    pub fn vocabulary_size(&self) -> usize {
        self.state.read().words.len()
    }

    /// Per-word statistics sorted by word
    pub fn word_stats(&self) -> Vec<WordStats> {
        let state = self.state.read();
        let mut stats: Vec<_> = state
            .words
            .iter()
            .map(|(word, counts)| WordStats {
                word: word.clone(),
                spam_count: counts.spam_count,
                ham_count: counts.ham_count,
                spam_ratio: counts.spam_ratio(),
            })
            .collect();
        stats.sort_by(|a, b| a.word.cmp(&b.word));
        stats
    }

    /// Capture the full model for persistence
    pub fn snapshot(&self) -> ModelSnapshot {
        let state = self.state.read();
        ModelSnapshot {
            version: default_version(),
            model_type: default_model_type(),
            total_words: state.words.len(),
            word_frequencies: state
                .words
                .iter()
                .map(|(word, counts)| (word.clone(), *counts))
                .collect(),
            total_spam_messages: Some(state.total_spam_messages),
            total_ham_messages: Some(state.total_ham_messages),
        }
    }

    /// Rebuild a model from a snapshot
    pub fn from_snapshot(snapshot: ModelSnapshot) -> Self {
        let (total_spam, total_ham) = snapshot.totals();
        let state = ModelState {
            words: snapshot.word_frequencies.into_iter().collect(),
            total_spam_messages: total_spam,
            total_ham_messages: total_ham,
        };
        Self {
            state: RwLock::new(state),
        }
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot())?)
    }

    /// Deserialize from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ModelSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Load a model file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::model(format!("Failed to read {}: {}", path.display(), e)))?;
        let model = Self::from_json(&json)?;
        let (spam, ham) = model.totals();
        info!(
            "Loaded word model from {}: {} words, {} spam, {} ham",
            path.display(),
            model.vocabulary_size(),
            spam,
            ham
        );
        Ok(model)
    }

    /// Write the model to `path`, replacing any existing file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, self.to_json()?)?;
        std::fs::rename(&tmp, path)?;
        debug!("Saved word model to {}", path.display());
        Ok(())
    }
}

fn bump(words: &mut HashMap<String, WordCounts>, word: &str, is_spam: bool) {
    let counts = words.entry(word.to_string()).or_default();
    if is_spam {
        counts.spam_count += 1;
    } else {
        counts.ham_count += 1;
    }
}

/// On-disk representation of a word model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "default_model_type")]
    pub model_type: String,

    #[serde(default)]
    pub total_words: usize,

    pub word_frequencies: BTreeMap<String, WordCounts>,

    /// Absent in merged-model files, which are derived from word sums instead
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_spam_messages: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_ham_messages: Option<u64>,
}

impl ModelSnapshot {
    /// Message totals, falling back to summed word counts
    pub fn totals(&self) -> (u64, u64) {
        let spam = self.total_spam_messages.unwrap_or_else(|| {
            self.word_frequencies.values().map(|c| c.spam_count).sum()
        });
        let ham = self.total_ham_messages.unwrap_or_else(|| {
            self.word_frequencies.values().map(|c| c.ham_count).sum()
        });
        (spam, ham)
    }
}

fn default_version() -> String {
    "1".to_string()
}

fn default_model_type() -> String {
    "naive_bayes".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_word_is_zero() {
        let model = WordModel::new();
        assert_eq!(model.lookup("nothing"), WordCounts::default());
        assert_eq!(model.totals(), (0, 0));
    }

    #[test]
    fn test_train_bumps_totals_once_per_call() {
        let model = WordModel::new();
        model.train(["win", "cash", "win"], true);
        model.train(["lunch"], false);

        assert_eq!(model.totals(), (1, 1));
        assert_eq!(model.lookup("win").spam_count, 2);
        assert_eq!(model.lookup("cash").spam_count, 1);
        assert_eq!(model.lookup("lunch").ham_count, 1);
    }

    #[test]
    fn test_increment_leaves_totals_alone() {
        let model = WordModel::new();
        model.increment("hello", false);
        model.increment("hello", false);
        assert_eq!(model.lookup("hello").ham_count, 2);
        assert_eq!(model.totals(), (0, 0));
    }

    #[test]
    fn test_legacy_snapshot_derives_totals() {
        let json = r#"{
            "version": "2.0",
            "word_frequencies": {
                "free": {"spam_count": 5, "ham_count": 1},
                "home": {"spam_count": 0, "ham_count": 4}
            }
        }"#;
        let model = WordModel::from_json(json).unwrap();
        assert_eq!(model.totals(), (5, 5));
        assert_eq!(model.vocabulary_size(), 2);
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let model = WordModel::new();
        model.train(["prize", "claim"], true);
        model.train(["see", "you", "soon"], false);
        model.save(&path).unwrap();

        let loaded = WordModel::load(&path).unwrap();
        assert_eq!(loaded.totals(), (1, 1));
        assert_eq!(loaded.lookup("prize").spam_count, 1);
        assert_eq!(loaded.lookup("soon").ham_count, 1);
    }

    #[test]
    fn test_load_missing_file_is_model_error() {
        let result = WordModel::load("/definitely/not/here.json");
        assert!(matches!(result, Err(Error::Model(_))));
    }

    #[test]
    fn test_word_stats_ratio() {
        let model = WordModel::new();
        model.train(["offer"], true);
        model.train(["offer"], true);
        model.train(["offer"], false);

        let stats = model.word_stats();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].spam_count, 2);
        assert!((stats[0].spam_ratio - 2.0 / 3.0).abs() < 1e-12);
    }
}
