//! User-configurable spam keyword rules
//!
//! Matching is a case-insensitive substring search over the raw message
//! text using an Aho-Corasick automaton that is rebuilt whenever the set
//! changes. The set can be persisted through a [`KeywordStore`].

use crate::signal::SpamSignal;
use aho_corasick::{AhoCorasick, MatchKind};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use smsguard_core::{ClassificationSignal, Error, Result, SignalSource};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info};

/// Default keywords for the hybrid detector
pub const DETECTOR_KEYWORDS: &[&str] = &[
    "win", "free", "congrats", "lottery", "prize", "winner", "claim", "urgent",
    "limited time", "act now", "click here", "unlimited", "guaranteed", "risk-free",
    "no cost", "no purchase", "no obligation", "no catch", "no strings",
    "no hidden", "no fees", "cash", "money", "dollars", "million", "billion",
];

/// Default keywords for the lightweight rule-based checker
pub const CHECKER_KEYWORDS: &[&str] = &[
    "win", "free", "congrats", "lottery", "prize", "winner",
    "claim", "urgent", "limited time", "act now", "click here",
    "unlimited", "guaranteed", "risk-free", "no cost", "no purchase",
    "no obligation", "no catch", "no strings", "no hidden", "no fees",
];

/// Key-value persistence for a keyword set
pub trait KeywordStore: Send + Sync {
    /// Load the stored set, `None` if nothing was ever saved
    fn load(&self) -> Result<Option<BTreeSet<String>>>;

    /// Replace the stored set
    fn save(&self, keywords: &BTreeSet<String>) -> Result<()>;
}

/// Process-local keyword store
#[derive(Debug, Default)]
pub struct MemoryKeywordStore {
    keywords: Mutex<Option<BTreeSet<String>>>,
}

impl MemoryKeywordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeywordStore for MemoryKeywordStore {
    fn load(&self) -> Result<Option<BTreeSet<String>>> {
        Ok(self.keywords.lock().clone())
    }

    fn save(&self, keywords: &BTreeSet<String>) -> Result<()> {
        *self.keywords.lock() = Some(keywords.clone());
        Ok(())
    }
}

struct KeywordMatcher {
    keywords: BTreeSet<String>,
    patterns: Vec<String>,
    automaton: Option<AhoCorasick>,
}

impl KeywordMatcher {
    fn build(keywords: BTreeSet<String>) -> Result<Self> {
        let patterns: Vec<String> = keywords.iter().cloned().collect();
        let automaton = if patterns.is_empty() {
            None
        } else {
            let lowered: Vec<String> = patterns.iter().map(|k| k.to_lowercase()).collect();
            Some(
                AhoCorasick::builder()
                    .match_kind(MatchKind::Standard)
                    .build(&lowered)
                    .map_err(|e| {
                        Error::config(format!("Failed to build keyword matcher: {}", e))
                    })?,
            )
        };

        Ok(Self {
            keywords,
            patterns,
            automaton,
        })
    }

    fn find(&self, text: &str) -> BTreeSet<String> {
        let Some(automaton) = &self.automaton else {
            return BTreeSet::new();
        };

        let lowered = text.to_lowercase();
        automaton
            .find_overlapping_iter(&lowered)
            .map(|m| self.patterns[m.pattern().as_usize()].clone())
            .collect()
    }
}

/// Mutable keyword set with defaults and optional persistence
pub struct SpamKeywords {
    name: String,
    defaults: BTreeSet<String>,
    matcher: RwLock<KeywordMatcher>,
    store: Option<Arc<dyn KeywordStore>>,
}

impl SpamKeywords {
    /// Create an in-memory keyword set seeded with `defaults`
    pub fn new<I, S>(name: impl Into<String>, defaults: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let defaults = normalize_set(defaults);
        Ok(Self {
            name: name.into(),
            matcher: RwLock::new(KeywordMatcher::build(defaults.clone())?),
            defaults,
            store: None,
        })
    }

    /// Keyword set for the hybrid detector
    pub fn detector() -> Result<Self> {
        Self::new("detector_keywords", DETECTOR_KEYWORDS.iter().copied())
    }

    /// Keyword set for the rule-based checker
    pub fn checker() -> Result<Self> {
        Self::new("checker_keywords", CHECKER_KEYWORDS.iter().copied())
    }

    /// Create a keyword set backed by `store`.
    ///
    /// The stored set wins if present; otherwise the defaults are written
    /// to the store.
    pub fn with_store<I, S>(
        name: impl Into<String>,
        defaults: I,
        store: Arc<dyn KeywordStore>,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let defaults = normalize_set(defaults);

        let active = match store.load()? {
            Some(stored) => stored,
            None => {
                store.save(&defaults)?;
                info!("Seeded {} with {} default keywords", name, defaults.len());
                defaults.clone()
            }
        };

        Ok(Self {
            name,
            matcher: RwLock::new(KeywordMatcher::build(active)?),
            defaults,
            store: Some(store),
        })
    }

    /// Current keywords
    pub fn keywords(&self) -> BTreeSet<String> {
        self.matcher.read().keywords.clone()
    }

    /// Number of keywords
    pub fn len(&self) -> usize {
        self.matcher.read().keywords.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.matcher.read().keywords.is_empty()
    }

    /// Add a keyword; surrounding whitespace is trimmed and blanks ignored
    pub fn add(&self, keyword: &str) -> Result<()> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(());
        }
        self.update(|set| {
            set.insert(keyword.to_string());
        })?;
        debug!("Added keyword '{}' to {}", keyword, self.name);
        Ok(())
    }

    /// Remove a keyword
    pub fn remove(&self, keyword: &str) -> Result<()> {
        let keyword = keyword.trim();
        self.update(|set| {
            set.remove(keyword);
        })?;
        debug!("Removed keyword '{}' from {}", keyword, self.name);
        Ok(())
    }

    /// Restore the default keywords
    pub fn reset_to_defaults(&self) -> Result<()> {
        let defaults = self.defaults.clone();
        self.update(move |set| *set = defaults)?;
        info!("Reset {} to defaults", self.name);
        Ok(())
    }

    /// Keywords occurring anywhere in `text`, ignoring case
    pub fn find_matches(&self, text: &str) -> BTreeSet<String> {
        self.matcher.read().find(text)
    }

    /// Check if any keyword occurs in `text`
    pub fn has_match(&self, text: &str) -> bool {
        !self.find_matches(text).is_empty()
    }

    fn update(&self, edit: impl FnOnce(&mut BTreeSet<String>)) -> Result<()> {
        let mut matcher = self.matcher.write();
        let mut next = matcher.keywords.clone();
        edit(&mut next);

        if let Some(store) = &self.store {
            store.save(&next)?;
        }
        *matcher = KeywordMatcher::build(next)?;
        Ok(())
    }
}

#[async_trait]
impl SpamSignal for SpamKeywords {
    async fn evaluate(&self, text: &str) -> ClassificationSignal {
        ClassificationSignal::keywords(self.find_matches(text))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> SignalSource {
        SignalSource::Keyword
    }
}

fn normalize_set<I, S>(keywords: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    keywords
        .into_iter()
        .map(|k| k.into().trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}
