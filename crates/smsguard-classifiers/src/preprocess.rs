//! Text normalization shared by the Bayes model and the inference backend

use regex::Regex;
use smsguard_core::{Error, Result};
use tracing::trace;

/// Canonicalizes raw message text.
///
/// Output is lower-case ASCII letters, digits, and `! ? . ,` separated by
/// single spaces. Emoji are dropped, runs of repeated `!`, `?` or `.` are
/// collapsed, and every other character becomes a space.
#[derive(Debug, Clone)]
pub struct TextPreprocessor {
    repeated_bang: Regex,
    repeated_question: Regex,
    repeated_dot: Regex,
    disallowed: Regex,
    whitespace: Regex,
}

impl TextPreprocessor {
    /// Create a new preprocessor
    pub fn new() -> Result<Self> {
        Ok(Self {
            repeated_bang: compile(r"!{2,}")?,
            repeated_question: compile(r"\?{2,}")?,
            repeated_dot: compile(r"\.{2,}")?,
            disallowed: compile(r"[^a-z0-9\s!?.,]")?,
            whitespace: compile(r"\s+")?,
        })
    }

    /// Normalize `text`; blank input is returned unchanged
    pub fn preprocess(&self, text: &str) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let lowered = text.to_lowercase();
        let without_emoji: String = lowered.chars().filter(|c| !is_emoji(*c)).collect();

        let cleaned = self.repeated_bang.replace_all(&without_emoji, "!");
        let cleaned = self.repeated_question.replace_all(&cleaned, "?");
        let cleaned = self.repeated_dot.replace_all(&cleaned, ".");
        let cleaned = self.disallowed.replace_all(&cleaned, " ");
        let cleaned = self.whitespace.replace_all(&cleaned, " ");
        let cleaned = cleaned.trim().to_string();

        trace!("Preprocessed '{}' -> '{}'", text, cleaned);
        cleaned
    }
}

impl Default for TextPreprocessor {
    fn default() -> Self {
        Self::new().expect("Failed to create text preprocessor")
    }
}

/// Lower-cased whitespace tokens, as used for Bayes scoring and training
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| Error::config(format!("Failed to compile regex '{}': {}", pattern, e)))
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F600..=0x1F64F // emoticons
            | 0x1F300..=0x1F5FF // symbols and pictographs
            | 0x1F680..=0x1F6FF // transport and map
            | 0x1F1E0..=0x1F1FF // regional indicators
            | 0x2600..=0x26FF // misc symbols
            | 0x2700..=0x27BF // dingbats
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_collapses_whitespace() {
        let pre = TextPreprocessor::new().unwrap();
        assert_eq!(pre.preprocess("  Hello   WORLD \n"), "hello world");
    }

    #[test]
    fn test_strips_emoji_and_symbols() {
        let pre = TextPreprocessor::new().unwrap();
        assert_eq!(pre.preprocess("WIN $$$ now 😀🚀 #prize"), "win now prize");
    }

    #[test]
    fn test_collapses_repeated_punctuation() {
        let pre = TextPreprocessor::new().unwrap();
        assert_eq!(pre.preprocess("Call now!!! Really??? Wait....."), "call now! really? wait.");
    }

    #[test]
    fn test_tokenize_lowercases_and_drops_empty() {
        assert_eq!(tokenize(" Win  FREE\tcash "), vec!["win", "free", "cash"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_blank_text_unchanged() {
        let pre = TextPreprocessor::new().unwrap();
        assert_eq!(pre.preprocess("   "), "   ");
        assert_eq!(pre.preprocess(""), "");
    }
}
