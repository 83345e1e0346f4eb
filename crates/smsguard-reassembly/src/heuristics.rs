//! Split detection for segments that arrive without concatenation metadata

use regex::Regex;
use smsguard_core::{Error, Result};

/// Flags untagged segments that look like one piece of a longer message.
///
/// A segment is suspected when it is longer than `min_length` characters
/// and carries a truncation marker: an ellipsis, an `(n/m)` counter, or a
/// `Part n` label.
#[derive(Debug, Clone)]
pub struct SplitDetector {
    min_length: usize,
    markers: Regex,
}

impl SplitDetector {
    /// Create a detector for segments longer than `min_length` characters
    pub fn new(min_length: usize) -> Result<Self> {
        let markers = Regex::new(r"\.\.\.|\(\d+/\d+\)|Part \d+")
            .map_err(|e| Error::config(format!("Failed to compile split markers: {}", e)))?;
        Ok(Self {
            min_length,
            markers,
        })
    }

    /// Check if `body` should be buffered as a fallback part
    pub fn is_suspected_split(&self, body: &str) -> bool {
        body.chars().count() > self.min_length && self.markers.is_match(body)
    }
}
