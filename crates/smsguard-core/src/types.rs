//! Core types for SMS Guard

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Probability used whenever a signal is missing or failed
pub const NEUTRAL_PROBABILITY: f64 = 0.5;

/// Decoded concatenation metadata carried by a protocol-tagged segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcatInfo {
    /// Correlation id shared by all segments of one logical message
    pub reference: u32,

    /// Total number of segments the sender split the message into
    pub total_parts: u32,

    /// Position of this segment within the message
    pub index: u32,
}

impl ConcatInfo {
    /// Create new concatenation metadata
    pub fn new(reference: u32, total_parts: u32, index: u32) -> Self {
        Self {
            reference,
            total_parts,
            index,
        }
    }
}

/// One transport-level fragment of a possibly multi-part message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    /// Originating address
    #[serde(default = "default_sender")]
    pub sender: String,

    /// Decoded text content of this segment
    #[serde(default)]
    pub body: String,

    /// Service-centre timestamp in milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Raw user data header bytes, if the transport delivered one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_data_header: Option<Vec<u8>>,

    /// Already-decoded concatenation metadata (takes precedence over the header)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concat: Option<ConcatInfo>,
}

impl Segment {
    /// Create an untagged segment
    pub fn new(sender: impl Into<String>, body: impl Into<String>, timestamp: i64) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
            timestamp,
            user_data_header: None,
            concat: None,
        }
    }

    /// Create a segment tagged with decoded concatenation metadata
    pub fn tagged(
        sender: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
        concat: ConcatInfo,
    ) -> Self {
        Self {
            concat: Some(concat),
            ..Self::new(sender, body, timestamp)
        }
    }

    /// Attach a raw user data header
    pub fn with_user_data_header(mut self, header: impl Into<Vec<u8>>) -> Self {
        self.user_data_header = Some(header.into());
        self
    }
}

fn default_sender() -> String {
    "Unknown".to_string()
}

/// How a reassembled message left the reassembly buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReassemblyOutcome {
    /// Untagged segment without split indicators, never buffered
    Single,

    /// All tagged parts arrived
    Complete,

    /// Timer fired before completion; `expected` is 0 for fallback messages
    TimedOut { received: u32, expected: u32 },
}

/// A complete logical message produced by the reassembler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReassembledMessage {
    /// Reconstructed text
    pub text: String,

    /// Originating address
    pub sender: String,

    /// Timestamp of the first segment seen for this message
    pub timestamp: i64,

    /// Whether the text was assembled from buffered segments
    pub multipart: bool,

    /// How reassembly finished
    pub outcome: ReassemblyOutcome,
}

/// Origin of a classification signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalSource {
    /// Naive Bayes word model
    Bayes,
    /// External numeric inference backend
    Inference,
    /// Keyword rule matcher
    Keyword,
}

/// One independent signal feeding the hybrid decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationSignal {
    /// Signal origin
    pub source: SignalSource,

    /// Spam probability in [0,1], unset for pure rule signals
    pub probability: Option<f64>,

    /// Keywords matched (keyword signals only)
    #[serde(default)]
    pub matched_keywords: BTreeSet<String>,
}

impl ClassificationSignal {
    /// Create a probability signal
    pub fn probability(source: SignalSource, probability: f64) -> Self {
        Self {
            source,
            probability: Some(probability),
            matched_keywords: BTreeSet::new(),
        }
    }

    /// Create a keyword signal
    pub fn keywords(matched_keywords: BTreeSet<String>) -> Self {
        Self {
            source: SignalSource::Keyword,
            probability: None,
            matched_keywords,
        }
    }

    /// Probability, or neutral when unset
    pub fn probability_or_neutral(&self) -> f64 {
        self.probability.unwrap_or(NEUTRAL_PROBABILITY)
    }
}

/// Final spam decision for one logical message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Boolean verdict from the ordered decision tiers
    pub is_spam: bool,

    /// Weighted fusion of the probability signals, always in [0,1]
    pub final_probability: f64,

    /// Inference backend probability
    pub ml_confidence: f64,

    /// Naive Bayes probability
    pub bayesian_confidence: f64,

    /// Keywords found in the text
    pub matched_keywords: BTreeSet<String>,

    /// Name of the decision tier that fired, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_by: Option<String>,
}

/// A reassembled message together with its classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifiedMessage {
    /// Originating address
    pub sender: String,

    /// Full message text
    pub content: String,

    /// Timestamp of the first segment
    pub timestamp: i64,

    /// Classification outcome
    pub result: ClassificationResult,
}
