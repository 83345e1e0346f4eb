//! Message persistence contract

use crate::{ClassifiedMessage, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// A message as handed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub sender: String,
    pub content: String,
    pub timestamp: i64,
    pub is_spam: bool,
    pub ml_confidence: f64,
    pub bayesian_confidence: f64,
    #[serde(default)]
    pub matched_keywords: Vec<String>,
}

impl From<&ClassifiedMessage> for MessageRecord {
    fn from(message: &ClassifiedMessage) -> Self {
        Self {
            sender: message.sender.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
            is_spam: message.result.is_spam,
            ml_confidence: message.result.ml_confidence,
            bayesian_confidence: message.result.bayesian_confidence,
            matched_keywords: message.result.matched_keywords.iter().cloned().collect(),
        }
    }
}

/// A record with its store-assigned id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub id: u64,
    #[serde(flatten)]
    pub record: MessageRecord,
}

/// Storage backend for classified messages.
///
/// The storage engine is not part of the filter; anything that can honour
/// these calls can sit behind it.
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a message and return its id
    async fn insert(&self, message: MessageRecord) -> Result<u64>;

    /// Fetch a message by id
    async fn get(&self, id: u64) -> Result<Option<StoredMessage>>;

    /// Delete every message with a timestamp before `cutoff`, returning how many went
    async fn delete_older_than(&self, cutoff: i64) -> Result<usize>;

    /// Delete everything
    async fn delete_all(&self) -> Result<()>;

    /// Flag a message as spam; returns false if the id is unknown
    async fn mark_as_spam(&self, id: u64) -> Result<bool>;

    /// Clear the spam flag on a message; returns false if the id is unknown
    async fn restore(&self, id: u64) -> Result<bool>;

    /// Live view of the current records, newest first
    fn subscribe(&self) -> watch::Receiver<Vec<StoredMessage>>;
}
