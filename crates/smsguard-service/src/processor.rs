//! Classification pipeline behind the reassembler
//!
//! Each reassembled message is classified, announced to the notification
//! sink if it is spam, and then persisted. Persistence failures never undo
//! the first two steps: a failed insert is retried once with truncated
//! content and no keywords, and a second failure only drops the record.

use serde::Serialize;
use smsguard_classifiers::SpamClassifier;
use smsguard_core::{
    ClassifiedMessage, MessageRecord, MessageStore, NotificationSink, ReassembledMessage,
    ReassemblyOutcome, Result,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

/// Default content length kept when a save is retried
pub const DEFAULT_RETRY_TRUNCATE_CHARS: usize = 100;

/// One message after classification and storage
#[derive(Debug, Clone)]
pub struct ProcessedMessage {
    pub message: ClassifiedMessage,
    pub outcome: ReassemblyOutcome,
    pub multipart: bool,
    /// Store id, `None` if both save attempts failed
    pub stored_id: Option<u64>,
}

/// Totals over a processing run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProcessingSummary {
    pub messages: usize,
    pub spam: usize,
    pub ham: usize,
    pub single: usize,
    pub complete: usize,
    pub timed_out: usize,
    pub stored: usize,
    pub store_failures: usize,
}

impl ProcessingSummary {
    fn record(&mut self, processed: &ProcessedMessage) {
        self.messages += 1;
        if processed.message.result.is_spam {
            self.spam += 1;
        } else {
            self.ham += 1;
        }
        match processed.outcome {
            ReassemblyOutcome::Single => self.single += 1,
            ReassemblyOutcome::Complete => self.complete += 1,
            ReassemblyOutcome::TimedOut { .. } => self.timed_out += 1,
        }
        match processed.stored_id {
            Some(_) => self.stored += 1,
            None => self.store_failures += 1,
        }
    }

    fn record_join(&mut self, joined: std::result::Result<ProcessedMessage, JoinError>) {
        match joined {
            Ok(processed) => self.record(&processed),
            Err(e) => error!("Message processing task failed: {}", e),
        }
    }
}

/// Classifies, notifies, and stores reassembled messages
pub struct MessageProcessor {
    classifier: Arc<SpamClassifier>,
    store: Arc<dyn MessageStore>,
    notifier: Arc<dyn NotificationSink>,
    retry_truncate_chars: usize,
}

impl MessageProcessor {
    pub fn new(
        classifier: Arc<SpamClassifier>,
        store: Arc<dyn MessageStore>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            classifier,
            store,
            notifier,
            retry_truncate_chars: DEFAULT_RETRY_TRUNCATE_CHARS,
        }
    }

    /// Content length kept when a save is retried
    pub fn with_retry_truncation(mut self, chars: usize) -> Self {
        self.retry_truncate_chars = chars;
        self
    }

    pub fn classifier(&self) -> &Arc<SpamClassifier> {
        &self.classifier
    }

    /// Handle one reassembled message
    pub async fn process(&self, message: ReassembledMessage) -> ProcessedMessage {
        let result = self.classifier.classify(&message.text).await;
        let classified = ClassifiedMessage {
            sender: message.sender,
            content: message.text,
            timestamp: message.timestamp,
            result,
        };

        if classified.result.is_spam {
            self.notifier.notify(&classified);
        } else {
            debug!(
                "Legitimate message from {} (final {:.3})",
                classified.sender, classified.result.final_probability
            );
        }

        let stored_id = self.persist(&classified).await;
        ProcessedMessage {
            message: classified,
            outcome: message.outcome,
            multipart: message.multipart,
            stored_id,
        }
    }

    async fn persist(&self, message: &ClassifiedMessage) -> Option<u64> {
        let record = MessageRecord::from(message);
        match self.store.insert(record.clone()).await {
            Ok(id) => return Some(id),
            Err(e) => {
                metrics::counter!("smsguard_store_failures_total", "attempt" => "initial")
                    .increment(1);
                warn!(
                    "Failed to store message from {}: {}; retrying with minimal record",
                    message.sender, e
                );
            }
        }

        let minimal = MessageRecord {
            content: record.content.chars().take(self.retry_truncate_chars).collect(),
            matched_keywords: Vec::new(),
            ..record
        };
        match self.store.insert(minimal).await {
            Ok(id) => Some(id),
            Err(e) => {
                metrics::counter!("smsguard_store_failures_total", "attempt" => "retry")
                    .increment(1);
                error!(
                    "Failed to store even a minimal record for message from {}: {}",
                    message.sender, e
                );
                None
            }
        }
    }

    /// Process messages until the channel closes; messages run concurrently
    pub async fn run(
        self: Arc<Self>,
        mut receiver: mpsc::UnboundedReceiver<ReassembledMessage>,
    ) -> ProcessingSummary {
        let mut tasks = JoinSet::new();
        let mut summary = ProcessingSummary::default();

        loop {
            tokio::select! {
                next = receiver.recv() => match next {
                    Some(message) => {
                        let processor = Arc::clone(&self);
                        tasks.spawn(async move { processor.process(message).await });
                    }
                    None => break,
                },
                Some(joined) = tasks.join_next() => summary.record_join(joined),
            }
        }

        while let Some(joined) = tasks.join_next().await {
            summary.record_join(joined);
        }

        info!(
            "Processed {} messages: {} spam, {} ham, {} store failures",
            summary.messages, summary.spam, summary.ham, summary.store_failures
        );
        summary
    }

    /// User feedback: the stored message is spam. Trains the word model.
    ///
    /// Returns `false` if the id is unknown.
    pub async fn mark_as_spam(&self, id: u64) -> Result<bool> {
        self.feedback(id, true).await
    }

    /// User feedback: the stored message is legitimate. Trains the word model.
    pub async fn restore(&self, id: u64) -> Result<bool> {
        self.feedback(id, false).await
    }

    async fn feedback(&self, id: u64, is_spam: bool) -> Result<bool> {
        let Some(stored) = self.store.get(id).await? else {
            return Ok(false);
        };

        let updated = if is_spam {
            self.store.mark_as_spam(id).await?
        } else {
            self.store.restore(id).await?
        };
        if !updated {
            return Ok(false);
        }

        if self.classifier.learn(&stored.record.content, is_spam) {
            debug!("Trained word model from feedback on message {}", id);
        }
        Ok(true)
    }

    /// Remove stored messages older than `cutoff` (milliseconds since epoch)
    pub async fn purge_older_than(&self, cutoff: i64) -> Result<usize> {
        let removed = self.store.delete_older_than(cutoff).await?;
        info!("Purged {} stored messages older than {}", removed, cutoff);
        Ok(removed)
    }
}
