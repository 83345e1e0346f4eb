//! Notification sinks

use chrono::{DateTime, Utc};
use smsguard_core::{ClassifiedMessage, NotificationSink};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Writes a log line per notification
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn notify(&self, message: &ClassifiedMessage) {
        let received = DateTime::<Utc>::from_timestamp_millis(message.timestamp)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| message.timestamp.to_string());
        let preview: String = message.content.chars().take(50).collect();

        info!(
            sender = %message.sender,
            received = %received,
            probability = message.result.final_probability,
            keywords = ?message.result.matched_keywords,
            "Spam detected: {}",
            preview
        );
    }
}

/// Publishes notifications to any number of subscribers
pub struct BroadcastNotifier {
    sender: broadcast::Sender<ClassifiedMessage>,
}

impl BroadcastNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ClassifiedMessage> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastNotifier {
    fn default() -> Self {
        Self::new(1024)
    }
}

impl NotificationSink for BroadcastNotifier {
    fn notify(&self, message: &ClassifiedMessage) {
        // no subscribers is fine
        let _ = self.sender.send(message.clone());
    }
}

/// Forwards every notification to each inner sink in order
#[derive(Default)]
pub struct FanoutNotifier {
    sinks: Vec<Arc<dyn NotificationSink>>,
}

impl FanoutNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink
    pub fn with(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanoutNotifier {
    fn notify(&self, message: &ClassifiedMessage) {
        for sink in &self.sinks {
            sink.notify(message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use smsguard_core::ClassificationResult;
    use std::collections::BTreeSet;

    fn spam() -> ClassifiedMessage {
        ClassifiedMessage {
            sender: "+15550100".to_string(),
            content: "WIN a prize".to_string(),
            timestamp: 1_700_000_000_000,
            result: ClassificationResult {
                is_spam: true,
                final_probability: 0.8,
                ml_confidence: 0.5,
                bayesian_confidence: 0.5,
                matched_keywords: BTreeSet::from(["win".to_string()]),
                decided_by: Some("keyword_rule".to_string()),
            },
        }
    }

    #[tokio::test]
    async fn test_broadcast_reaches_subscribers() {
        let notifier = BroadcastNotifier::new(8);
        let mut first = notifier.subscribe();
        let mut second = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 2);

        notifier.notify(&spam());
        assert_eq!(first.recv().await.unwrap().content, "WIN a prize");
        assert_eq!(second.recv().await.unwrap().sender, "+15550100");
    }

    #[test]
    fn test_broadcast_without_subscribers() {
        BroadcastNotifier::default().notify(&spam());
    }

    #[tokio::test]
    async fn test_fanout_forwards_to_all() {
        let broadcast = Arc::new(BroadcastNotifier::new(8));
        let mut rx = broadcast.subscribe();
        let fanout = FanoutNotifier::new()
            .with(Arc::new(LogNotifier))
            .with(broadcast.clone());
        assert_eq!(fanout.len(), 2);

        fanout.notify(&spam());
        assert!(rx.recv().await.unwrap().result.is_spam);
    }
}
