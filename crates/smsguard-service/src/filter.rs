//! End-to-end filter: reassembler feeding the message processor

use crate::config::ServiceConfig;
use crate::notify::{BroadcastNotifier, FanoutNotifier, LogNotifier};
use crate::processor::{MessageProcessor, ProcessingSummary};
use crate::store::InMemoryStore;
use smsguard_classifiers::{ClassifierBuilder, SpamClassifier};
use smsguard_core::{ClassifiedMessage, Segment};
use smsguard_reassembly::SegmentReassembler;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::info;

/// A running filter.
///
/// Segments go in through [`SmsFilter::ingest`]; reassembled messages are
/// classified on a background task. [`SmsFilter::finish`] waits for every
/// open message to complete or time out and returns the run totals.
pub struct SmsFilter {
    reassembler: SegmentReassembler,
    processor: Arc<MessageProcessor>,
    store: Arc<InMemoryStore>,
    notifications: Arc<BroadcastNotifier>,
    worker: JoinHandle<ProcessingSummary>,
}

impl SmsFilter {
    /// Build the classifier from configuration and start the filter
    pub fn from_config(config: &ServiceConfig) -> anyhow::Result<Self> {
        let classifier = ClassifierBuilder::new(config.classifier.clone()).build()?;
        Self::start(config, classifier)
    }

    /// Start the filter around an already-built classifier.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &ServiceConfig, classifier: SpamClassifier) -> anyhow::Result<Self> {
        config.validate()?;
        let (reassembler, messages) = SegmentReassembler::new(config.reassembly.clone())?;

        let store = Arc::new(InMemoryStore::new());
        let notifications = Arc::new(BroadcastNotifier::new(
            config.notifications.channel_capacity,
        ));
        let mut notifier = FanoutNotifier::new().with(notifications.clone());
        if config.notifications.log {
            notifier = notifier.with(Arc::new(LogNotifier));
        }

        let processor = Arc::new(
            MessageProcessor::new(Arc::new(classifier), store.clone(), Arc::new(notifier))
                .with_retry_truncation(config.storage.retry_truncate_chars),
        );
        let worker = tokio::spawn(processor.clone().run(messages));

        info!(
            "SMS filter started in {:?} mode",
            processor.classifier().mode()
        );
        Ok(Self {
            reassembler,
            processor,
            store,
            notifications,
            worker,
        })
    }

    /// Accept one transport segment
    pub fn ingest(&self, segment: Segment) {
        self.reassembler.ingest(segment);
    }

    pub fn reassembler(&self) -> &SegmentReassembler {
        &self.reassembler
    }

    /// Processor, for feedback and retention calls
    pub fn processor(&self) -> &Arc<MessageProcessor> {
        &self.processor
    }

    pub fn store(&self) -> &Arc<InMemoryStore> {
        &self.store
    }

    /// Receive every spam notification from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ClassifiedMessage> {
        self.notifications.subscribe()
    }

    /// Wait for open messages, then drain the processor
    pub async fn finish(self) -> anyhow::Result<ProcessingSummary> {
        let pending = self.reassembler.pending_count();
        if pending > 0 {
            info!("Waiting for {} open messages", pending);
        }
        self.reassembler.wait_until_idle().await;

        // The output channel closes once the last reassembler handle is gone
        drop(self.reassembler);
        let summary = self.worker.await?;
        Ok(summary)
    }
}
