//! Notification delivery contract

use crate::ClassifiedMessage;

/// Fire-and-forget sink for classified messages.
///
/// Implementations must not block; delivery failures are the sink's own
/// business and are never reported back to the pipeline.
pub trait NotificationSink: Send + Sync {
    /// Deliver a notification for a classified message
    fn notify(&self, message: &ClassifiedMessage);
}
