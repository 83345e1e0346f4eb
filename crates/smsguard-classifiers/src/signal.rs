//! Signal trait and common types

use async_trait::async_trait;
use smsguard_core::{ClassificationSignal, SignalSource};

/// One independent input to the hybrid decision.
///
/// Evaluation is infallible by contract: a signal that cannot produce a
/// value reports the neutral probability instead of an error.
#[async_trait]
pub trait SpamSignal: Send + Sync {
    /// Evaluate the given text
    async fn evaluate(&self, text: &str) -> ClassificationSignal;

    /// Get the signal name
    fn name(&self) -> &str;

    /// Get the signal origin
    fn source(&self) -> SignalSource;
}

/// Force a raw probability into [0,1], mapping NaN and infinities to neutral
pub fn sanitize_probability(value: f64) -> f64 {
    if !value.is_finite() {
        smsguard_core::NEUTRAL_PROBABILITY
    } else {
        value.clamp(0.0, 1.0)
    }
}
