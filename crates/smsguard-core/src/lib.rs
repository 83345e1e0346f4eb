//! SMS Guard Core
//!
//! Core types, traits, and utilities shared across SMS Guard components.
//!
//! This crate provides:
//! - Transport segment and reassembled message types
//! - Classification signal and result types
//! - Error types and result handling
//! - Collaborator contracts for message persistence and notification delivery

pub mod error;
pub mod notify;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use notify::NotificationSink;
pub use store::{MessageRecord, MessageStore, StoredMessage};
pub use types::{
    ClassificationResult, ClassificationSignal, ClassifiedMessage, ConcatInfo,
    ReassembledMessage, ReassemblyOutcome, Segment, SignalSource, NEUTRAL_PROBABILITY,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::notify::NotificationSink;
    pub use crate::store::{MessageRecord, MessageStore, StoredMessage};
    pub use crate::types::{
        ClassificationResult, ClassificationSignal, ClassifiedMessage, ReassembledMessage,
        Segment, SignalSource,
    };
}
