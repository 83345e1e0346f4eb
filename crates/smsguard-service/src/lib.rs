//! SMS Guard Service
//!
//! Wires segment reassembly, spam classification, message storage, and
//! spam notification into one filter, plus the `smsguard` command line.

pub mod config;
pub mod filter;
pub mod notify;
pub mod processor;
pub mod store;

pub use config::{ConfigOverrides, NotificationConfig, ServiceConfig, StorageConfig};
pub use filter::SmsFilter;
pub use notify::{BroadcastNotifier, FanoutNotifier, LogNotifier};
pub use processor::{MessageProcessor, ProcessedMessage, ProcessingSummary};
pub use store::InMemoryStore;
