//! In-memory message store

use async_trait::async_trait;
use parking_lot::Mutex;
use smsguard_core::{MessageRecord, MessageStore, Result, StoredMessage};
use std::collections::BTreeMap;
use tokio::sync::watch;
use tracing::debug;

#[derive(Default)]
struct StoreState {
    next_id: u64,
    records: BTreeMap<u64, MessageRecord>,
}

impl StoreState {
    /// Records newest first, ties broken by id
    fn snapshot(&self) -> Vec<StoredMessage> {
        let mut messages: Vec<StoredMessage> = self
            .records
            .iter()
            .map(|(id, record)| StoredMessage {
                id: *id,
                record: record.clone(),
            })
            .collect();
        messages.sort_by(|a, b| {
            b.record
                .timestamp
                .cmp(&a.record.timestamp)
                .then(b.id.cmp(&a.id))
        });
        messages
    }
}

/// Process-local [`MessageStore`] with a live record stream
pub struct InMemoryStore {
    state: Mutex<StoreState>,
    updates: watch::Sender<Vec<StoredMessage>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        let (updates, _) = watch::channel(Vec::new());
        Self {
            state: Mutex::new(StoreState::default()),
            updates,
        }
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every stored message, newest first
    pub fn messages(&self) -> Vec<StoredMessage> {
        self.state.lock().snapshot()
    }

    /// Messages with the given spam flag, newest first
    pub fn messages_by_flag(&self, is_spam: bool) -> Vec<StoredMessage> {
        self.messages()
            .into_iter()
            .filter(|m| m.record.is_spam == is_spam)
            .collect()
    }

    fn publish(&self, state: &StoreState) {
        self.updates.send_replace(state.snapshot());
    }

    fn set_flag(&self, id: u64, is_spam: bool) -> bool {
        let mut state = self.state.lock();
        let Some(record) = state.records.get_mut(&id) else {
            return false;
        };
        record.is_spam = is_spam;
        self.publish(&state);
        true
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryStore {
    async fn insert(&self, message: MessageRecord) -> Result<u64> {
        let mut state = self.state.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.records.insert(id, message);
        self.publish(&state);
        debug!("Stored message {}", id);
        Ok(id)
    }

    async fn get(&self, id: u64) -> Result<Option<StoredMessage>> {
        let state = self.state.lock();
        Ok(state.records.get(&id).map(|record| StoredMessage {
            id,
            record: record.clone(),
        }))
    }

    async fn delete_older_than(&self, cutoff: i64) -> Result<usize> {
        let mut state = self.state.lock();
        let before = state.records.len();
        state.records.retain(|_, record| record.timestamp >= cutoff);
        let removed = before - state.records.len();
        if removed > 0 {
            self.publish(&state);
        }
        Ok(removed)
    }

    async fn delete_all(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.records.clear();
        self.publish(&state);
        Ok(())
    }

    async fn mark_as_spam(&self, id: u64) -> Result<bool> {
        Ok(self.set_flag(id, true))
    }

    async fn restore(&self, id: u64) -> Result<bool> {
        Ok(self.set_flag(id, false))
    }

    fn subscribe(&self) -> watch::Receiver<Vec<StoredMessage>> {
        self.updates.subscribe()
    }
}
