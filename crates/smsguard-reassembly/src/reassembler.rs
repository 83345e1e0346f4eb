//! Keyed, timeout-driven segment buffer
//!
//! Every open message lives in one table behind a single mutex, together
//! with the cancellation token of its current timer and a generation number.
//! Arrivals replace the token and bump the generation under that lock; a
//! timer that fires re-checks its generation under the same lock before
//! emitting. Removal from the table is the only way to emit a buffered
//! message, so each key produces at most one message.

use crate::config::ReassemblyConfig;
use crate::heuristics::SplitDetector;
use crate::udh;
use parking_lot::Mutex;
use serde::Serialize;
use smsguard_core::{ConcatInfo, Error, ReassembledMessage, ReassemblyOutcome, Result, Segment};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, Notify};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Identity of an open message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageKey {
    /// Correlated by the sender's concatenation reference
    Tagged { sender: String, reference: u32 },

    /// Correlated heuristically, keyed by the first part's timestamp
    Fallback { sender: String, timestamp: i64 },
}

impl MessageKey {
    pub fn sender(&self) -> &str {
        match self {
            Self::Tagged { sender, .. } | Self::Fallback { sender, .. } => sender,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

impl fmt::Display for MessageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tagged { sender, reference } => write!(f, "{}_{}", sender, reference),
            Self::Fallback { sender, timestamp } => write!(f, "{}_{}_fallback", sender, timestamp),
        }
    }
}

/// Snapshot of the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReassemblyStats {
    /// Open messages
    pub pending: usize,

    /// Open messages still missing parts
    pub incomplete: usize,
}

struct PendingMessage {
    sender: String,
    first_timestamp: i64,
    /// 0 when unknown (fallback)
    total_parts: u32,
    parts: BTreeMap<u32, String>,
    created_at: Instant,
    sequence: u64,
    timer: CancellationToken,
    generation: u64,
}

impl PendingMessage {
    fn new(sender: String, first_timestamp: i64, total_parts: u32, sequence: u64) -> Self {
        Self {
            sender,
            first_timestamp,
            total_parts,
            parts: BTreeMap::new(),
            created_at: Instant::now(),
            sequence,
            timer: CancellationToken::new(),
            generation: 0,
        }
    }

    fn is_complete(&self) -> bool {
        self.total_parts > 0 && self.parts.len() == self.total_parts as usize
    }

    fn into_message(self, outcome: ReassemblyOutcome) -> ReassembledMessage {
        self.timer.cancel();
        ReassembledMessage {
            text: self.parts.into_values().collect(),
            sender: self.sender,
            timestamp: self.first_timestamp,
            multipart: true,
            outcome,
        }
    }
}

#[derive(Default)]
struct BufferState {
    entries: HashMap<MessageKey, PendingMessage>,
    next_id: u64,
}

impl BufferState {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

struct Inner {
    config: ReassemblyConfig,
    detector: SplitDetector,
    state: Mutex<BufferState>,
    output: mpsc::UnboundedSender<ReassembledMessage>,
    runtime: Handle,
    idle: Notify,
}

/// Buffers multi-part segments and emits complete logical messages.
///
/// Cloning is cheap; clones share one buffer and one output channel.
#[derive(Clone)]
pub struct SegmentReassembler {
    inner: Arc<Inner>,
}

impl SegmentReassembler {
    /// Create a reassembler and the receiving end of its output.
    ///
    /// Must be called from within a Tokio runtime; timers are spawned on it.
    pub fn new(
        config: ReassemblyConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ReassembledMessage>)> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::config(format!("Reassembler requires a Tokio runtime: {}", e)))?;
        let detector = SplitDetector::new(config.split_min_length)?;
        let (output, receiver) = mpsc::unbounded_channel();

        info!(
            "Segment reassembler started (tagged timeout {:?}, fallback timeout {:?}, capacity {})",
            config.tagged_timeout(),
            config.fallback_timeout(),
            config.capacity
        );

        let inner = Inner {
            config,
            detector,
            state: Mutex::new(BufferState::default()),
            output,
            runtime,
            idle: Notify::new(),
        };
        Ok((
            Self {
                inner: Arc::new(inner),
            },
            receiver,
        ))
    }

    /// Accept one segment; never fails
    pub fn ingest(&self, segment: Segment) {
        metrics::counter!("smsguard_segments_received_total").increment(1);
        debug!(
            sender = %segment.sender,
            chars = segment.body.chars().count(),
            "Segment received"
        );

        match concat_info(&segment) {
            Some(info) => self.inner.ingest_tagged(segment, info),
            None if self.inner.detector.is_suspected_split(&segment.body) => {
                self.inner.ingest_fallback(segment)
            }
            None => self.inner.emit(ReassembledMessage {
                text: segment.body,
                sender: segment.sender,
                timestamp: segment.timestamp,
                multipart: false,
                outcome: ReassemblyOutcome::Single,
            }),
        }
    }

    /// Current buffer occupancy
    pub fn stats(&self) -> ReassemblyStats {
        let state = self.inner.state.lock();
        ReassemblyStats {
            pending: state.entries.len(),
            incomplete: state.entries.values().filter(|p| !p.is_complete()).count(),
        }
    }

    /// Number of open messages
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    /// Cancel every timer and drop all buffered state without emitting
    pub fn cleanup(&self) {
        let mut state = self.inner.state.lock();
        let dropped = state.entries.len();
        for (_, pending) in state.entries.drain() {
            pending.timer.cancel();
        }
        drop(state);

        self.inner.idle.notify_waiters();
        info!("Reassembler cleanup dropped {} pending messages", dropped);
    }

    /// Resolve once no message is open
    pub async fn wait_until_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            let empty = self.inner.state.lock().entries.is_empty();
            if empty {
                return;
            }
            notified.await;
        }
    }
}

/// Concatenation metadata of a segment, `None` when absent or malformed
fn concat_info(segment: &Segment) -> Option<ConcatInfo> {
    let parsed = match (&segment.concat, &segment.user_data_header) {
        (Some(info), _) => udh::validate(*info).map(Some),
        (None, Some(header)) => udh::parse_concat(header),
        (None, None) => Ok(None),
    };

    match parsed {
        Ok(info) => info,
        Err(e) => {
            debug!(
                "Segment from {} treated as untagged: {}",
                segment.sender, e
            );
            None
        }
    }
}

fn outcome_label(outcome: &ReassemblyOutcome) -> &'static str {
    match outcome {
        ReassemblyOutcome::Single => "single",
        ReassemblyOutcome::Complete => "complete",
        ReassemblyOutcome::TimedOut { .. } => "timed_out",
    }
}

impl Inner {
    fn ingest_tagged(self: &Arc<Self>, segment: Segment, info: ConcatInfo) {
        let key = MessageKey::Tagged {
            sender: segment.sender.clone(),
            reference: info.reference,
        };

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if !state.entries.contains_key(&key) {
            self.make_room(state);
        }
        let sequence = state.next_id();
        let generation = state.next_id();

        let entry = state.entries.entry(key.clone()).or_insert_with(|| {
            PendingMessage::new(segment.sender, segment.timestamp, info.total_parts, sequence)
        });
        entry.parts.insert(info.index, segment.body);
        debug!(
            "Buffered part {}/{} of {} ({} received)",
            info.index,
            entry.total_parts,
            key,
            entry.parts.len()
        );

        if entry.is_complete() {
            if let Some(pending) = state.entries.remove(&key) {
                debug!("Message {} complete with {} parts", key, pending.parts.len());
                self.emit(pending.into_message(ReassemblyOutcome::Complete));
            }
            self.notify_if_idle(state);
        } else {
            self.rearm(&key, entry, generation, self.config.tagged_timeout());
        }
    }

    fn ingest_fallback(self: &Arc<Self>, segment: Segment) {
        let window = self.config.recency_window_ms;

        let mut guard = self.state.lock();
        let state = &mut *guard;
        let related = state
            .entries
            .iter()
            .filter(|(key, pending)| {
                key.is_fallback()
                    && pending.total_parts == 0
                    && pending.sender == segment.sender
                    && segment.timestamp.abs_diff(pending.first_timestamp) < window
            })
            .min_by_key(|(_, pending)| pending.sequence)
            .map(|(key, _)| key.clone());

        let key = match related {
            Some(key) => key,
            None => {
                let key = MessageKey::Fallback {
                    sender: segment.sender.clone(),
                    timestamp: segment.timestamp,
                };
                if !state.entries.contains_key(&key) {
                    self.make_room(state);
                }
                key
            }
        };
        let sequence = state.next_id();
        let generation = state.next_id();

        let entry = state.entries.entry(key.clone()).or_insert_with(|| {
            PendingMessage::new(segment.sender, segment.timestamp, 0, sequence)
        });
        let index = entry.parts.len() as u32;
        entry.parts.insert(index, segment.body);
        debug!("Buffered fallback part {} of {}", index + 1, key);

        self.rearm(&key, entry, generation, self.config.fallback_timeout());
    }

    /// Replace the entry's timer; the old one can no longer emit
    fn rearm(
        self: &Arc<Self>,
        key: &MessageKey,
        entry: &mut PendingMessage,
        generation: u64,
        timeout: Duration,
    ) {
        entry.timer.cancel();
        let token = CancellationToken::new();
        entry.timer = token.clone();
        entry.generation = generation;

        let deadline = Instant::now() + timeout;
        let inner = Arc::clone(self);
        let key = key.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep_until(deadline) => inner.expire(&key, generation),
            }
        });
    }

    fn expire(&self, key: &MessageKey, generation: u64) {
        let mut state = self.state.lock();
        let is_current = state
            .entries
            .get(key)
            .is_some_and(|pending| pending.generation == generation);
        if !is_current {
            return;
        }
        let Some(pending) = state.entries.remove(key) else {
            return;
        };

        let received = pending.parts.len() as u32;
        let expected = pending.total_parts;
        if key.is_fallback() {
            debug!("Fallback message {} closed with {} parts", key, received);
        } else {
            warn!(
                "Timeout for message {}, emitting {}/{} parts",
                key, received, expected
            );
        }

        self.emit(pending.into_message(ReassemblyOutcome::TimedOut { received, expected }));
        self.notify_if_idle(&state);
    }

    /// Evict the oldest open messages when at capacity
    fn make_room(&self, state: &mut BufferState) {
        if state.entries.len() < self.config.capacity {
            return;
        }

        // Always free at least the slot about to be taken
        let excess = state
            .entries
            .len()
            .saturating_sub(self.config.eviction_target())
            .max(1);
        let mut oldest: Vec<(Instant, u64, MessageKey)> = state
            .entries
            .iter()
            .map(|(key, pending)| (pending.created_at, pending.sequence, key.clone()))
            .collect();
        oldest.sort_by_key(|(created_at, sequence, _)| (*created_at, *sequence));

        for (_, _, key) in oldest.into_iter().take(excess) {
            if let Some(pending) = state.entries.remove(&key) {
                pending.timer.cancel();
                debug!(
                    "Evicted pending message {} with {} parts",
                    key,
                    pending.parts.len()
                );
            }
        }
        metrics::counter!("smsguard_reassembly_evictions_total").increment(excess as u64);
    }

    fn notify_if_idle(&self, state: &BufferState) {
        if state.entries.is_empty() {
            self.idle.notify_waiters();
        }
    }

    fn emit(&self, message: ReassembledMessage) {
        metrics::counter!(
            "smsguard_messages_emitted_total",
            "outcome" => outcome_label(&message.outcome)
        )
        .increment(1);

        if self.output.send(message).is_err() {
            warn!("Reassembled message dropped: receiver closed");
        }
    }
}
