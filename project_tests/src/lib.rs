//! # Shared Test Fixtures
//!
//! Sinks and stores with observable behaviour, used by the integration tests
//! under `tests/`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lib_telemetry::{SlotStore, StoreError, UploadBatch, UploadError, UploadSink};
use serde_json::{json, Value};
use tokio::sync::mpsc;

/// A sink that forwards every batch to a channel and reports success.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<UploadBatch>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<UploadBatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl UploadSink for ChannelSink {
    async fn upload(&self, batch: UploadBatch) -> Result<(), UploadError> {
        self.sender
            .send(batch)
            .map_err(|e| UploadError::Transport(e.to_string()))
    }
}

/// A sink that counts attempts and fails every one of them.
#[derive(Debug, Clone, Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl UploadSink for FailingSink {
    async fn upload(&self, _batch: UploadBatch) -> Result<(), UploadError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(UploadError::Status(503))
    }
}

/// Storage that is present but refuses every access.
#[derive(Debug, Default)]
pub struct FailingStore;

impl SlotStore for FailingStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage disabled".into()))
    }
}

/// A minimal replay-style event with the given timestamp.
pub fn event(timestamp: i64) -> Value {
    json!({ "type": 3, "data": { "source": 2 }, "timestamp": timestamp })
}

/// The timestamps carried by a batch, in order.
pub fn timestamps(batch: &UploadBatch) -> Vec<i64> {
    batch
        .records
        .iter()
        .filter_map(|r| r.get("timestamp").and_then(Value::as_i64))
        .collect()
}
