//! # Outbound Upload Channel
//!
//! The flusher never talks to the network. It drops each batch into an
//! unbounded MPSC channel and moves on; a dispatch task drains the channel
//! and spawns one upload per batch.
//!
//! ## Delivery semantics:
//!
//! - **At most once**: a batch is sent into the channel exactly once. No
//!   handle to the upload task is kept, and nothing is retried.
//! - **Unordered**: uploads run concurrently, so the collector may receive
//!   batch N+1 before batch N.
//! - **Silent failure**: an `UploadError` is logged at `debug` and dropped.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

/// # Upload Batch
///
/// One flush tick's worth of records, addressed to a client and site.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadBatch {
    /// The durable client identifier.
    pub client_id: String,
    /// The host the events were captured on.
    pub site_host: String,
    /// The flush tick that produced this batch, starting at 1.
    pub tick: u64,
    /// The opaque event payloads, in buffer order.
    pub records: Vec<Value>,
}

impl UploadBatch {
    /// Whether the batch carries no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records in the batch.
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Errors a sink can report for one upload attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The collector address could not be turned into a request URL.
    #[error("Invalid collector URL: {0}")]
    InvalidUrl(String),

    /// The batch could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Connection, TLS or timeout failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The collector answered with a non-success status.
    #[error("Collector responded with status {0}")]
    Status(u16),
}

/// # Upload Sink
///
/// Ships one batch somewhere. The returned future must be `Send` because the
/// dispatcher spawns it onto the runtime.
pub trait UploadSink: Send + Sync + 'static {
    /// Attempts a single upload of `batch`.
    fn upload(&self, batch: UploadBatch) -> impl Future<Output = Result<(), UploadError>> + Send;
}

/// Sending half of the upload channel.
#[derive(Debug, Clone)]
pub struct Outbound {
    sender: mpsc::UnboundedSender<UploadBatch>,
}

impl Outbound {
    /// Creates a bare channel without a dispatcher.
    ///
    /// Embedders that want to inspect or forward batches themselves drain the
    /// returned receiver.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UploadBatch>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Hands `batch` off. Returns `false` when nobody is draining the channel
    /// any more, in which case the batch is gone.
    pub fn send(&self, batch: UploadBatch) -> bool {
        self.sender.send(batch).is_ok()
    }
}

/// # Spawn Dispatch
///
/// Starts the task that drains the upload channel into `sink` and returns the
/// sending half. Must be called from within a Tokio runtime.
///
/// The dispatch task ends once every `Outbound` clone has been dropped.
pub fn spawn_dispatch<S: UploadSink>(sink: S) -> Outbound {
    let (outbound, mut receiver) = Outbound::channel();
    let sink = Arc::new(sink);

    tokio::spawn(async move {
        while let Some(batch) = receiver.recv().await {
            let sink = Arc::clone(&sink);
            // Detached: the next batch does not wait for this one.
            tokio::spawn(async move {
                let tick = batch.tick;
                let count = batch.len();
                match sink.upload(batch).await {
                    Ok(()) => log::debug!("Uploaded batch {} ({} records)", tick, count),
                    Err(e) => log::debug!("Dropped batch {} ({} records): {}", tick, count, e),
                }
            });
        }
        log::debug!("Upload channel closed, dispatcher exiting.");
    });

    outbound
}
