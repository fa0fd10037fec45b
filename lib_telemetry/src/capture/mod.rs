//! # Capture Module
//!
//! The session telemetry pipeline proper.
//!
//! ## Data flow:
//!
//! 1.  **Activation** (`pipeline`): a single capability check decides whether
//!     anything runs at all. When it passes, the client id is resolved
//!     (`identity`) and the referrer is checked once (`referer`).
//! 2.  **Recording** (`source` → `recorder` → `buffer`): every payload the
//!     event source emits is stamped and appended to the buffer.
//! 3.  **Flushing** (`flusher` → `dedup`): on a fixed period the flusher asks
//!     the dedup strategy for everything not yet sent, marks it as sent, and
//!     drops it into the outbound channel without waiting for the upload.

/// Opaque, timestamped event payloads.
pub mod record;
/// Append-only in-memory log of records.
pub mod buffer;
/// Strategies for telling sent records from unsent ones.
pub mod dedup;
/// Shared handle owning the buffer and the ledger.
pub mod recorder;
/// The timer-driven flush loop.
pub mod flusher;
/// Durable per-browser client identifier.
pub mod identity;
/// One-shot external referrer detection.
pub mod referer;
/// The event source contract and its adapters.
pub mod source;
/// Capability gate and activation entry point.
pub mod pipeline;

pub use buffer::EventBuffer;
pub use dedup::{DedupStrategy, SequenceCursor, TimestampLedger};
pub use flusher::{BatchFlusher, FlushReport};
pub use identity::{resolve_client_id, CLIENT_ID_SLOT};
pub use record::{EventRecord, RecordError, Timestamp};
pub use recorder::Recorder;
pub use referer::{record_referer_if_changed, RefererOutcome, REFERER_SLOT};
pub use source::{ChannelSource, EventSource, FnSource, JsonLinesSource};
