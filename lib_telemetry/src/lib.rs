//! # lib_telemetry
//!
//! Client-side session telemetry for the storefront: interaction events are
//! buffered in memory, diffed against an upload ledger on a fixed period and
//! shipped to a remote collector fire-and-forget. A durable per-browser client
//! id and a one-shot referrer tracker ride along with every activation.
//!
//! Modules are laid out by concern:
//!
//! - **`capture`**: records, buffer, dedup ledger, flusher, identity, referrer
//!   and the activation entry point.
//! - **`core`**: the outbound upload channel and the sink contract.
//! - **`storage`**: named string slots that outlive an activation.
//! - **`configs`**: pipeline tuning knobs.
//! - **`retrieve`** (feature `retrieve`): the HTTP collector sink.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod capture;
pub mod configs;
pub mod core;
#[cfg(feature = "retrieve")]
pub mod retrieve;
pub mod storage;

// Re-export the types an embedder needs to activate a pipeline.
pub use capture::pipeline::{ActivePipeline, Capability, ClientEnv, Location, TelemetryPipeline};
pub use capture::recorder::Recorder;
pub use capture::record::EventRecord;
pub use configs::config_pipeline::{DedupKind, PipelineConfig};
pub use crate::core::outbound::{UploadBatch, UploadError, UploadSink};
pub use storage::{FileStore, MemoryStore, SlotStore, StoreError};
