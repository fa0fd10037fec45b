//! # Core Module
//!
//! Plumbing between the flusher and whatever actually ships a batch.
//!
//! - **`outbound`**: the one-way, unordered upload channel, the task that
//!   drains it, and the `UploadSink` contract a transport implements.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Fire-and-forget upload channel and sink contract.
pub mod outbound;

pub use outbound::{spawn_dispatch, Outbound, UploadBatch, UploadError, UploadSink};
