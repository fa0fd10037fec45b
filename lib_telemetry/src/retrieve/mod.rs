//! # Data Retrieval Module
//!
//! HTTP plumbing for talking to the telemetry collector.
//!
//! ## Contained Modules:
//!
//! - **`collector`**: `CollectorClient`, a `reqwest`-based `UploadSink` that
//!   POSTs each batch as a JSON array to
//!   `<collector>/record/<namespace>/<site_host>/<client_id>`.
//!
//! Unlike a general API client there is deliberately no retry middleware
//! here: delivery is best-effort and at most once.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// HTTP upload sink for the collector.
pub mod collector;

pub use collector::CollectorClient;
