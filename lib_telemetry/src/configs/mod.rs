//! # Configuration Modules
//!
//! Tuning knobs for the capture pipeline. Loading them from files, the
//! environment or the command line is left to the binary that embeds the
//! library.

/// Flush period, collector endpoint, dedup strategy and friends.
pub mod config_pipeline;
