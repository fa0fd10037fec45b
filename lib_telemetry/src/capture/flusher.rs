//! # Batch Flusher
//!
//! Wakes on a fixed period, pulls the delta from the recorder and drops it
//! into the outbound channel.
//!
//! ## Tick workflow:
//! 1.  **Select**: under the recorder lock, the dedup strategy picks every
//!     record it has not seen and adds it to the ledger. This happens before
//!     any network activity, so the next tick cannot select the same records
//!     even if this upload is still in flight.
//! 2.  **Hand off**: the delta becomes an `UploadBatch` and is sent into the
//!     outbound channel. An empty delta is still sent unless
//!     `skip_empty_uploads` is set.
//! 3.  **Reschedule**: the next tick is due one period later no matter what
//!     happened to the upload. Failed batches are already in the ledger and
//!     are never resent.

use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::record::EventRecord;
use super::recorder::Recorder;
use crate::configs::config_pipeline::PipelineConfig;
use crate::core::outbound::{Outbound, UploadBatch};

/// What one tick did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushReport {
    /// Tick number, starting at 1.
    pub tick: u64,
    /// Records selected this tick.
    pub selected: usize,
    /// Ledger size after this tick.
    pub ledger_len: usize,
    /// Whether a batch was handed to the outbound channel.
    pub dispatched: bool,
}

/// Periodic select-and-ship loop for one activation.
#[derive(Debug)]
pub struct BatchFlusher {
    recorder: Recorder,
    outbound: Outbound,
    client_id: String,
    site_host: String,
    period: Duration,
    skip_empty: bool,
    ticks: u64,
}

impl BatchFlusher {
    /// Creates a flusher that tags every batch with `client_id` and `site_host`.
    pub fn new(
        recorder: Recorder,
        outbound: Outbound,
        client_id: impl Into<String>,
        site_host: impl Into<String>,
        config: &PipelineConfig,
    ) -> Self {
        Self {
            recorder,
            outbound,
            client_id: client_id.into(),
            site_host: site_host.into(),
            period: config.flush_interval(),
            skip_empty: config.skip_empty_uploads,
            ticks: 0,
        }
    }

    /// Runs one flush cycle synchronously.
    pub fn tick(&mut self) -> FlushReport {
        self.ticks += 1;
        let (delta, ledger_len) = self.recorder.take_unsent();
        let selected = delta.len();

        let dispatched = if selected == 0 && self.skip_empty {
            false
        } else {
            let batch = UploadBatch {
                client_id: self.client_id.clone(),
                site_host: self.site_host.clone(),
                tick: self.ticks,
                records: delta.into_iter().map(EventRecord::into_payload).collect(),
            };
            if !self.outbound.send(batch) {
                log::debug!("Upload channel closed; batch {} discarded.", self.ticks);
            }
            true
        };

        FlushReport {
            tick: self.ticks,
            selected,
            ledger_len,
            dispatched,
        }
    }

    /// Ticks forever, first one `period` after the call.
    pub async fn run(mut self) {
        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        log::info!(
            "Flusher started: every {:?}, dedup '{}', host '{}'.",
            self.period,
            self.recorder.strategy_name(),
            self.site_host
        );

        loop {
            ticker.tick().await;
            let report = self.tick();
            log::debug!(
                "Flush tick {}: {} selected, ledger {}, dispatched {}",
                report.tick,
                report.selected,
                report.ledger_len,
                report.dispatched
            );
        }
    }

    /// Spawns `run` onto the current runtime without keeping the handle.
    pub fn spawn(self) {
        tokio::spawn(self.run());
    }
}
