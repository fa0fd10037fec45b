//! # Dedup Strategies
//!
//! A strategy answers one question per flush tick: which buffered records
//! have not been handed to the uploader yet? It answers and records the
//! answer in the same call, so a record can never be selected twice.
//!
//! - **`TimestampLedger`** (default) keys records by the exact value of
//!   their `timestamp`. Distinct
//!   records that share a timestamp with something already sent are skipped
//!   forever. Both the ledger and the sent-set grow without bound.
//! - **`SequenceCursor`** remembers only how far into the buffer it has
//!   read. Constant memory, no collision loss.

use std::collections::HashSet;

use super::record::{EventRecord, Timestamp};
use crate::configs::config_pipeline::DedupKind;

/// Selects unsent records and marks them as sent.
pub trait DedupStrategy: Send {
    /// Returns the records of `buffer` not yet selected, in buffer order, and
    /// marks them as selected before returning.
    fn select_unsent(&mut self, buffer: &[EventRecord]) -> Vec<EventRecord>;

    /// Number of entries the ledger holds.
    fn ledger_len(&self) -> usize;

    /// Short name used in logs.
    fn name(&self) -> &'static str;
}

impl DedupKind {
    /// Builds a fresh, empty strategy of this kind.
    pub fn strategy(self) -> Box<dyn DedupStrategy> {
        match self {
            DedupKind::Timestamp => Box::new(TimestampLedger::new()),
            DedupKind::Sequence => Box::new(SequenceCursor::new()),
        }
    }
}

/// # Timestamp Ledger
///
/// The timestamps of every record ever selected, in selection order
/// (duplicates included), plus the derived set used for membership tests.
#[derive(Debug, Default)]
pub struct TimestampLedger {
    ledger: Vec<Timestamp>,
    sent: HashSet<Timestamp>,
}

impl TimestampLedger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a record with `timestamp` would be treated as already sent.
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.sent.contains(&timestamp)
    }

    /// Ledger entries, oldest first.
    pub fn timestamps(&self) -> &[Timestamp] {
        &self.ledger
    }

    /// Distinct timestamps in the ledger.
    pub fn distinct(&self) -> usize {
        self.sent.len()
    }
}

impl DedupStrategy for TimestampLedger {
    fn select_unsent(&mut self, buffer: &[EventRecord]) -> Vec<EventRecord> {
        // Membership is checked against the ledger as it stood before this
        // tick, so duplicates within one delta are all selected.
        let delta: Vec<EventRecord> = buffer
            .iter()
            .filter(|record| !self.sent.contains(&record.timestamp()))
            .cloned()
            .collect();

        for record in &delta {
            self.ledger.push(record.timestamp());
            self.sent.insert(record.timestamp());
        }
        delta
    }

    fn ledger_len(&self) -> usize {
        self.ledger.len()
    }

    fn name(&self) -> &'static str {
        "timestamp"
    }
}

/// # Sequence Cursor
///
/// Index of the first buffer entry not yet selected.
#[derive(Debug, Default)]
pub struct SequenceCursor {
    cursor: usize,
}

impl SequenceCursor {
    /// Creates a cursor at the start of the buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer index the next tick will start from.
    pub fn position(&self) -> usize {
        self.cursor
    }
}

impl DedupStrategy for SequenceCursor {
    fn select_unsent(&mut self, buffer: &[EventRecord]) -> Vec<EventRecord> {
        let start = self.cursor.min(buffer.len());
        let delta = buffer[start..].to_vec();
        self.cursor = buffer.len();
        delta
    }

    fn ledger_len(&self) -> usize {
        self.cursor
    }

    fn name(&self) -> &'static str {
        "sequence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::buffer::EventBuffer;
    use serde_json::json;

    fn buffer_of(timestamps: &[i64]) -> EventBuffer {
        let mut buffer = EventBuffer::new();
        for (i, ts) in timestamps.iter().enumerate() {
            buffer.append(json!({"timestamp": ts, "n": i})).unwrap();
        }
        buffer
    }

    fn stamps(records: &[EventRecord]) -> Vec<i64> {
        records.iter().filter_map(|r| r.timestamp().as_i64()).collect()
    }

    #[test]
    fn test_timestamp_second_tick_is_empty_without_new_records() {
        let buffer = buffer_of(&[1, 2, 3]);
        let mut ledger = TimestampLedger::new();

        assert_eq!(stamps(&ledger.select_unsent(buffer.records())), vec![1, 2, 3]);
        assert!(ledger.select_unsent(buffer.records()).is_empty());
        assert_eq!(ledger.ledger_len(), 3);
    }

    #[test]
    fn test_timestamp_duplicates_within_one_delta_are_kept() {
        let buffer = buffer_of(&[4, 4]);
        let mut ledger = TimestampLedger::new();

        let delta = ledger.select_unsent(buffer.records());
        assert_eq!(delta.len(), 2);
        assert_eq!(ledger.timestamps(), &[Timestamp::from(4), Timestamp::from(4)]);
        assert_eq!(ledger.distinct(), 1);
    }

    #[test]
    fn test_timestamp_collision_after_flush_is_lost() {
        let mut buffer = buffer_of(&[4]);
        let mut ledger = TimestampLedger::new();
        ledger.select_unsent(buffer.records());

        buffer.append(json!({"timestamp": 4, "n": "late"})).unwrap();
        assert!(ledger.contains(Timestamp::from(4)));
        assert!(ledger.select_unsent(buffer.records()).is_empty());
    }

    #[test]
    fn test_timestamp_fractional_values_do_not_collide() {
        let mut buffer = EventBuffer::new();
        let mut ledger = TimestampLedger::new();

        buffer.append(json!({"timestamp": 1.2, "n": "a"})).unwrap();
        let first = ledger.select_unsent(buffer.records());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].payload()["n"], "a");

        buffer.append(json!({"timestamp": 1.7, "n": "b"})).unwrap();
        let second = ledger.select_unsent(buffer.records());
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].payload()["n"], "b");
        assert_eq!(ledger.distinct(), 2);

        // A later record at 1.2 still collides with the first.
        buffer.append(json!({"timestamp": 1.2, "n": "c"})).unwrap();
        assert!(ledger.select_unsent(buffer.records()).is_empty());
    }

    #[test]
    fn test_sequence_cursor_keeps_late_collisions() {
        let mut buffer = buffer_of(&[4]);
        let mut cursor = SequenceCursor::new();
        assert_eq!(cursor.select_unsent(buffer.records()).len(), 1);

        buffer.append(json!({"timestamp": 4, "n": "late"})).unwrap();
        let delta = cursor.select_unsent(buffer.records());
        assert_eq!(delta.len(), 1);
        assert_eq!(delta[0].payload()["n"], "late");
        assert_eq!(cursor.position(), 2);
        assert!(cursor.select_unsent(buffer.records()).is_empty());
    }

    #[test]
    fn test_kind_builds_matching_strategy() {
        assert_eq!(DedupKind::Timestamp.strategy().name(), "timestamp");
        assert_eq!(DedupKind::Sequence.strategy().name(), "sequence");
    }
}
