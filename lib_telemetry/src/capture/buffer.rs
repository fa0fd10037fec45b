use serde_json::Value;

use super::record::{EventRecord, RecordError};

/// # Event Buffer
///
/// Every record observed since activation, in arrival order. Records are only
/// ever appended; nothing is removed or reordered for the life of the buffer.
#[derive(Debug, Default)]
pub struct EventBuffer {
    records: Vec<EventRecord>,
}

impl EventBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `payload` at the end, stamping it with the next sequence number.
    ///
    /// A payload without a usable timestamp is rejected and the buffer is left
    /// untouched.
    pub fn append(&mut self, payload: Value) -> Result<&EventRecord, RecordError> {
        let seq = self.records.len() as u64;
        let record = EventRecord::from_payload(seq, payload)?;
        self.records.push(record);
        Ok(&self.records[self.records.len() - 1])
    }

    /// All records, oldest first.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    /// Number of records appended so far.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nothing has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
