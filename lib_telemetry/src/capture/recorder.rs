use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::Value;

use super::buffer::EventBuffer;
use super::dedup::DedupStrategy;
use super::record::EventRecord;

/// Buffer and ledger, always locked together.
struct RecorderState {
    buffer: EventBuffer,
    dedup: Box<dyn DedupStrategy>,
}

/// # Recorder
///
/// Cloneable handle shared by the event source (which appends) and the
/// flusher (which selects). One lock guards both the buffer and the dedup
/// ledger, so a tick's select-and-mark step is never interleaved with an
/// append.
#[derive(Clone)]
pub struct Recorder {
    state: Arc<Mutex<RecorderState>>,
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("buffered", &self.buffered())
            .field("ledger_len", &self.ledger_len())
            .finish()
    }
}

impl Recorder {
    /// Creates an empty recorder using `dedup` to track what was sent.
    pub fn new(dedup: Box<dyn DedupStrategy>) -> Self {
        Self {
            state: Arc::new(Mutex::new(RecorderState {
                buffer: EventBuffer::new(),
                dedup,
            })),
        }
    }

    /// Appends one emitted payload to the buffer.
    ///
    /// Payloads without a numeric `timestamp` are logged and dropped. Returns
    /// whether the payload was kept.
    pub fn record(&self, payload: Value) -> bool {
        let mut state = self.state.lock().expect("Recorder lock poisoned");
        match state.buffer.append(payload) {
            Ok(_) => true,
            Err(e) => {
                log::warn!("Dropping event payload: {}", e);
                false
            }
        }
    }

    /// Selects every record the ledger has not seen and marks it as seen.
    pub(crate) fn take_unsent(&self) -> (Vec<EventRecord>, usize) {
        let mut state = self.state.lock().expect("Recorder lock poisoned");
        let RecorderState { buffer, dedup } = &mut *state;
        let delta = dedup.select_unsent(buffer.records());
        (delta, dedup.ledger_len())
    }

    /// Number of records in the buffer.
    pub fn buffered(&self) -> usize {
        self.state.lock().expect("Recorder lock poisoned").buffer.len()
    }

    /// Number of ledger entries.
    pub fn ledger_len(&self) -> usize {
        self.state
            .lock()
            .expect("Recorder lock poisoned")
            .dedup
            .ledger_len()
    }

    /// Name of the active dedup strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.state.lock().expect("Recorder lock poisoned").dedup.name()
    }

    /// A copy of the buffer contents, oldest first.
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.state
            .lock()
            .expect("Recorder lock poisoned")
            .buffer
            .records()
            .to_vec()
    }
}
