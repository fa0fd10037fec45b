use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Errors raised when a payload cannot become an `EventRecord`.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The payload has no `timestamp`, or it is not a number.
    #[error("event payload has no numeric `timestamp` field")]
    MissingTimestamp,

    /// The raw text was not JSON.
    #[error("malformed event payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// # Timestamp
///
/// A record's `timestamp`, compared by exact numeric value. Integral values
/// (`3` and `3.0` alike) are kept as integers; any other number is keyed by
/// its `f64` bit pattern, so `1.2` and `1.7` stay distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timestamp {
    /// A whole number of milliseconds.
    Integral(i64),
    /// Bits of a non-integral or out-of-range `f64`.
    Float(u64),
}

impl Timestamp {
    /// Reads a JSON number. Anything else yields `None`.
    pub fn from_json(raw: &Value) -> Option<Self> {
        if let Some(i) = raw.as_i64() {
            return Some(Timestamp::Integral(i));
        }
        let f = raw.as_f64()?;
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
            // Also folds -0.0 into 0.
            Some(Timestamp::Integral(f as i64))
        } else {
            Some(Timestamp::Float(f.to_bits()))
        }
    }

    /// The value as an integer, when it is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Timestamp::Integral(i) => Some(*i),
            Timestamp::Float(_) => None,
        }
    }

    /// The value as a float.
    pub fn as_f64(&self) -> f64 {
        match self {
            Timestamp::Integral(i) => *i as f64,
            Timestamp::Float(bits) => f64::from_bits(*bits),
        }
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Timestamp::Integral(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::Integral(i) => write!(f, "{}", i),
            Timestamp::Float(_) => write!(f, "{}", self.as_f64()),
        }
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Timestamp::Integral(i) => serializer.serialize_i64(*i),
            Timestamp::Float(_) => serializer.serialize_f64(self.as_f64()),
        }
    }
}

/// # Event Record
///
/// One captured interaction: the opaque payload as the source emitted it,
/// its `timestamp` (milliseconds), and the sequence number the buffer
/// assigned on append.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    seq: u64,
    timestamp: Timestamp,
    payload: Value,
}

impl EventRecord {
    /// Wraps `payload`, reading its `timestamp` field.
    pub fn from_payload(seq: u64, payload: Value) -> Result<Self, RecordError> {
        let timestamp = payload
            .get("timestamp")
            .and_then(Timestamp::from_json)
            .ok_or(RecordError::MissingTimestamp)?;
        Ok(Self {
            seq,
            timestamp,
            payload,
        })
    }

    /// Position in the buffer, 0-based.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// The record's `timestamp` value.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// The payload exactly as emitted.
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Consumes the record, returning the payload.
    pub fn into_payload(self) -> Value {
        self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_integer_timestamp() {
        let record = EventRecord::from_payload(7, json!({"type": 3, "timestamp": 1700000000123i64}))
            .unwrap();
        assert_eq!(record.seq(), 7);
        assert_eq!(record.timestamp(), Timestamp::Integral(1700000000123));
        assert_eq!(record.payload()["type"], 3);
    }

    #[test]
    fn test_float_timestamp_keeps_exact_value() {
        let a = EventRecord::from_payload(0, json!({"timestamp": 1.2})).unwrap();
        let b = EventRecord::from_payload(1, json!({"timestamp": 1.7})).unwrap();
        assert_ne!(a.timestamp(), b.timestamp());
        assert_eq!(a.timestamp().as_f64(), 1.2);
        assert_eq!(a.timestamp().as_i64(), None);
        assert_eq!(a.timestamp().to_string(), "1.2");
    }

    #[test]
    fn test_whole_floats_equal_integers() {
        let int = EventRecord::from_payload(0, json!({"timestamp": 3})).unwrap();
        let float = EventRecord::from_payload(1, json!({"timestamp": 3.0})).unwrap();
        let negative_zero = EventRecord::from_payload(2, json!({"timestamp": -0.0})).unwrap();
        assert_eq!(int.timestamp(), float.timestamp());
        assert_eq!(negative_zero.timestamp(), Timestamp::from(0));
    }

    #[test]
    fn test_huge_unsigned_timestamp_is_kept_as_float() {
        let record = EventRecord::from_payload(0, json!({"timestamp": u64::MAX})).unwrap();
        assert!(matches!(record.timestamp(), Timestamp::Float(_)));
    }

    #[test]
    fn test_missing_or_non_numeric_timestamp_is_rejected() {
        assert!(matches!(
            EventRecord::from_payload(0, json!({"type": 2})),
            Err(RecordError::MissingTimestamp)
        ));
        assert!(matches!(
            EventRecord::from_payload(0, json!({"timestamp": "yesterday"})),
            Err(RecordError::MissingTimestamp)
        ));
        assert!(matches!(
            EventRecord::from_payload(0, json!([1, 2, 3])),
            Err(RecordError::MissingTimestamp)
        ));
    }
}
