//! Click event model and its broker wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current version of the serialized click event envelope.
pub const CLICK_EVENT_VERSION: u16 = 1;

/// One successful redirect, as emitted by the redirect path.
///
/// Built once per resolved redirect and never mutated. Delivery is
/// at-least-once, so consumers deduplicate on `event_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub code: String,
    pub timestamp: DateTime<Utc>,
    pub event_id: String,
}

/// Errors raised while decoding a broker payload.
#[derive(Debug, thiserror::Error)]
pub enum ClickEventCodecError {
    #[error("Malformed click event: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Unsupported click event version {0}")]
    UnsupportedVersion(u16),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    v: u16,
    code: String,
    timestamp: DateTime<Utc>,
    event_id: String,
}

impl ClickEvent {
    /// Creates an event for `code` stamped with the current time and a fresh nonce id.
    pub fn new(code: impl Into<String>) -> Self {
        Self::at(code, Utc::now())
    }

    pub fn at(code: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            timestamp,
            event_id: Uuid::new_v4().to_string(),
        }
    }

    /// Serializes the event into the versioned JSON envelope.
    ///
    /// ```text
    /// {"v":1,"code":"abc1234","timestamp":"2026-01-01T00:00:00Z","event_id":"..."}
    /// ```
    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&Envelope {
            v: CLICK_EVENT_VERSION,
            code: self.code.clone(),
            timestamp: self.timestamp,
            event_id: self.event_id.clone(),
        })
    }

    /// Parses a broker payload.
    ///
    /// # Errors
    ///
    /// Rejects payloads that are not valid envelopes or carry an unknown version.
    pub fn decode(payload: &[u8]) -> Result<Self, ClickEventCodecError> {
        let envelope: Envelope = serde_json::from_slice(payload)?;

        if envelope.v != CLICK_EVENT_VERSION {
            return Err(ClickEventCodecError::UnsupportedVersion(envelope.v));
        }

        Ok(Self {
            code: envelope.code,
            timestamp: envelope.timestamp,
            event_id: envelope.event_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_new_events_get_distinct_ids() {
        let first = ClickEvent::new("abc123");
        let second = ClickEvent::new("abc123");

        assert_eq!(first.code, second.code);
        assert_ne!(first.event_id, second.event_id);
    }

    #[test]
    fn test_encode_writes_versioned_envelope() {
        let event = ClickEvent::new("abc123");
        let value: Value = serde_json::from_slice(&event.encode().unwrap()).unwrap();

        assert_eq!(value["v"], 1);
        assert_eq!(value["code"], "abc123");
        assert_eq!(value["event_id"], event.event_id.as_str());
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_decode_preserves_identity() {
        let event = ClickEvent::new("xyz789");
        let decoded = ClickEvent::decode(&event.encode().unwrap()).unwrap();

        assert_eq!(decoded, event);
    }

    #[test]
    fn test_decode_rejects_unknown_version() {
        let payload = br#"{"v":2,"code":"a","timestamp":"2026-01-01T00:00:00Z","event_id":"e"}"#;

        assert!(matches!(
            ClickEvent::decode(payload),
            Err(ClickEventCodecError::UnsupportedVersion(2))
        ));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            ClickEvent::decode(b"not json"),
            Err(ClickEventCodecError::Malformed(_))
        ));
    }
}
