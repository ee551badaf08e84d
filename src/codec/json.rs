//! JSON codec using `serde_json`.
//!
//! Event bodies delivered with `Content-Type: text/event-json` are flat JSON
//! objects whose values are almost always strings.
//!
//! # Example
//!
//! ```
//! use eventsocket_client::codec::{Event, JsonCodec};
//!
//! let event: Event = JsonCodec::decode(br#"{"Event-Name":"HEARTBEAT","Up-Time":"1 day"}"#).unwrap();
//! assert_eq!(event.name(), Some("HEARTBEAT"));
//! assert_eq!(event.get("Up-Time"), Some("1 day"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;
use crate::protocol::header_names;

/// JSON codec for event bodies.
pub struct JsonCodec;

impl JsonCodec {
    /// Decode JSON bytes to a value.
    ///
    /// # Errors
    ///
    /// Returns error if the bytes cannot be deserialized to type T.
    #[inline]
    pub fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// A decoded JSON event.
///
/// Only JSON objects decode into an `Event`; any other JSON value is a
/// decode error.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Event {
    fields: Map<String, Value>,
}

impl Event {
    /// The `Event-Name` field.
    pub fn name(&self) -> Option<&str> {
        self.get(header_names::EVENT_NAME)
    }

    /// The `Job-UUID` field.
    pub fn job_uuid(&self) -> Option<&str> {
        self.get(header_names::JOB_UUID)
    }

    /// The embedded `_body` field.
    pub fn body(&self) -> Option<&str> {
        self.get(header_names::EVENT_BODY)
    }

    /// A string field by name. Non-string values yield `None`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// A raw field by name.
    pub fn get_value(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// All fields.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl From<Map<String, Value>> for Event {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_background_job_event() {
        let body = br#"{"Event-Name":"BACKGROUND_JOB","Job-UUID":"7f4c","_body":"+OK done\n"}"#;
        let event: Event = JsonCodec::decode(body).unwrap();

        assert_eq!(event.name(), Some("BACKGROUND_JOB"));
        assert_eq!(event.job_uuid(), Some("7f4c"));
        assert_eq!(event.body(), Some("+OK done\n"));
    }

    #[test]
    fn test_non_string_fields() {
        let event: Event = JsonCodec::decode(br#"{"Event-Name":"CUSTOM","Count":3}"#).unwrap();

        assert_eq!(event.get("Count"), None);
        assert_eq!(event.get_value("Count"), Some(&Value::from(3)));
        assert_eq!(event.fields().len(), 2);
    }

    #[test]
    fn test_decode_rejects_non_objects() {
        assert!(JsonCodec::decode::<Event>(b"[1, 2, 3]").is_err());
        assert!(JsonCodec::decode::<Event>(b"not json").is_err());
        assert!(JsonCodec::decode::<Event>(b"").is_err());
    }

    #[test]
    fn test_event_serializes_as_plain_object() {
        let mut fields = Map::new();
        fields.insert("Event-Name".to_string(), Value::from("HEARTBEAT"));
        let event = Event::from(fields);

        let encoded = serde_json::to_vec(&event).unwrap();
        assert_eq!(encoded, br#"{"Event-Name":"HEARTBEAT"}"#.to_vec());
    }
}
