//! Request payloads captured at dispatch time.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors when capturing a request body as a job payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Invalid payload: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// The original request body of a job.
///
/// Immutable once captured; the dispatch core only ever reads `webhook_url`
/// and `id` from it; everything else belongs to the unit of work.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobPayload(Map<String, Value>);

impl JobPayload {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// Capture a JSON value, rejecting anything that is not an object.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(PayloadError::NotAnObject),
        }
    }

    /// Callback URL, only when it is a non-empty string.
    pub fn webhook_url(&self) -> Option<&str> {
        self.0
            .get("webhook_url")
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }

    pub fn has_webhook(&self) -> bool {
        self.webhook_url().is_some()
    }

    /// Caller-supplied `id`, passed through untouched (`null` when absent).
    pub fn correlation_id(&self) -> Value {
        self.0.get("id").cloned().unwrap_or(Value::Null)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Serialize back to the JSON text that was received.
    pub fn to_json_string(&self) -> String {
        Value::Object(self.0.clone()).to_string()
    }

    /// Decode into an operation-specific request type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        Ok(serde_json::from_value(Value::Object(self.0.clone()))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> JobPayload {
        JobPayload::from_value(value).unwrap()
    }

    #[test]
    fn test_rejects_non_objects() {
        assert!(matches!(
            JobPayload::from_value(json!([1, 2])),
            Err(PayloadError::NotAnObject)
        ));
    }

    #[test]
    fn test_empty_webhook_is_absent() {
        assert_eq!(payload(json!({"webhook_url": ""})).webhook_url(), None);
        assert_eq!(payload(json!({})).webhook_url(), None);
        assert_eq!(payload(json!({"webhook_url": 42})).webhook_url(), None);
        assert_eq!(
            payload(json!({"webhook_url": "https://cb"})).webhook_url(),
            Some("https://cb")
        );
    }

    #[test]
    fn test_correlation_id_passthrough() {
        assert_eq!(payload(json!({"id": "abc"})).correlation_id(), json!("abc"));
        assert_eq!(payload(json!({"id": 7})).correlation_id(), json!(7));
        assert_eq!(payload(json!({})).correlation_id(), Value::Null);
    }

    #[test]
    fn test_decode() {
        #[derive(Deserialize)]
        struct Loop {
            loop_count: u32,
        }

        let decoded: Loop = payload(json!({"loop_count": 3})).decode().unwrap();
        assert_eq!(decoded.loop_count, 3);
    }
}
