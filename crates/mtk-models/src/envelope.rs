//! The uniform response envelope returned to callers and posted to webhooks.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::job::JobId;
use crate::outcome::TaskOutcome;

/// Round a duration to seconds with 3 decimals.
pub fn round_secs(duration: Duration) -> f64 {
    (duration.as_secs_f64() * 1000.0).round() / 1000.0
}

/// Configured queue capacity, reported as an integer or `"unlimited"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueCapacity {
    Unlimited,
    Limited(usize),
}

impl QueueCapacity {
    /// `0` means unbounded.
    pub fn from_max(max: usize) -> Self {
        if max == 0 {
            QueueCapacity::Unlimited
        } else {
            QueueCapacity::Limited(max)
        }
    }

    /// True when one more entry would exceed the capacity.
    pub fn is_full(&self, depth: usize) -> bool {
        match self {
            QueueCapacity::Unlimited => false,
            QueueCapacity::Limited(max) => depth >= *max,
        }
    }
}

impl Serialize for QueueCapacity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueueCapacity::Unlimited => serializer.serialize_str("unlimited"),
            QueueCapacity::Limited(max) => serializer.serialize_u64(*max as u64),
        }
    }
}

impl<'de> Deserialize<'de> for QueueCapacity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CapacityVisitor;

        impl<'de> Visitor<'de> for CapacityVisitor {
            type Value = QueueCapacity;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a non-negative integer or \"unlimited\"")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(QueueCapacity::from_max(v as usize))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                if v < 0 {
                    return Err(E::custom("queue capacity cannot be negative"));
                }
                Ok(QueueCapacity::from_max(v as usize))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v == "unlimited" {
                    Ok(QueueCapacity::Unlimited)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(CapacityVisitor)
    }
}

/// Fields present once the unit of work has actually run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    /// Route path of the executed operation
    pub endpoint: String,
    /// Success value, `null` on failure
    pub response: Option<Value>,
    pub run_time: f64,
    pub queue_time: f64,
    pub total_time: f64,
}

impl ExecutionReport {
    pub fn new(outcome: &TaskOutcome, queued: Duration, ran: Duration) -> Self {
        Self {
            endpoint: outcome.endpoint.clone(),
            response: outcome.response(),
            run_time: round_secs(ran),
            queue_time: round_secs(queued),
            total_time: round_secs(queued + ran),
        }
    }
}

/// Uniform JSON result shape shared by every execution path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub code: u16,
    /// Caller-supplied correlation id
    pub id: Value,
    pub job_id: JobId,
    pub message: String,
    pub pid: u32,
    pub queue_id: String,
    pub build_number: String,

    #[serde(flatten)]
    pub execution: Option<ExecutionReport>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub queue_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_queue_length: Option<QueueCapacity>,

    // Remote delegation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_name: Option<String>,
}

impl Envelope {
    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Envelope {
        Envelope {
            code: 202,
            id: json!("req-1"),
            job_id: JobId::from_string("job-1"),
            message: "processing".to_string(),
            pid: 42,
            queue_id: "q".to_string(),
            build_number: "7".to_string(),
            execution: None,
            queue_length: Some(1),
            max_queue_length: Some(QueueCapacity::Unlimited),
            job_name: None,
            location: None,
            execution_name: None,
        }
    }

    #[test]
    fn test_round_secs() {
        assert_eq!(round_secs(Duration::from_micros(1_234_567)), 1.235);
        assert_eq!(round_secs(Duration::ZERO), 0.0);
    }

    #[test]
    fn test_capacity_serialization() {
        assert_eq!(serde_json::to_value(QueueCapacity::Unlimited).unwrap(), json!("unlimited"));
        assert_eq!(serde_json::to_value(QueueCapacity::Limited(5)).unwrap(), json!(5));
        assert_eq!(
            serde_json::from_value::<QueueCapacity>(json!("unlimited")).unwrap(),
            QueueCapacity::Unlimited
        );
        assert_eq!(
            serde_json::from_value::<QueueCapacity>(json!(3)).unwrap(),
            QueueCapacity::Limited(3)
        );
    }

    #[test]
    fn test_capacity_full() {
        assert!(!QueueCapacity::Unlimited.is_full(10_000));
        assert!(!QueueCapacity::Limited(2).is_full(1));
        assert!(QueueCapacity::Limited(2).is_full(2));
    }

    #[test]
    fn test_queued_envelope_keys() {
        let value = base().to_value();
        let obj = value.as_object().unwrap();

        for key in ["code", "id", "job_id", "message", "pid", "queue_id", "build_number"] {
            assert!(obj.contains_key(key), "missing {key}");
        }
        assert_eq!(obj["max_queue_length"], json!("unlimited"));
        assert!(!obj.contains_key("endpoint"));
        assert!(!obj.contains_key("run_time"));
    }

    #[test]
    fn test_executed_envelope_has_null_response_on_failure() {
        let outcome = TaskOutcome::failure("/v1/video/loop", 500, "boom");
        let mut envelope = base();
        envelope.code = 500;
        envelope.message = outcome.message();
        envelope.execution = Some(ExecutionReport::new(
            &outcome,
            Duration::from_millis(250),
            Duration::from_millis(1500),
        ));

        let value = envelope.to_value();
        assert_eq!(value["response"], Value::Null);
        assert_eq!(value["endpoint"], json!("/v1/video/loop"));
        assert_eq!(value["queue_time"], json!(0.25));
        assert_eq!(value["run_time"], json!(1.5));
        assert_eq!(value["total_time"], json!(1.75));

        let parsed: Envelope = serde_json::from_value(value).unwrap();
        assert_eq!(parsed.execution.unwrap().endpoint, "/v1/video/loop");
    }
}
