//! Unit-of-work outcomes.

use serde_json::Value;

/// Result of running a unit of work: `(result_or_error, endpoint, code)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    /// Route path of the operation that produced this outcome
    pub endpoint: String,
    /// HTTP-style status code; 200 means success
    pub code: u16,
    /// Success value or error text
    pub result: Result<Value, String>,
}

impl TaskOutcome {
    pub fn success(endpoint: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            endpoint: endpoint.into(),
            code: 200,
            result: Ok(value.into()),
        }
    }

    pub fn failure(endpoint: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            code,
            result: Err(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 200
    }

    /// Envelope `message`: `"success"` for 200, otherwise the error text.
    pub fn message(&self) -> String {
        if self.is_success() {
            return "success".to_string();
        }
        match &self.result {
            Err(message) => message.clone(),
            Ok(Value::String(s)) => s.clone(),
            Ok(other) => other.to_string(),
        }
    }

    /// Envelope `response`: the success value, `None` for any other code.
    pub fn response(&self) -> Option<Value> {
        match (&self.result, self.is_success()) {
            (Ok(value), true) => Some(value.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_outcome() {
        let outcome = TaskOutcome::success("/v1/video/loop", "https://cdn/x.mp4");
        assert_eq!(outcome.message(), "success");
        assert_eq!(outcome.response(), Some(json!("https://cdn/x.mp4")));
    }

    #[test]
    fn test_failure_outcome() {
        let outcome = TaskOutcome::failure("/v1/video/loop", 500, "ffmpeg exploded");
        assert_eq!(outcome.message(), "ffmpeg exploded");
        assert_eq!(outcome.response(), None);
    }

    #[test]
    fn test_non_200_value_becomes_message() {
        let outcome = TaskOutcome {
            endpoint: "/x".into(),
            code: 400,
            result: Ok(json!("bad input")),
        };
        assert_eq!(outcome.message(), "bad input");
        assert_eq!(outcome.response(), None);
    }
}
