use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::job::JobStatus;

/// One submitted unit of work against an endpoint.
///
/// Response envelope: `{id, status, output: {...} | null, error: string | {...} | null}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Failure detail. Workers report either a string or a structured object.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    /// Milliseconds spent queued, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delay_time: Option<u64>,
    /// Milliseconds spent executing, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<u64>,
}

impl Job {
    /// A job that has only been accepted.
    pub fn queued(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: JobStatus::Queued,
            output: None,
            error: None,
            delay_time: None,
            execution_time: None,
        }
    }

    /// Rendered error detail, when one is populated.
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().and_then(error_text)
    }
}

/// Render a populated error value.
///
/// `null`, blank strings and empty objects or arrays count as absent. Strings are
/// returned as is; anything else is rendered as compact JSON.
pub fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) if map.is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        other => Some(other.to_string()),
    }
}
