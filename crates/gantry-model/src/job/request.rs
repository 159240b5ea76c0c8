use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Action understood by the deployed workload.
///
/// The workload dispatches on `input.action`; there is no free-form command.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum WorkloadRequest {
    /// Device diagnostic: device count, names and memory figures.
    #[default]
    Diagnose,
    /// Directory listing split into files and subdirectories.
    ListFiles { path: String },
}

impl WorkloadRequest {
    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkloadRequest::Diagnose => "diagnose",
            WorkloadRequest::ListFiles { .. } => "list_files",
        }
    }

    /// Request body sent to the endpoint: `{"input": {...}}`.
    pub fn payload(&self) -> Value {
        match self {
            WorkloadRequest::Diagnose => json!({ "input": {} }),
            WorkloadRequest::ListFiles { path } => json!({
                "input": { "action": "list_files", "path": path }
            }),
        }
    }
}

/// How a job is submitted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubmitMode {
    /// Block until a terminal status or a service-side timeout.
    Sync,
    /// Return a job id immediately; status is fetched separately.
    Async,
}

impl SubmitMode {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmitMode::Sync => "sync",
            SubmitMode::Async => "async",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnose_payload_is_empty_input() {
        assert_eq!(WorkloadRequest::Diagnose.payload(), json!({"input": {}}));
    }

    #[test]
    fn list_files_payload_carries_action_and_path() {
        let req = WorkloadRequest::ListFiles {
            path: "/runpod-volume".into(),
        };
        assert_eq!(
            req.payload(),
            json!({"input": {"action": "list_files", "path": "/runpod-volume"}})
        );
        assert_eq!(req.kind(), "list_files");
    }

    #[test]
    fn config_shape_deserializes() {
        let req: WorkloadRequest =
            serde_json::from_str(r#"{"action":"list_files","path":"/data"}"#).unwrap();
        assert_eq!(req, WorkloadRequest::ListFiles { path: "/data".into() });

        let req: WorkloadRequest = serde_json::from_str(r#"{"action":"diagnose"}"#).unwrap();
        assert_eq!(req, WorkloadRequest::Diagnose);
    }
}
