use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Lifecycle status of a submitted job.
///
/// `Queued -> Running -> {Completed, Failed}`.
/// `Cancelled` and `TimedOut` are service-side terminal failures.
/// `Unknown` covers any value this client does not recognize and is treated
/// as non-terminal, so polling continues until the deadline decides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    TimedOut,
    Unknown,
}

impl JobStatus {
    /// Returns `true` once the job can no longer change state.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled | JobStatus::TimedOut
        )
    }

    /// Returns `true` for every terminal status except `Completed`.
    #[inline]
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && !matches!(self, JobStatus::Completed)
    }

    /// Wire representation.
    pub fn as_wire(&self) -> &'static str {
        match self {
            JobStatus::Queued => "IN_QUEUE",
            JobStatus::Running => "IN_PROGRESS",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Cancelled => "CANCELLED",
            JobStatus::TimedOut => "TIMED_OUT",
            JobStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parse a wire value; both service (`IN_QUEUE`) and descriptive (`Queued`) spellings are accepted.
    pub fn from_wire(s: &str) -> Self {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "IN_QUEUE" | "QUEUED" => JobStatus::Queued,
            "IN_PROGRESS" | "RUNNING" => JobStatus::Running,
            "COMPLETED" => JobStatus::Completed,
            "FAILED" => JobStatus::Failed,
            "CANCELLED" | "CANCELED" => JobStatus::Cancelled,
            "TIMED_OUT" | "TIMEDOUT" => JobStatus::TimedOut,
            _ => JobStatus::Unknown,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl Serialize for JobStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for JobStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&s))
    }
}
