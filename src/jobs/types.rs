//! Job record and queue item types.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::token::Token;

/// Lifecycle states of a conversion job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Worker progress milestones, as percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Milestone {
    /// A worker picked the job up.
    Accepted = 10,
    /// The conversion rule was resolved from the registry.
    RuleResolved = 25,
    /// The converter was invoked.
    EngineInvoked = 50,
    /// Converted bytes were produced.
    Converted = 75,
    /// The artifact was persisted to storage.
    ArtifactWritten = 100,
}

impl Milestone {
    pub fn percent(self) -> u8 {
        self as u8
    }
}

/// Persisted state of one conversion job.
///
/// Serialized as JSON into the TTL store under `job:{token}`. Every write
/// re-arms the record's TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobState {
    pub status: JobStatus,

    /// Progress percentage. Monotonically non-decreasing for the life of
    /// the job.
    pub progress: u8,

    pub input_format: String,
    pub output_format: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl JobState {
    pub fn queued(input_format: &str, output_format: &str) -> Self {
        Self {
            status: JobStatus::Queued,
            progress: 0,
            input_format: input_format.to_string(),
            output_format: output_format.to_string(),
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Advance to a milestone. Progress never moves backwards, so a
    /// re-reported earlier milestone (e.g. on a retry) is a no-op.
    pub fn advance(&mut self, milestone: Milestone) {
        self.status = JobStatus::Running;
        self.progress = self.progress.max(milestone.percent());
    }

    pub fn succeed(&mut self) {
        self.status = JobStatus::Succeeded;
        self.progress = Milestone::ArtifactWritten.percent();
        self.error = None;
    }

    /// Mark the job failed, keeping the progress it had reached.
    pub fn fail(&mut self, error: &str) {
        self.status = JobStatus::Failed;
        self.error = Some(error.to_string());
    }
}

/// One queued unit of conversion work.
///
/// Formats are canonical; the pair was validated against the registry
/// before the item was enqueued.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub token: Token,
    pub input_format: String,
    pub output_format: String,
    pub payload: Bytes,
}
