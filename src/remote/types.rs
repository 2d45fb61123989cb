//! Wire types and job lifecycle for the remote extraction path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Server response to a successful upload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadTicket {
    pub job_id: String,
    pub sse_url: String,
}

/// Lifecycle of one remote extraction job.
///
/// `Uploading → Streaming → {Completed | Failed} → Cleaned`.
/// `Completed`, `Failed` and `Cleaned` are terminal for event delivery:
/// no stream event is surfaced after one of them is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Uploading,
    Streaming,
    Completed,
    Failed,
    Cleaned,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cleaned)
    }
}

/// One remote extraction job, owned by the upload client for its
/// lifetime.
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub job_id: String,
    pub stream_url: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(ticket: &UploadTicket) -> Self {
        Self {
            job_id: ticket.job_id.clone(),
            stream_url: ticket.sse_url.clone(),
            state: JobState::Uploading,
            created_at: Utc::now(),
        }
    }

    /// Transition with a trace of the edge. Transitions out of a
    /// terminal state are ignored.
    pub fn transition(&mut self, next: JobState) {
        if self.state.is_terminal() && next != JobState::Cleaned {
            return;
        }
        tracing::debug!(job_id = %self.job_id, from = ?self.state, to = ?next, "job transition");
        self.state = next;
    }
}

/// Tagged event protocol carried in the SSE `data:` payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Informational only; does not change job state.
    Progress { percent: f32 },
    /// Terminal: the extracted record.
    Result {
        title: String,
        author: String,
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },
    /// Terminal: the service could not process the job.
    Error { message: String },
}

impl StreamEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Result { .. } | Self::Error { .. })
    }
}
