use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// One named input file of a job.
#[derive(Debug, Clone)]
pub struct JobAttachment {
    pub name: String,
    pub data: Arc<[u8]>,
}

/// Everything uploaded for one job.
#[derive(Debug, Clone)]
pub struct JobPayload {
    pub attachments: Vec<JobAttachment>,
    pub parameters: BTreeMap<String, String>,
}

impl JobPayload {
    pub fn attachment(&self, name: &str) -> Option<&JobAttachment> {
        self.attachments.iter().find(|a| a.name == name)
    }
}

/// Where the remote engine writes its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub attachment: String,
}

/// Reference to a job accepted by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobRef {
    pub job_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteState {
    Created,
    NotStarted,
    Running,
    Interrupting,
    Interrupted,
    Failed,
    Processed,
}

impl RemoteState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RemoteState::Interrupted | RemoteState::Failed | RemoteState::Processed
        )
    }
}

#[derive(Debug, Clone)]
pub struct RemoteStatus {
    pub state: RemoteState,
    pub failure_message: Option<String>,
    /// Parameters echoed back by the backend, including the correlation id.
    pub parameters: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The account already has its maximum number of outstanding jobs.
    #[error("job limit reached: {0}")]
    QuotaExceeded(String),

    /// Connection or server hiccup; the same call may succeed later.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote error: {0}")]
    Remote(String),

    #[error("job output unavailable: {0}")]
    MissingOutput(String),
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Narrow contract to the remote job service.
#[async_trait]
pub trait JobClient: Send + Sync {
    /// Create and start a job
    ///
    /// # Arguments
    /// * `payload` - Model blob, problem document and parameters
    /// * `output` - Attachment the result is written to
    /// * `timeout` - Solve time limit handed to the backend
    async fn submit(
        &self,
        payload: &JobPayload,
        output: &OutputSpec,
        timeout: Duration,
    ) -> Result<JobRef, ClientError>;

    async fn poll(&self, job: &JobRef) -> Result<RemoteStatus, ClientError>;

    async fn fetch_output(&self, job: &JobRef, output: &OutputSpec) -> Result<Vec<u8>, ClientError>;

    /// Delete a finished job on the backend.
    async fn release(&self, _job: &JobRef) -> Result<(), ClientError> {
        Ok(())
    }

    /// Get the backend name for logging/debugging
    fn name(&self) -> &str;
}
