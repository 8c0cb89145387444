use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Job parameters, sent on creation and echoed back in job status
pub type Parameters = BTreeMap<String, String>;

/// Identifier assigned by the service to a created job
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An input file uploaded with a job
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Attachment name, e.g. `model.mod`
    pub name: String,
    /// Raw attachment content
    pub data: Vec<u8>,
}

/// Attachment declaration in the job creation body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentDecl {
    pub name: String,
}

/// Body of `POST /jobs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobCreationData {
    /// Declared input attachments
    pub attachments: Vec<AttachmentDecl>,
    /// Free-form job parameters
    #[serde(default)]
    pub parameters: Parameters,
}

/// A fully described job, ready to be submitted
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Input attachments uploaded before execution
    pub attachments: Vec<Attachment>,
    /// Job parameters
    pub parameters: Parameters,
    /// Name of the attachment holding the job output
    pub output: String,
}

impl JobRequest {
    /// The creation body announced to the service for this request
    pub fn creation_data(&self) -> JobCreationData {
        JobCreationData {
            attachments: self
                .attachments
                .iter()
                .map(|a| AttachmentDecl {
                    name: a.name.clone(),
                })
                .collect(),
            parameters: self.parameters.clone(),
        }
    }
}

/// Execution status reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    /// Job exists but has not been submitted for execution
    Created,
    /// Job is queued
    NotStarted,
    /// Job is being solved
    Running,
    /// An interruption was requested
    Interrupting,
    /// Job was interrupted before finishing
    Interrupted,
    /// The solve failed
    Failed,
    /// The solve finished and outputs are available
    Processed,
}

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutionStatus::Interrupted | ExecutionStatus::Failed | ExecutionStatus::Processed
        )
    }
}

/// Details attached to a failed job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureInfo {
    pub message: String,
}

/// Response of `GET /jobs/{id}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    /// Job identifier
    #[serde(rename = "_id")]
    pub id: JobId,
    /// Current execution status
    pub execution_status: ExecutionStatus,
    /// Failure details, if the job failed
    #[serde(default)]
    pub failure_info: Option<FailureInfo>,
    /// Parameters supplied at creation
    #[serde(default)]
    pub parameters: Parameters,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_info_parses_service_json() {
        let info: JobInfo = serde_json::from_str(
            r#"{
                "_id": "job-1",
                "executionStatus": "NOT_STARTED",
                "parameters": {"oaas.client.problem.id": "Problem #0"}
            }"#,
        )
        .unwrap();
        assert_eq!(info.id.as_str(), "job-1");
        assert_eq!(info.execution_status, ExecutionStatus::NotStarted);
        assert!(info.failure_info.is_none());
        assert_eq!(info.parameters["oaas.client.problem.id"], "Problem #0");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ExecutionStatus::Processed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Interrupted.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(!ExecutionStatus::Interrupting.is_terminal());
    }
}
