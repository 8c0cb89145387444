use std::time::Duration;

use async_trait::async_trait;
use oaas_job_sdk::{ExecutionStatus, JobApiClient, JobApiError, JobId, JobRequestBuilder};

use crate::domain::job_client::{
    ClientError, JobClient, JobPayload, JobRef, OutputSpec, RemoteState, RemoteStatus,
};

/// Remote job service reached over its REST API.
pub struct HttpJobClient {
    api: JobApiClient,
}

impl HttpJobClient {
    pub fn new(base_url: &str, api_key: &str) -> Result<Self, ClientError> {
        let api = JobApiClient::new(base_url)
            .map_err(map_error)?
            .with_api_key(api_key);
        Ok(HttpJobClient { api })
    }

    pub fn from_api(api: JobApiClient) -> Self {
        HttpJobClient { api }
    }
}

fn map_error(error: JobApiError) -> ClientError {
    match error {
        JobApiError::JobLimitReached(message) => ClientError::QuotaExceeded(message),
        e if e.is_transient() => ClientError::Transport(e.to_string()),
        e => ClientError::Remote(e.to_string()),
    }
}

fn map_state(status: ExecutionStatus) -> RemoteState {
    match status {
        ExecutionStatus::Created => RemoteState::Created,
        ExecutionStatus::NotStarted => RemoteState::NotStarted,
        ExecutionStatus::Running => RemoteState::Running,
        ExecutionStatus::Interrupting => RemoteState::Interrupting,
        ExecutionStatus::Interrupted => RemoteState::Interrupted,
        ExecutionStatus::Failed => RemoteState::Failed,
        ExecutionStatus::Processed => RemoteState::Processed,
    }
}

fn job_id(job: &JobRef) -> JobId {
    JobId(job.job_id.clone())
}

#[async_trait]
impl JobClient for HttpJobClient {
    async fn submit(
        &self,
        payload: &JobPayload,
        output: &OutputSpec,
        timeout: Duration,
    ) -> Result<JobRef, ClientError> {
        let mut builder = JobRequestBuilder::new()
            .output(output.attachment.as_str())
            .timeout(timeout);
        for attachment in &payload.attachments {
            builder = builder.input(attachment.name.as_str(), attachment.data.to_vec());
        }
        for (key, value) in &payload.parameters {
            builder = builder.parameter(key.as_str(), value.as_str());
        }
        let request = builder
            .build()
            .map_err(|e| ClientError::Remote(e.to_string()))?;

        let id = self.api.submit(&request).await.map_err(map_error)?;
        Ok(JobRef { job_id: id.0 })
    }

    async fn poll(&self, job: &JobRef) -> Result<RemoteStatus, ClientError> {
        let info = self.api.job_info(&job_id(job)).await.map_err(map_error)?;
        Ok(RemoteStatus {
            state: map_state(info.execution_status),
            failure_message: info.failure_info.map(|f| f.message),
            parameters: info.parameters,
        })
    }

    async fn fetch_output(&self, job: &JobRef, output: &OutputSpec) -> Result<Vec<u8>, ClientError> {
        match self
            .api
            .download_attachment(&job_id(job), &output.attachment)
            .await
        {
            Ok(bytes) => Ok(bytes),
            Err(JobApiError::ApiError { status: 404, .. }) => Err(ClientError::MissingOutput(
                format!("{} of job {}", output.attachment, job.job_id),
            )),
            Err(e) => Err(map_error(e)),
        }
    }

    async fn release(&self, job: &JobRef) -> Result<(), ClientError> {
        self.api.delete_job(&job_id(job)).await.map_err(map_error)
    }

    fn name(&self) -> &str {
        "HTTP"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_limit_maps_to_quota_exceeded() {
        let mapped = map_error(JobApiError::JobLimitReached("2 jobs".to_string()));
        assert_eq!(mapped, ClientError::QuotaExceeded("2 jobs".to_string()));
    }

    #[test]
    fn test_server_errors_map_to_transport() {
        let mapped = map_error(JobApiError::ApiError {
            status: 502,
            message: "bad gateway".to_string(),
        });
        assert!(mapped.is_transient());
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        assert!(!map_error(JobApiError::AuthenticationFailed).is_transient());
        assert!(!map_error(JobApiError::ApiError {
            status: 400,
            message: "bad request".to_string(),
        })
        .is_transient());
    }

    #[test]
    fn test_interrupted_status_is_terminal() {
        assert!(map_state(ExecutionStatus::Interrupted).is_terminal());
        assert!(!map_state(ExecutionStatus::Interrupting).is_terminal());
    }

    #[test]
    fn test_new_given_invalid_url_should_fail() {
        assert!(HttpJobClient::new("not a url", "key").is_err());
    }
}
