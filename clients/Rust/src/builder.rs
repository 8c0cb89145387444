use std::collections::HashSet;
use std::time::Duration;

use crate::error::{JobApiError, Result};
use crate::types::{Attachment, JobRequest, Parameters};

/// Parameter carrying the solve time limit, in milliseconds
pub const TIME_LIMIT_PARAMETER: &str = "oaas.timeLimit";

/// Builder for constructing job requests with a fluent API
#[derive(Debug, Default)]
pub struct JobRequestBuilder {
    attachments: Vec<Attachment>,
    parameters: Parameters,
    output: Option<String>,
}

impl JobRequestBuilder {
    /// Create a new job request builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input attachment
    ///
    /// # Example
    ///
    /// ```
    /// use oaas_job_sdk::JobRequestBuilder;
    ///
    /// let builder = JobRequestBuilder::new()
    ///     .input("model.json", br#"{"Hubs": []}"#.to_vec());
    /// ```
    pub fn input(mut self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.attachments.push(Attachment {
            name: name.into(),
            data: data.into(),
        });
        self
    }

    /// Set a job parameter, replacing any previous value for the key
    pub fn parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Name the attachment the job writes its result to
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.output = Some(name.into());
        self
    }

    /// Limit the solve time on the service side
    pub fn timeout(self, timeout: Duration) -> Self {
        let millis = timeout.as_millis().to_string();
        self.parameter(TIME_LIMIT_PARAMETER, millis)
    }

    /// Build the job request
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No input attachment has been added
    /// - Two attachments share a name
    /// - No output attachment has been named
    pub fn build(self) -> Result<JobRequest> {
        if self.attachments.is_empty() {
            return Err(JobApiError::InvalidRequest(
                "At least one input attachment is required".to_string(),
            ));
        }

        let mut names = HashSet::with_capacity(self.attachments.len());
        for attachment in &self.attachments {
            if !names.insert(attachment.name.as_str()) {
                return Err(JobApiError::InvalidRequest(format!(
                    "Attachment {} is declared twice",
                    attachment.name
                )));
            }
        }

        let output = self.output.ok_or_else(|| {
            JobApiError::InvalidRequest("An output attachment must be named".to_string())
        })?;

        Ok(JobRequest {
            attachments: self.attachments,
            parameters: self.parameters,
            output,
        })
    }
}
