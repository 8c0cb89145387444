use thiserror::Error;

/// Result type for job service client operations
pub type Result<T> = std::result::Result<T, JobApiError>;

/// Errors that can occur when using the job service client
#[derive(Error, Debug)]
pub enum JobApiError {
    /// HTTP request failed before a response was received
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The account already has the maximum number of outstanding jobs
    #[error("Job limit reached: {0}")]
    JobLimitReached(String),

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Invalid request configuration
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Authentication failed
    #[error("Authentication failed")]
    AuthenticationFailed,
}

impl JobApiError {
    /// Whether retrying the same call later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            JobApiError::Request(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            JobApiError::ApiError { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_transient() {
        let err = JobApiError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(err.is_transient());
    }

    #[test]
    fn test_job_limit_is_not_transient() {
        let err = JobApiError::JobLimitReached("5 jobs".to_string());
        assert!(!err.is_transient());
        assert!(!JobApiError::AuthenticationFailed.is_transient());
    }
}
