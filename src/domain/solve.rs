use thiserror::Error;

use crate::domain::engine::{SubmissionEngine, SubmitError, SubmitOutcome, Submission};
use crate::domain::job::JobOutcome;

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("job limit reached, problem {} was not submitted", .0.problem_id)]
    QuotaExceeded(Submission),

    #[error(transparent)]
    Submit(#[from] SubmitError),
}

/// Submit one problem and wait for its outcome.
pub async fn optimize(
    engine: &SubmissionEngine,
    submission: Submission,
) -> Result<JobOutcome, SolveError> {
    let config = engine.config();
    // The job resolves TimedOut on its own after job_timeout; leave room for the last poll
    let wait = config
        .job_timeout
        .saturating_add(config.poll_interval)
        .saturating_add(config.retry_delay.saturating_mul(config.retries));

    match engine.submit(submission, Vec::new()).await? {
        SubmitOutcome::Accepted(handle) => Ok(handle.await_outcome(wait).await),
        SubmitOutcome::QuotaExceeded(submission) => Err(SolveError::QuotaExceeded(submission)),
    }
}
