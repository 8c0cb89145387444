use std::sync::Arc;

use log::{error, info, warn};

use crate::domain::barrier::{CompletionSignal, CountdownLatch};
use crate::domain::engine::{SubmissionEngine, SubmitError, SubmitOutcome, Submission};
use crate::domain::job::{JobHandle, JobListener};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: usize,
    pub submitted: usize,
    pub accepted: usize,
    pub quota_rejected: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    /// Every job the backend accepted, over all rounds.
    pub accepted: Vec<JobHandle>,
    /// Problems still rejected for quota when the round budget ran out.
    pub unsolved: Vec<Submission>,
    /// Problems whose submission failed outright.
    pub failed: Vec<SubmitError>,
    pub rounds: Vec<RoundSummary>,
}

impl BatchReport {
    pub fn all_accepted(&self) -> bool {
        self.unsolved.is_empty() && self.failed.is_empty()
    }
}

/// Submits a batch in rounds until every problem was accepted or the round budget is spent.
///
/// Each round waits until every job it got accepted has completed, then
/// resubmits the problems that hit the job limit.
pub struct BatchCoordinator {
    engine: Arc<SubmissionEngine>,
    max_rounds: Option<usize>,
}

impl BatchCoordinator {
    pub fn new(engine: Arc<SubmissionEngine>) -> Self {
        BatchCoordinator {
            engine,
            max_rounds: None,
        }
    }

    /// Defaults to the batch size.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = Some(max_rounds);
        self
    }

    pub async fn run(&self, submissions: Vec<Submission>) -> BatchReport {
        let max_rounds = self.max_rounds.unwrap_or(submissions.len());
        let mut report = BatchReport::default();
        let mut pending = submissions;

        while !pending.is_empty() && report.rounds.len() < max_rounds {
            let summary = self.round(report.rounds.len() + 1, &mut pending, &mut report).await;
            report.rounds.push(summary);
        }

        for submission in &pending {
            error!(
                "Problem {} was never accepted within {} rounds",
                submission.problem_id, max_rounds
            );
        }
        report.unsolved = pending;
        report
    }

    async fn round(
        &self,
        round: usize,
        pending: &mut Vec<Submission>,
        report: &mut BatchReport,
    ) -> RoundSummary {
        let mut summary = RoundSummary {
            round,
            submitted: pending.len(),
            ..RoundSummary::default()
        };
        info!("Round {}: submitting {} problems", round, pending.len());

        let latch = Arc::new(CountdownLatch::new(pending.len()));
        let mut rejected = Vec::new();

        for submission in pending.drain(..) {
            let signal: Arc<dyn JobListener> = Arc::new(CompletionSignal::new(latch.clone()));
            match self.engine.submit(submission, vec![signal]).await {
                Ok(SubmitOutcome::Accepted(handle)) => {
                    summary.accepted += 1;
                    report.accepted.push(handle);
                }
                Ok(SubmitOutcome::QuotaExceeded(submission)) => {
                    summary.quota_rejected += 1;
                    latch.count_down();
                    rejected.push(submission);
                }
                Err(e) => {
                    summary.failed += 1;
                    latch.count_down();
                    error!("{}", e);
                    report.failed.push(e);
                }
            }
        }

        latch.wait().await;
        if !rejected.is_empty() {
            warn!(
                "Round {}: {} problems to re-submit after the job limit was reached",
                round,
                rejected.len()
            );
        }
        *pending = rejected;
        summary
    }
}
