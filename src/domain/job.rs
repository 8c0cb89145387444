use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::sync::watch;

use crate::models::{Problem, Solution};

/// Exactly one terminal value per submitted job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Processed(Solution),
    Failed(String),
    Rejected(String),
    TimedOut,
}

impl JobOutcome {
    pub fn solution(&self) -> Option<&Solution> {
        match self {
            JobOutcome::Processed(solution) => Some(solution),
            _ => None,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, JobOutcome::Processed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobException {
    QuotaExceeded(String),
    Other(String),
}

/// Lifecycle of one job, in emission order:
/// Created, Submitted, Running, one of Processed / Failed / Interrupted, Completed.
/// `Exception` is out of band.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Created,
    Submitted,
    Running,
    Processed,
    Failed(String),
    Interrupted,
    Completed,
    Exception(JobException),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobContext {
    pub problem_id: String,
    /// Unset while the backend has not accepted the job.
    pub job_id: Option<String>,
}

impl fmt::Display for JobContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.job_id {
            Some(job_id) => write!(f, "{} - {}", self.problem_id, job_id),
            None => write!(f, "{} - <not created>", self.problem_id),
        }
    }
}

/// Receives the lifecycle events of jobs it was attached to.
pub trait JobListener: Send + Sync {
    fn on_event(&self, job: &JobContext, event: &JobEvent);
}

/// Logs every lifecycle event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogJobListener;

impl JobListener for LogJobListener {
    fn on_event(&self, job: &JobContext, event: &JobEvent) {
        match event {
            JobEvent::Created => info!("CREATED: {}", job),
            JobEvent::Submitted => info!("SUBMITTED: {}", job),
            JobEvent::Running => info!("RUNNING: {}", job),
            JobEvent::Processed => info!("PROCESSED: {}", job),
            JobEvent::Failed(message) => error!("FAILED: {} : {}", job, message),
            JobEvent::Interrupted => warn!("INTERRUPTION: {}", job),
            JobEvent::Completed => info!("COMPLETED: {}", job),
            JobEvent::Exception(JobException::QuotaExceeded(_)) => warn!(
                "The maximum job limit has been reached for the job associated with the problem: {}",
                job.problem_id
            ),
            JobEvent::Exception(JobException::Other(message)) => {
                error!("EXCEPTION: {} : {}", job, message)
            }
        }
    }
}

/// Delivers events to listeners one at a time, in emission order.
pub(crate) struct EventSink {
    context: JobContext,
    listeners: Vec<Arc<dyn JobListener>>,
}

impl EventSink {
    pub(crate) fn new(context: JobContext, listeners: Vec<Arc<dyn JobListener>>) -> Self {
        EventSink { context, listeners }
    }

    pub(crate) fn emit(&self, event: JobEvent) {
        for listener in &self.listeners {
            listener.on_event(&self.context, &event);
        }
    }
}

/// Write side of a handle's outcome slot.
pub(crate) struct OutcomePublisher(watch::Sender<Option<JobOutcome>>);

impl OutcomePublisher {
    pub(crate) fn publish(self, outcome: JobOutcome) {
        self.0.send_replace(Some(outcome));
    }
}

/// One accepted job. Cloning shares the same outcome slot.
#[derive(Debug, Clone)]
pub struct JobHandle {
    context: JobContext,
    problem: Arc<Problem>,
    outcome: watch::Receiver<Option<JobOutcome>>,
}

impl JobHandle {
    pub(crate) fn new(
        problem_id: &str,
        job_id: &str,
        problem: Arc<Problem>,
    ) -> (Self, OutcomePublisher) {
        let (tx, rx) = watch::channel(None);
        let handle = JobHandle {
            context: JobContext {
                problem_id: problem_id.to_string(),
                job_id: Some(job_id.to_string()),
            },
            problem,
            outcome: rx,
        };
        (handle, OutcomePublisher(tx))
    }

    pub fn problem_id(&self) -> &str {
        &self.context.problem_id
    }

    pub fn job_id(&self) -> &str {
        self.context.job_id.as_deref().unwrap_or_default()
    }

    pub fn problem(&self) -> &Arc<Problem> {
        &self.problem
    }

    pub(crate) fn context(&self) -> &JobContext {
        &self.context
    }

    /// The terminal outcome, if already published.
    pub fn outcome(&self) -> Option<JobOutcome> {
        self.outcome.borrow().clone()
    }

    /// Wait for the terminal outcome. Elapsing `timeout` yields `TimedOut`
    /// and leaves the remote job untouched.
    pub async fn await_outcome(&self, timeout: Duration) -> JobOutcome {
        let mut outcome = self.outcome.clone();
        let waited = match tokio::time::timeout(timeout, outcome.wait_for(Option::is_some)).await {
            Ok(Ok(ready)) => (*ready).clone().unwrap_or(JobOutcome::TimedOut),
            Ok(Err(_)) => JobOutcome::Failed("job stopped before publishing an outcome".to_string()),
            Err(_) => JobOutcome::TimedOut,
        };
        waited
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<JobEvent>>);

    impl JobListener for Recorder {
        fn on_event(&self, _job: &JobContext, event: &JobEvent) {
            self.0.lock().push(event.clone());
        }
    }

    #[tokio::test]
    async fn test_await_outcome_returns_published_outcome() {
        let (handle, publisher) = JobHandle::new("p", "j", Arc::new(Problem::new()));
        assert!(handle.outcome().is_none());

        publisher.publish(JobOutcome::Failed("boom".to_string()));
        match handle.await_outcome(Duration::from_secs(1)).await {
            JobOutcome::Failed(message) => assert_eq!(message, "boom"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(handle.outcome().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_await_outcome_times_out_without_consuming_the_outcome() {
        let (handle, publisher) = JobHandle::new("p", "j", Arc::new(Problem::new()));

        let outcome = handle.await_outcome(Duration::from_secs(5)).await;
        assert!(matches!(outcome, JobOutcome::TimedOut));

        publisher.publish(JobOutcome::Processed(Solution::default()));
        assert!(handle
            .await_outcome(Duration::from_secs(5))
            .await
            .is_processed());
    }

    #[tokio::test]
    async fn test_await_outcome_when_publisher_dropped_reports_failure() {
        let (handle, publisher) = JobHandle::new("p", "j", Arc::new(Problem::new()));
        drop(publisher);
        assert!(matches!(
            handle.await_outcome(Duration::from_secs(1)).await,
            JobOutcome::Failed(_)
        ));
    }

    #[test]
    fn test_event_sink_delivers_in_order_to_every_listener() {
        let first = Arc::new(Recorder::default());
        let second = Arc::new(Recorder::default());
        let sink = EventSink::new(
            JobContext {
                problem_id: "p".to_string(),
                job_id: Some("j".to_string()),
            },
            vec![
                first.clone() as Arc<dyn JobListener>,
                second.clone() as Arc<dyn JobListener>,
                Arc::new(LogJobListener) as Arc<dyn JobListener>,
            ],
        );

        sink.emit(JobEvent::Created);
        sink.emit(JobEvent::Submitted);
        sink.emit(JobEvent::Completed);

        let expected = vec![JobEvent::Created, JobEvent::Submitted, JobEvent::Completed];
        assert_eq!(*first.0.lock(), expected);
        assert_eq!(*second.0.lock(), expected);
    }
}
