use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::{sleep, Instant};

use crate::convert::to_input_document;
use crate::domain::decode::decode_for_problem;
use crate::domain::job::{
    EventSink, JobContext, JobEvent, JobException, JobHandle, JobListener, JobOutcome,
    LogJobListener, OutcomePublisher,
};
use crate::domain::job_client::{
    ClientError, JobAttachment, JobClient, JobPayload, JobRef, OutputSpec, RemoteState,
};
use crate::domain::validate::{validate_problem, ProblemInputError};
use crate::models::Problem;

pub const MODEL_ATTACHMENT: &str = "model.mod";
pub const DATA_ATTACHMENT: &str = "model.json";
pub const OUTPUT_ATTACHMENT: &str = "solution.json";
pub const PROBLEM_ID_PARAMETER: &str = "oaas.client.problem.id";

/// Shortest pause between two status checks of one job.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Jobs in flight at once, from submission to completion.
    pub workers: usize,
    pub poll_interval: Duration,
    pub job_timeout: Duration,
    /// Extra attempts after a transient transport failure.
    pub retries: u32,
    pub retry_delay: Duration,
    pub delete_on_completion: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            workers: 4,
            poll_interval: Duration::from_secs(1),
            job_timeout: Duration::from_secs(5 * 60),
            retries: 4,
            retry_delay: Duration::from_secs(5),
            delete_on_completion: true,
        }
    }
}

impl EngineConfig {
    /// Settings for a batch of `nb_jobs` problems: one worker and one minute of timeout per job.
    pub fn for_batch(nb_jobs: usize) -> Self {
        let nb_jobs = nb_jobs.max(1);
        EngineConfig {
            workers: nb_jobs,
            job_timeout: Duration::from_secs(60u64.saturating_mul(nb_jobs as u64)),
            ..EngineConfig::default()
        }
    }
}

/// A problem together with the correlation id it is submitted under.
#[derive(Debug, Clone)]
pub struct Submission {
    pub problem_id: String,
    pub problem: Arc<Problem>,
}

impl Submission {
    pub fn new(problem_id: impl Into<String>, problem: Problem) -> Self {
        Submission {
            problem_id: problem_id.into(),
            problem: Arc::new(problem),
        }
    }
}

#[derive(Debug)]
pub enum SubmitOutcome {
    Accepted(JobHandle),
    /// The backend is at its job limit. The submission comes back untouched.
    QuotaExceeded(Submission),
}

#[derive(Debug, Error)]
pub enum SubmitFailure {
    #[error("invalid problem: {0}")]
    InvalidProblem(#[from] ProblemInputError),

    #[error("cannot encode problem document: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("gave up after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: ClientError },

    #[error(transparent)]
    Client(ClientError),

    #[error("submission engine is shut down")]
    Closed,
}

/// Submission failed before any remote job existed.
#[derive(Debug, Error)]
#[error("could not submit problem {}: {source}", .submission.problem_id)]
pub struct SubmitError {
    pub submission: Submission,
    #[source]
    pub source: SubmitFailure,
}

/// Call `call` until it succeeds, fails permanently, or `retries` extra attempts are spent.
/// Pauses between attempts never run past `deadline`; once it has passed the last
/// error is returned. The error carries the number of attempts made.
async fn with_retries<T, F, Fut>(
    retries: u32,
    delay: Duration,
    deadline: Option<Instant>,
    what: &str,
    mut call: F,
) -> Result<T, (u32, ClientError)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt <= retries => {
                let pause = match deadline {
                    Some(deadline) => {
                        let left = deadline.saturating_duration_since(Instant::now());
                        if left.is_zero() {
                            return Err((attempt, e));
                        }
                        delay.min(left)
                    }
                    None => delay,
                };
                warn!(
                    "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                    what,
                    attempt,
                    retries + 1,
                    e,
                    pause
                );
                sleep(pause).await;
            }
            Err(e) => return Err((attempt, e)),
        }
    }
}

/// Submits problems through a [`JobClient`] and drives each accepted job to its outcome.
pub struct SubmissionEngine {
    client: Arc<dyn JobClient>,
    model: Arc<[u8]>,
    config: EngineConfig,
    output: OutputSpec,
    listeners: Vec<Arc<dyn JobListener>>,
    slots: Arc<Semaphore>,
    outstanding: Arc<AtomicUsize>,
}

impl SubmissionEngine {
    pub fn new(
        client: Arc<dyn JobClient>,
        model: impl Into<Arc<[u8]>>,
        mut config: EngineConfig,
    ) -> Self {
        config.poll_interval = config.poll_interval.max(MIN_POLL_INTERVAL);
        let workers = config.workers.max(1);
        info!(
            "Submission engine on {} backend: {} workers, poll every {:?}, timeout {:?}",
            client.name(),
            workers,
            config.poll_interval,
            config.job_timeout
        );
        SubmissionEngine {
            client,
            model: model.into(),
            config,
            output: OutputSpec {
                attachment: OUTPUT_ATTACHMENT.to_string(),
            },
            listeners: vec![Arc::new(LogJobListener)],
            slots: Arc::new(Semaphore::new(workers)),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the listeners attached to every job. The default logs each event.
    pub fn with_listeners(mut self, listeners: Vec<Arc<dyn JobListener>>) -> Self {
        self.listeners = listeners;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.client.name()
    }

    /// Jobs accepted by the backend that have not completed yet.
    pub fn outstanding_jobs(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }

    pub fn available_workers(&self) -> usize {
        self.slots.available_permits()
    }

    /// Refuse further submissions. Running jobs are driven to completion.
    pub fn shutdown(&self) {
        self.slots.close();
    }

    fn payload(&self, submission: &Submission) -> Result<JobPayload, SubmitFailure> {
        validate_problem(&submission.problem)?;
        let document = to_input_document(&submission.problem)?;

        let mut parameters = BTreeMap::new();
        parameters.insert(
            PROBLEM_ID_PARAMETER.to_string(),
            submission.problem_id.clone(),
        );

        Ok(JobPayload {
            attachments: vec![
                JobAttachment {
                    name: MODEL_ATTACHMENT.to_string(),
                    data: self.model.clone(),
                },
                JobAttachment {
                    name: DATA_ATTACHMENT.to_string(),
                    data: document.into(),
                },
            ],
            parameters,
        })
    }

    /// Submit one problem.
    ///
    /// Waits for a free worker first. `listeners` receive this job's events in
    /// addition to the engine-wide ones; a quota rejection is reported to them
    /// as an `Exception` event and returned as [`SubmitOutcome::QuotaExceeded`].
    pub async fn submit(
        &self,
        submission: Submission,
        listeners: Vec<Arc<dyn JobListener>>,
    ) -> Result<SubmitOutcome, SubmitError> {
        let mut all_listeners = self.listeners.clone();
        all_listeners.extend(listeners);

        let pending = JobContext {
            problem_id: submission.problem_id.clone(),
            job_id: None,
        };

        let payload = match self.payload(&submission) {
            Ok(payload) => payload,
            Err(source) => return Err(self.fail(submission, source, pending, all_listeners)),
        };

        let permit = match self.slots.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return Err(self.fail(submission, SubmitFailure::Closed, pending, all_listeners)),
        };

        let what = format!("Submission of problem {}", submission.problem_id);
        let (client, payload, output) = (&self.client, &payload, &self.output);
        let timeout = self.config.job_timeout;
        let created = with_retries(
            self.config.retries,
            self.config.retry_delay,
            None,
            &what,
            move || client.submit(payload, output, timeout),
        )
        .await;

        let job = match created {
            Ok(job) => job,
            Err((_, ClientError::QuotaExceeded(reason))) => {
                EventSink::new(pending, all_listeners)
                    .emit(JobEvent::Exception(JobException::QuotaExceeded(reason)));
                warn!(
                    "Adding problem: {} to the list of candidate problems to be re-submitted ({} jobs outstanding)",
                    submission.problem_id,
                    self.outstanding_jobs()
                );
                return Ok(SubmitOutcome::QuotaExceeded(submission));
            }
            Err((attempts, last)) if last.is_transient() => {
                let source = SubmitFailure::RetriesExhausted { attempts, last };
                return Err(self.fail(submission, source, pending, all_listeners));
            }
            Err((_, e)) => {
                return Err(self.fail(submission, SubmitFailure::Client(e), pending, all_listeners))
            }
        };

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let (handle, outcome) =
            JobHandle::new(&submission.problem_id, &job.job_id, submission.problem.clone());

        let sink = Arc::new(EventSink::new(handle.context().clone(), all_listeners));
        let driver = JobDriver {
            client: self.client.clone(),
            job,
            output: self.output.clone(),
            config: self.config.clone(),
            problem_id: submission.problem_id,
            problem: submission.problem,
            sink: sink.clone(),
            completion: Completion {
                sink,
                publisher: Some(outcome),
                outstanding: self.outstanding.clone(),
            },
            _permit: permit,
        };
        tokio::spawn(driver.run());

        Ok(SubmitOutcome::Accepted(handle))
    }

    fn fail(
        &self,
        submission: Submission,
        source: SubmitFailure,
        pending: JobContext,
        listeners: Vec<Arc<dyn JobListener>>,
    ) -> SubmitError {
        EventSink::new(pending, listeners)
            .emit(JobEvent::Exception(JobException::Other(source.to_string())));
        SubmitError { submission, source }
    }
}

/// Publishes a job's outcome and reports `Completed` exactly once, also when
/// the driver task unwinds.
struct Completion {
    sink: Arc<EventSink>,
    publisher: Option<OutcomePublisher>,
    outstanding: Arc<AtomicUsize>,
}

impl Completion {
    fn finish(mut self, outcome: JobOutcome) {
        self.complete(outcome);
    }

    fn complete(&mut self, outcome: JobOutcome) {
        if let Some(publisher) = self.publisher.take() {
            publisher.publish(outcome);
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            self.sink.emit(JobEvent::Completed);
        }
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if self.publisher.is_none() {
            return;
        }
        let message = "job driver stopped before the job finished".to_string();
        self.sink
            .emit(JobEvent::Exception(JobException::Other(message.clone())));
        self.sink.emit(JobEvent::Failed(message.clone()));
        self.complete(JobOutcome::Failed(message));
    }
}

/// Polls one accepted job until it is terminal, then publishes its outcome.
/// Holds a worker slot for as long as it runs.
struct JobDriver {
    client: Arc<dyn JobClient>,
    job: JobRef,
    output: OutputSpec,
    config: EngineConfig,
    problem_id: String,
    problem: Arc<Problem>,
    sink: Arc<EventSink>,
    completion: Completion,
    _permit: OwnedSemaphorePermit,
}

impl JobDriver {
    async fn run(self) {
        self.sink.emit(JobEvent::Created);
        self.sink.emit(JobEvent::Submitted);

        let outcome = self.watch().await;

        if self.config.delete_on_completion {
            if let Err(e) = self.client.release(&self.job).await {
                warn!("Could not delete job {}: {}", self.job.job_id, e);
            }
        }

        self.completion.finish(outcome);
    }

    async fn watch(&self) -> JobOutcome {
        // None when the timeout is too large to represent: no deadline
        let deadline = Instant::now().checked_add(self.config.job_timeout);
        let expired = |now: Instant| deadline.map_or(false, |deadline| now >= deadline);
        let what = format!("Status check of job {}", self.job.job_id);
        let mut running = false;

        loop {
            if expired(Instant::now()) {
                return self.timed_out();
            }

            let (client, job) = (&self.client, &self.job);
            let polled = with_retries(
                self.config.retries,
                self.config.retry_delay,
                deadline,
                &what,
                move || client.poll(job),
            )
            .await;

            let status = match polled {
                Ok(status) => status,
                Err((_, e)) if e.is_transient() && expired(Instant::now()) => {
                    return self.timed_out()
                }
                Err((_, e)) => return self.failed(e.to_string()),
            };
            debug!("Job {} is {:?}", self.job.job_id, status.state);

            if status.state != RemoteState::Created
                && status.state != RemoteState::NotStarted
                && !running
            {
                running = true;
                self.sink.emit(JobEvent::Running);
            }

            match status.state {
                RemoteState::Processed => {
                    if let Some(echoed) = status.parameters.get(PROBLEM_ID_PARAMETER) {
                        if *echoed != self.problem_id {
                            return self.failed(format!(
                                "job {} reports problem id {} instead of {}",
                                self.job.job_id, echoed, self.problem_id
                            ));
                        }
                    }
                    return self.collect().await;
                }
                RemoteState::Failed => {
                    let message = status
                        .failure_message
                        .unwrap_or_else(|| "remote job failed".to_string());
                    self.sink.emit(JobEvent::Failed(message.clone()));
                    return JobOutcome::Failed(message);
                }
                RemoteState::Interrupted => {
                    self.sink.emit(JobEvent::Interrupted);
                    return JobOutcome::Rejected(
                        status
                            .failure_message
                            .unwrap_or_else(|| "job was interrupted".to_string()),
                    );
                }
                _ => {}
            }

            let pause = match deadline {
                Some(deadline) => self
                    .config
                    .poll_interval
                    .min(deadline.saturating_duration_since(Instant::now())),
                None => self.config.poll_interval,
            };
            sleep(pause).await;
        }
    }

    fn timed_out(&self) -> JobOutcome {
        warn!(
            "Job {} for problem {} did not finish within {:?}, it is left running remotely",
            self.job.job_id, self.problem_id, self.config.job_timeout
        );
        self.sink.emit(JobEvent::Interrupted);
        JobOutcome::TimedOut
    }

    async fn collect(&self) -> JobOutcome {
        let what = format!("Download of {} for job {}", self.output.attachment, self.job.job_id);
        let (client, job, output) = (&self.client, &self.job, &self.output);
        let fetched = with_retries(
            self.config.retries,
            self.config.retry_delay,
            None,
            &what,
            move || client.fetch_output(job, output),
        )
        .await;

        let bytes = match fetched {
            Ok(bytes) => bytes,
            Err((_, e)) => return self.failed(e.to_string()),
        };

        match decode_for_problem(&self.problem, &bytes) {
            Ok(solution) => {
                self.sink.emit(JobEvent::Processed);
                JobOutcome::Processed(solution)
            }
            Err(e) => {
                error!("Result of job {} cannot be decoded: {}", self.job.job_id, e);
                self.failed(format!("result decode failed: {}", e))
            }
        }
    }

    fn failed(&self, message: String) -> JobOutcome {
        self.sink
            .emit(JobEvent::Exception(JobException::Other(message.clone())));
        self.sink.emit(JobEvent::Failed(message.clone()));
        JobOutcome::Failed(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::clients::simulated::{SimulatedBackend, SimulatedRun};
    use crate::domain::job_client::RemoteStatus;
    use crate::factory::problem_with_fixed_shipments;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicU32;

    /// Accepts every job; status checks either panic or never get through.
    struct BrokenStatusBackend {
        panics: bool,
        polls: AtomicU32,
    }

    impl BrokenStatusBackend {
        fn new(panics: bool) -> Self {
            Self {
                panics,
                polls: AtomicU32::new(0),
            }
        }
    }

    #[async_trait]
    impl JobClient for BrokenStatusBackend {
        async fn submit(
            &self,
            _payload: &JobPayload,
            _output: &OutputSpec,
            _timeout: Duration,
        ) -> Result<JobRef, ClientError> {
            Ok(JobRef {
                job_id: "job-1".to_string(),
            })
        }

        async fn poll(&self, _job: &JobRef) -> Result<RemoteStatus, ClientError> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            if self.panics {
                panic!("status decoder blew up");
            }
            Err(ClientError::Transport("connection reset".to_string()))
        }

        async fn fetch_output(
            &self,
            _job: &JobRef,
            _output: &OutputSpec,
        ) -> Result<Vec<u8>, ClientError> {
            Err(ClientError::MissingOutput("no output".to_string()))
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    fn accepted(outcome: SubmitOutcome) -> JobHandle {
        match outcome {
            SubmitOutcome::Accepted(handle) => handle,
            SubmitOutcome::QuotaExceeded(_) => panic!("unexpected quota rejection"),
        }
    }

    #[derive(Default)]
    struct Recorder(Mutex<Vec<JobEvent>>);

    impl JobListener for Recorder {
        fn on_event(&self, _job: &JobContext, event: &JobEvent) {
            self.0.lock().push(event.clone());
        }
    }

    fn config() -> EngineConfig {
        EngineConfig {
            workers: 4,
            poll_interval: Duration::from_millis(100),
            job_timeout: Duration::from_secs(60),
            retries: 2,
            retry_delay: Duration::from_secs(1),
            delete_on_completion: true,
        }
    }

    fn engine(backend: Arc<SimulatedBackend>, config: EngineConfig) -> SubmissionEngine {
        SubmissionEngine::new(backend, b"model".to_vec(), config)
    }

    #[test]
    fn test_for_batch_scales_workers_and_timeout() {
        let config = EngineConfig::for_batch(5);
        assert_eq!(config.workers, 5);
        assert_eq!(config.job_timeout, Duration::from_secs(300));
        assert_eq!(config.retries, 4);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
        assert_eq!(config.poll_interval, Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_accepted_job_emits_ordered_lifecycle() {
        let backend = Arc::new(SimulatedBackend::new(2));
        let engine = engine(backend.clone(), config());
        let recorder = Arc::new(Recorder::default());

        let outcome = engine
            .submit(
                Submission::new("p1", problem_with_fixed_shipments()),
                vec![recorder.clone() as Arc<dyn JobListener>],
            )
            .await
            .unwrap();
        let handle = match outcome {
            SubmitOutcome::Accepted(handle) => handle,
            SubmitOutcome::QuotaExceeded(_) => panic!("unexpected quota rejection"),
        };

        let result = handle.await_outcome(Duration::from_secs(120)).await;
        let solution = result.solution().expect("processed");
        for record in solution.records() {
            assert!(handle
                .problem()
                .hubs
                .iter()
                .any(|h| Arc::ptr_eq(h, record.hub())));
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            *recorder.0.lock(),
            vec![
                JobEvent::Created,
                JobEvent::Submitted,
                JobEvent::Running,
                JobEvent::Processed,
                JobEvent::Completed
            ]
        );
        assert_eq!(engine.outstanding_jobs(), 0);
        assert_eq!(backend.live_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_given_full_quota_should_return_submission_unchanged() {
        let backend = Arc::new(SimulatedBackend::new(1));
        let engine = engine(backend, config());
        let recorder = Arc::new(Recorder::default());

        let first = engine
            .submit(Submission::new("p1", problem_with_fixed_shipments()), vec![])
            .await
            .unwrap();
        assert!(matches!(first, SubmitOutcome::Accepted(_)));

        let original = Submission::new("p2", problem_with_fixed_shipments());
        let problem = original.problem.clone();
        let listeners = vec![recorder.clone() as Arc<dyn JobListener>];
        match engine.submit(original, listeners).await.unwrap() {
            SubmitOutcome::QuotaExceeded(returned) => {
                assert_eq!(returned.problem_id, "p2");
                assert!(Arc::ptr_eq(&returned.problem, &problem));
            }
            SubmitOutcome::Accepted(_) => panic!("quota should have been exceeded"),
        }
        assert!(matches!(
            recorder.0.lock().as_slice(),
            [JobEvent::Exception(JobException::QuotaExceeded(_))]
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_retries_transient_failures() {
        let backend = Arc::new(SimulatedBackend::new(2).with_transient_submit_failures(2));
        let engine = engine(backend.clone(), config());

        let outcome = engine
            .submit(Submission::new("p1", problem_with_fixed_shipments()), vec![])
            .await
            .unwrap();
        assert!(matches!(outcome, SubmitOutcome::Accepted(_)));
        assert_eq!(backend.submit_attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_given_persistent_transport_failure_should_exhaust_retries() {
        let backend = Arc::new(SimulatedBackend::new(2).with_transient_submit_failures(10));
        let engine = engine(backend, config());

        let err = engine
            .submit(Submission::new("p1", problem_with_fixed_shipments()), vec![])
            .await
            .unwrap_err();
        assert_eq!(err.submission.problem_id, "p1");
        assert!(matches!(
            err.source,
            SubmitFailure::RetriesExhausted { attempts: 3, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_given_foreign_entity_should_fail_before_remote_job() {
        let backend = Arc::new(SimulatedBackend::new(2));
        let engine = engine(backend.clone(), config());

        let mut problem = problem_with_fixed_shipments();
        let stranger = Arc::new(crate::models::Hub {
            name: "G".to_string(),
        });
        let spoke = problem.spokes[0].clone();
        problem.add_route(&spoke, &stranger, 10);

        let err = engine
            .submit(Submission::new("p1", problem), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err.source, SubmitFailure::InvalidProblem(_)));
        assert_eq!(backend.submit_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_failure_resolves_failed() {
        let backend = Arc::new(
            SimulatedBackend::new(2)
                .with_solver(Arc::new(|_: &JobPayload| SimulatedRun::Failed("infeasible".to_string()))),
        );
        let engine = engine(backend, config());

        let handle = match engine
            .submit(Submission::new("p1", problem_with_fixed_shipments()), vec![])
            .await
            .unwrap()
        {
            SubmitOutcome::Accepted(handle) => handle,
            SubmitOutcome::QuotaExceeded(_) => panic!("unexpected quota rejection"),
        };
        match handle.await_outcome(Duration::from_secs(120)).await {
            JobOutcome::Failed(message) => assert_eq!(message, "infeasible"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_result_resolves_failed() {
        let backend = Arc::new(SimulatedBackend::new(2).with_solver(Arc::new(|_: &JobPayload| {
            SimulatedRun::Processed(br#"{"Result":{"totalCost":1},"NbTrucksOnRouteRes":[{"spoke":"Z","hub":"G","truckType":"BigTruck","nbTruck":1}]}"#.to_vec())
        })));
        let engine = engine(backend, config());
        let recorder = Arc::new(Recorder::default());

        let handle = match engine
            .submit(
                Submission::new("p1", problem_with_fixed_shipments()),
                vec![recorder.clone() as Arc<dyn JobListener>],
            )
            .await
            .unwrap()
        {
            SubmitOutcome::Accepted(handle) => handle,
            SubmitOutcome::QuotaExceeded(_) => panic!("unexpected quota rejection"),
        };
        assert!(matches!(
            handle.await_outcome(Duration::from_secs(120)).await,
            JobOutcome::Failed(_)
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(recorder.0.lock().last(), Some(&JobEvent::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_job_exceeding_timeout_resolves_timed_out() {
        let backend = Arc::new(SimulatedBackend::new(2).with_run_time(Duration::from_secs(600)));
        let engine = engine(
            backend.clone(),
            EngineConfig {
                job_timeout: Duration::from_secs(5),
                delete_on_completion: false,
                ..config()
            },
        );
        let recorder = Arc::new(Recorder::default());

        let handle = match engine
            .submit(
                Submission::new("p1", problem_with_fixed_shipments()),
                vec![recorder.clone() as Arc<dyn JobListener>],
            )
            .await
            .unwrap()
        {
            SubmitOutcome::Accepted(handle) => handle,
            SubmitOutcome::QuotaExceeded(_) => panic!("unexpected quota rejection"),
        };
        assert!(matches!(
            handle.await_outcome(Duration::from_secs(120)).await,
            JobOutcome::TimedOut
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let events = recorder.0.lock().clone();
        assert_eq!(&events[events.len() - 2..], &[JobEvent::Interrupted, JobEvent::Completed]);
        // Remote job is left alone
        assert_eq!(backend.live_jobs(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_workers_bound_jobs_in_flight() {
        let backend = Arc::new(SimulatedBackend::new(100));
        let engine = Arc::new(engine(
            backend.clone(),
            EngineConfig {
                workers: 2,
                ..config()
            },
        ));

        let mut tasks = Vec::new();
        for i in 0..6 {
            let engine = engine.clone();
            tasks.push(tokio::spawn(async move {
                match engine
                    .submit(
                        Submission::new(format!("p{}", i), problem_with_fixed_shipments()),
                        vec![],
                    )
                    .await
                    .unwrap()
                {
                    SubmitOutcome::Accepted(handle) => {
                        handle.await_outcome(Duration::from_secs(600)).await
                    }
                    SubmitOutcome::QuotaExceeded(_) => panic!("unexpected quota rejection"),
                }
            }));
        }
        for task in tasks {
            assert!(task.await.unwrap().is_processed());
        }
        assert_eq!(backend.max_concurrent_jobs(), 2);
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_is_rejected() {
        let engine = engine(Arc::new(SimulatedBackend::new(2)), config());
        engine.shutdown();
        let err = engine
            .submit(Submission::new("p1", problem_with_fixed_shipments()), vec![])
            .await
            .unwrap_err();
        assert!(matches!(err.source, SubmitFailure::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_driver_still_completes_the_job() {
        let engine = SubmissionEngine::new(
            Arc::new(BrokenStatusBackend::new(true)),
            b"model".to_vec(),
            config(),
        );
        let recorder = Arc::new(Recorder::default());

        let handle = accepted(
            engine
                .submit(
                    Submission::new("p1", problem_with_fixed_shipments()),
                    vec![recorder.clone() as Arc<dyn JobListener>],
                )
                .await
                .unwrap(),
        );

        assert!(matches!(
            handle.await_outcome(Duration::from_secs(120)).await,
            JobOutcome::Failed(_)
        ));
        tokio::time::sleep(Duration::from_millis(10)).await;

        let events = recorder.0.lock().clone();
        assert_eq!(events.last(), Some(&JobEvent::Completed));
        assert_eq!(
            events.iter().filter(|e| **e == JobEvent::Completed).count(),
            1
        );
        assert_eq!(engine.outstanding_jobs(), 0);
        assert_eq!(engine.available_workers(), config().workers);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrepresentable_job_timeout_means_no_deadline() {
        let backend = Arc::new(SimulatedBackend::new(2).with_run_time(Duration::from_secs(30)));
        let engine = engine(
            backend.clone(),
            EngineConfig {
                job_timeout: Duration::from_secs(u64::MAX),
                ..config()
            },
        );

        let handle = accepted(
            engine
                .submit(Submission::new("p1", problem_with_fixed_shipments()), vec![])
                .await
                .unwrap(),
        );

        assert!(handle
            .await_outcome(Duration::from_secs(120))
            .await
            .is_processed());
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(engine.outstanding_jobs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_status_checks_stop_retrying_at_the_deadline() {
        let backend = Arc::new(BrokenStatusBackend::new(false));
        let engine = SubmissionEngine::new(
            backend.clone(),
            b"model".to_vec(),
            EngineConfig {
                job_timeout: Duration::from_secs(5),
                retries: 100,
                retry_delay: Duration::from_secs(10),
                delete_on_completion: false,
                ..config()
            },
        );
        let recorder = Arc::new(Recorder::default());

        let started = Instant::now();
        let handle = accepted(
            engine
                .submit(
                    Submission::new("p1", problem_with_fixed_shipments()),
                    vec![recorder.clone() as Arc<dyn JobListener>],
                )
                .await
                .unwrap(),
        );

        assert!(matches!(
            handle.await_outcome(Duration::from_secs(3600)).await,
            JobOutcome::TimedOut
        ));
        assert!(started.elapsed() <= Duration::from_secs(6));
        assert_eq!(backend.polls.load(Ordering::SeqCst), 2);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let events = recorder.0.lock().clone();
        assert_eq!(&events[events.len() - 2..], &[JobEvent::Interrupted, JobEvent::Completed]);
    }

    #[test]
    fn test_zero_poll_interval_is_raised_to_the_floor() {
        let engine = engine(
            Arc::new(SimulatedBackend::new(1)),
            EngineConfig {
                poll_interval: Duration::ZERO,
                ..config()
            },
        );
        assert_eq!(engine.config().poll_interval, MIN_POLL_INTERVAL);
    }

}
