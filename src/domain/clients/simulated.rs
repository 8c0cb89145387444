use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::convert::{
    from_input_document, WireAggregatedReport, WireNbTrucksOnRoute, WireResult, WireSolution,
    WireVolumeThroughHub,
};
use crate::domain::engine::DATA_ATTACHMENT;
use crate::domain::job_client::{
    ClientError, JobClient, JobPayload, JobRef, OutputSpec, RemoteState, RemoteStatus,
};
use crate::models::Problem;

/// What a simulated job ends with.
#[derive(Debug, Clone)]
pub enum SimulatedRun {
    /// Bytes of the output attachment.
    Processed(Vec<u8>),
    Failed(String),
}

pub type SimulatedSolver = Arc<dyn Fn(&JobPayload) -> SimulatedRun + Send + Sync>;

struct SimulatedJob {
    parameters: BTreeMap<String, String>,
    submitted_at: Instant,
    run: SimulatedRun,
}

#[derive(Default)]
struct State {
    jobs: HashMap<String, SimulatedJob>,
    next_id: u64,
    failures_left: u32,
    submit_attempts: usize,
    max_concurrent: usize,
}

/// In-process job service with a concurrent-job quota.
///
/// Jobs wait `queue_delay`, run for `run_time`, then report the result of the
/// solver function. Time follows the tokio clock.
pub struct SimulatedBackend {
    quota: usize,
    queue_delay: Duration,
    run_time: Duration,
    solver: SimulatedSolver,
    state: Mutex<State>,
}

impl SimulatedBackend {
    pub fn new(quota: usize) -> Self {
        SimulatedBackend {
            quota,
            queue_delay: Duration::from_millis(500),
            run_time: Duration::from_secs(3),
            solver: Arc::new(greedy_solver),
            state: Mutex::new(State::default()),
        }
    }

    pub fn with_queue_delay(mut self, queue_delay: Duration) -> Self {
        self.queue_delay = queue_delay;
        self
    }

    pub fn with_run_time(mut self, run_time: Duration) -> Self {
        self.run_time = run_time;
        self
    }

    pub fn with_solver(mut self, solver: SimulatedSolver) -> Self {
        self.solver = solver;
        self
    }

    /// Fail the next `count` submissions with a transport error.
    pub fn with_transient_submit_failures(self, count: u32) -> Self {
        self.state.lock().failures_left = count;
        self
    }

    pub fn submit_attempts(&self) -> usize {
        self.state.lock().submit_attempts
    }

    /// Jobs created and not yet deleted.
    pub fn live_jobs(&self) -> usize {
        self.state.lock().jobs.len()
    }

    /// Highest number of unfinished jobs seen at once.
    pub fn max_concurrent_jobs(&self) -> usize {
        self.state.lock().max_concurrent
    }

    fn state_of(&self, job: &SimulatedJob, now: Instant) -> RemoteState {
        let elapsed = now.saturating_duration_since(job.submitted_at);
        if elapsed < self.queue_delay {
            RemoteState::NotStarted
        } else if elapsed < self.queue_delay + self.run_time {
            RemoteState::Running
        } else {
            match job.run {
                SimulatedRun::Processed(_) => RemoteState::Processed,
                SimulatedRun::Failed(_) => RemoteState::Failed,
            }
        }
    }

    fn unfinished(&self, state: &State, now: Instant) -> usize {
        state
            .jobs
            .values()
            .filter(|job| !self.state_of(job, now).is_terminal())
            .count()
    }
}

#[async_trait]
impl JobClient for SimulatedBackend {
    async fn submit(
        &self,
        payload: &JobPayload,
        _output: &OutputSpec,
        _timeout: Duration,
    ) -> Result<JobRef, ClientError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.submit_attempts += 1;

        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(ClientError::Transport("connection reset by peer".to_string()));
        }

        let unfinished = self.unfinished(&state, now);
        if unfinished >= self.quota {
            return Err(ClientError::QuotaExceeded(format!(
                "{} of {} jobs already running",
                unfinished, self.quota
            )));
        }

        state.next_id += 1;
        let job_id = format!("sim-{}", state.next_id);
        let run = (self.solver)(payload);
        state.jobs.insert(
            job_id.clone(),
            SimulatedJob {
                parameters: payload.parameters.clone(),
                submitted_at: now,
                run,
            },
        );
        state.max_concurrent = state.max_concurrent.max(unfinished + 1);
        debug!("Simulated job {} created", job_id);

        Ok(JobRef { job_id })
    }

    async fn poll(&self, job: &JobRef) -> Result<RemoteStatus, ClientError> {
        let state = self.state.lock();
        let found = state
            .jobs
            .get(&job.job_id)
            .ok_or_else(|| ClientError::Remote(format!("no job {}", job.job_id)))?;

        let remote = self.state_of(found, Instant::now());
        let failure_message = match (&found.run, remote) {
            (SimulatedRun::Failed(message), RemoteState::Failed) => Some(message.clone()),
            _ => None,
        };
        Ok(RemoteStatus {
            state: remote,
            failure_message,
            parameters: found.parameters.clone(),
        })
    }

    async fn fetch_output(&self, job: &JobRef, output: &OutputSpec) -> Result<Vec<u8>, ClientError> {
        let state = self.state.lock();
        let found = state
            .jobs
            .get(&job.job_id)
            .ok_or_else(|| ClientError::Remote(format!("no job {}", job.job_id)))?;

        match (&found.run, self.state_of(found, Instant::now())) {
            (SimulatedRun::Processed(bytes), RemoteState::Processed) => Ok(bytes.clone()),
            _ => Err(ClientError::MissingOutput(format!(
                "{} of job {}",
                output.attachment, job.job_id
            ))),
        }
    }

    async fn release(&self, job: &JobRef) -> Result<(), ClientError> {
        self.state.lock().jobs.remove(&job.job_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "Simulated"
    }
}

/// Routes every shipment through the hub with the shortest combined distance,
/// on the largest truck type.
pub fn greedy_solver(payload: &JobPayload) -> SimulatedRun {
    let document = match payload.attachment(DATA_ATTACHMENT) {
        Some(attachment) => attachment.data.clone(),
        None => return SimulatedRun::Failed(format!("missing attachment {}", DATA_ATTACHMENT)),
    };
    match from_input_document(&document) {
        Ok(problem) => match route_shipments(&problem) {
            Ok(wire) => match wire.to_document() {
                Ok(bytes) => SimulatedRun::Processed(bytes),
                Err(e) => SimulatedRun::Failed(e.to_string()),
            },
            Err(message) => SimulatedRun::Failed(message),
        },
        Err(e) => SimulatedRun::Failed(format!("unreadable {}: {}", DATA_ATTACHMENT, e)),
    }
}

fn route_shipments(problem: &Problem) -> Result<WireSolution, String> {
    let truck = problem
        .truck_types
        .iter()
        .max_by_key(|t| t.capacity)
        .ok_or_else(|| "no truck types".to_string())?;

    let distance: HashMap<(&str, &str), i32> = problem
        .routes
        .iter()
        .map(|r| ((r.spoke.name.as_str(), r.hub.name.as_str()), r.distance))
        .collect();

    let mut wire = WireSolution {
        result: WireResult { total_cost: 0 },
        nb_trucks_on_route: Vec::new(),
        in_volume_through_hub: Vec::new(),
        out_volume_through_hub: Vec::new(),
        inbound_aggregated: Vec::new(),
        outbound_aggregated: Vec::new(),
    };
    // (spoke, hub) -> volume
    let mut inbound: BTreeMap<(&str, &str), i32> = BTreeMap::new();
    let mut outbound: BTreeMap<(&str, &str), i32> = BTreeMap::new();

    for shipment in &problem.shipments {
        let origin = shipment.origin.name.as_str();
        let destination = shipment.destination.name.as_str();
        let hub = problem
            .hubs
            .iter()
            .filter_map(|h| {
                let there = distance.get(&(origin, h.name.as_str()))?;
                let back = distance.get(&(destination, h.name.as_str()))?;
                Some((there + back, h.name.as_str()))
            })
            .min()
            .map(|(_, hub)| hub)
            .ok_or_else(|| format!("no hub connects {} and {}", origin, destination))?;

        let record = WireVolumeThroughHub {
            origin: origin.to_string(),
            hub: hub.to_string(),
            destination: destination.to_string(),
            truck_type: truck.name.clone(),
            quantity: shipment.total_volume,
        };
        wire.in_volume_through_hub.push(record.clone());
        wire.out_volume_through_hub.push(record);
        *inbound.entry((origin, hub)).or_insert(0) += shipment.total_volume;
        *outbound.entry((destination, hub)).or_insert(0) += shipment.total_volume;
    }

    let aggregate = |volumes: &BTreeMap<(&str, &str), i32>| -> Vec<WireAggregatedReport> {
        volumes
            .iter()
            .map(|((spoke, hub), quantity)| WireAggregatedReport {
                spoke: spoke.to_string(),
                hub: hub.to_string(),
                truck_type: truck.name.clone(),
                quantity: *quantity,
            })
            .collect()
    };
    wire.inbound_aggregated = aggregate(&inbound);
    wire.outbound_aggregated = aggregate(&outbound);

    let capacity = truck.capacity.max(1);
    for (&(spoke, hub), &distance_to_hub) in &distance {
        let volume = inbound
            .get(&(spoke, hub))
            .copied()
            .unwrap_or(0)
            .max(outbound.get(&(spoke, hub)).copied().unwrap_or(0));
        if volume == 0 {
            continue;
        }
        let nb_truck = (volume + capacity - 1) / capacity;
        wire.result.total_cost += nb_truck * distance_to_hub * truck.cost_per_mile * 2;
        wire.nb_trucks_on_route.push(WireNbTrucksOnRoute {
            spoke: spoke.to_string(),
            hub: hub.to_string(),
            truck_type: truck.name.clone(),
            nb_truck,
        });
    }
    wire.nb_trucks_on_route
        .sort_by(|a, b| (&a.spoke, &a.hub).cmp(&(&b.spoke, &b.hub)));

    Ok(wire)
}
