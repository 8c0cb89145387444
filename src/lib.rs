//! Submits trucking network problems to a remote optimization job service,
//! retries problems rejected by the service's job limit in rounds, and decodes
//! each result against the entities of the problem it was solved for.

pub mod config;
pub mod convert;
pub mod domain;
pub mod factory;
pub mod models;

pub use domain::batch::{BatchCoordinator, BatchReport, RoundSummary};
pub use domain::engine::{
    EngineConfig, SubmissionEngine, Submission, SubmitError, SubmitFailure, SubmitOutcome,
};
pub use domain::job::{JobEvent, JobException, JobHandle, JobListener, JobOutcome};
pub use domain::job_client::{ClientError, JobClient};
pub use domain::solve::{optimize, SolveError};
pub use models::{Problem, Solution};
