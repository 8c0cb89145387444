use std::env;
use std::sync::Arc;

use dotenv::dotenv;
use log::{error, info, warn};

use oaas_trucking::config::{AppConfig, RunMode};
use oaas_trucking::domain::client_factory::create_job_client;
use oaas_trucking::factory::{problem_with_fixed_shipments, problem_with_random_shipments};
use oaas_trucking::{
    optimize, BatchCoordinator, JobOutcome, SolveError, SubmissionEngine, Submission,
};

fn log_outcome(problem_id: &str, outcome: &JobOutcome) {
    match outcome {
        JobOutcome::Processed(solution) => {
            info!("{} TOTAL COST = {}", problem_id, solution.total_cost);
            info!("{}\n{}", problem_id, solution);
        }
        JobOutcome::Failed(message) => error!("{} failed: {}", problem_id, message),
        JobOutcome::Rejected(reason) => warn!("{} was rejected: {}", problem_id, reason),
        JobOutcome::TimedOut => warn!("{} did not finish in time", problem_id),
    }
}

async fn run_single(engine: &SubmissionEngine) -> Result<(), Box<dyn std::error::Error>> {
    let submission = Submission::new("Problem #0", problem_with_fixed_shipments());
    match optimize(engine, submission).await {
        Ok(outcome) => log_outcome("Problem #0", &outcome),
        Err(SolveError::QuotaExceeded(submission)) => {
            warn!("Job limit reached, {} was not solved", submission.problem_id)
        }
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

async fn run_batch(
    engine: Arc<SubmissionEngine>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut submissions = Vec::with_capacity(config.nb_jobs);
    for i in 0..config.nb_jobs {
        let mean = 300.0 + 50.0 * i as f64;
        let std_dev = 100.0 + 20.0 * i as f64;
        let problem = problem_with_random_shipments(config.shipment_seed + i as u64, mean, std_dev)?;
        submissions.push(Submission::new(format!("Problem #{}", i), problem));
    }

    let report = BatchCoordinator::new(engine)
        .with_max_rounds(config.max_rounds)
        .run(submissions)
        .await;

    for round in &report.rounds {
        info!(
            "Round {}: {} submitted, {} accepted, {} over the job limit, {} failed",
            round.round, round.submitted, round.accepted, round.quota_rejected, round.failed
        );
    }
    for handle in &report.accepted {
        match handle.outcome() {
            Some(outcome) => log_outcome(handle.problem_id(), &outcome),
            None => warn!("{} has no outcome yet", handle.problem_id()),
        }
    }
    for submission in &report.unsolved {
        error!("{} remains unsolved", submission.problem_id);
    }
    for failure in &report.failed {
        error!("{}", failure);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    env_logger::init();

    let _sentry = env::var("SENTRY_DSN").ok().map(|dsn| {
        sentry::init((
            dsn,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    let config = AppConfig::from_env()?;
    let client = create_job_client(&config)?;
    let model = config.load_model()?;
    let engine = Arc::new(SubmissionEngine::new(client, model, config.engine.clone()));

    match config.run_mode {
        RunMode::Single => run_single(&engine).await,
        RunMode::Batch => run_batch(engine, &config).await,
    }
}
