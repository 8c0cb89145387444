use std::sync::Arc;

use thiserror::Error;

use crate::models::{Hub, Problem, Spoke, TruckType};

#[derive(Debug, Clone, Error)]
#[error("{details}")]
pub struct ProblemInputError {
    pub details: String,
}

/// Every relation must hold entity instances owned by the problem itself,
/// otherwise decoded results could not share references with it.
pub fn validate_problem(problem: &Problem) -> Result<(), ProblemInputError> {
    for route in &problem.routes {
        check_spoke(problem, &route.spoke, "Route")?;
        check_hub(problem, &route.hub, "Route")?;
    }

    for load_time in &problem.load_times {
        check_hub(problem, &load_time.hub, "LoadTime")?;
        check_truck_type(problem, &load_time.truck_type, "LoadTime")?;
    }

    for shipment in &problem.shipments {
        check_spoke(problem, &shipment.origin, "Shipment")?;
        check_spoke(problem, &shipment.destination, "Shipment")?;
    }

    Ok(())
}

fn check_spoke(problem: &Problem, spoke: &Arc<Spoke>, relation: &str) -> Result<(), ProblemInputError> {
    if problem.spokes.iter().any(|s| Arc::ptr_eq(s, spoke)) {
        return Ok(());
    }
    Err(missing(relation, "spoke", &spoke.name))
}

fn check_hub(problem: &Problem, hub: &Arc<Hub>, relation: &str) -> Result<(), ProblemInputError> {
    if problem.hubs.iter().any(|h| Arc::ptr_eq(h, hub)) {
        return Ok(());
    }
    Err(missing(relation, "hub", &hub.name))
}

fn check_truck_type(
    problem: &Problem,
    truck_type: &Arc<TruckType>,
    relation: &str,
) -> Result<(), ProblemInputError> {
    if problem.truck_types.iter().any(|t| Arc::ptr_eq(t, truck_type)) {
        return Ok(());
    }
    Err(missing(relation, "truck type", &truck_type.name))
}

fn missing(relation: &str, kind: &str, name: &str) -> ProblemInputError {
    ProblemInputError {
        details: format!(
            "{} references {} {} that is not part of the problem",
            relation, kind, name,
        ),
    }
}
