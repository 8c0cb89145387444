use std::sync::Arc;

use thiserror::Error;

use crate::convert::{
    WireAggregatedReport, WireNbTrucksOnRoute, WireSolution, WireVolumeThroughHub,
};
use crate::domain::registry::{EntityKind, EntityRegistry, RegistryError};
use crate::models::{
    AggregatedReport, Hub, NbTrucksOnRoute, Problem, Solution, Spoke, TruckType, VolumeThroughHub,
};

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("malformed result document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{collection} references unknown {kind} `{key}`")]
    DanglingReference {
        collection: &'static str,
        kind: EntityKind,
        key: String,
    },

    #[error("{collection} expects a {expected} but `{key}` is a {found}")]
    WrongLocationKind {
        collection: &'static str,
        key: String,
        expected: &'static str,
        found: &'static str,
    },
}

/// Turns result documents into solutions whose entity fields are the
/// registry's own instances. Holds the registry read-only.
#[derive(Debug, Clone, Copy)]
pub struct ResultDecoder<'r> {
    registry: &'r EntityRegistry,
}

impl<'r> ResultDecoder<'r> {
    pub fn new(registry: &'r EntityRegistry) -> Self {
        ResultDecoder { registry }
    }

    pub fn decode(&self, payload: &[u8]) -> Result<Solution, DecodeError> {
        let wire: WireSolution = serde_json::from_slice(payload)?;
        self.decode_wire(&wire)
    }

    /// All-or-nothing: the first unresolved key fails the whole solution.
    pub fn decode_wire(&self, wire: &WireSolution) -> Result<Solution, DecodeError> {
        Ok(Solution {
            total_cost: wire.result.total_cost,
            nb_trucks_on_route: wire
                .nb_trucks_on_route
                .iter()
                .map(|r| self.nb_trucks_on_route(r))
                .collect::<Result<_, _>>()?,
            in_volume_through_hub: wire
                .in_volume_through_hub
                .iter()
                .map(|r| self.volume_through_hub("InVolumeThroughHubOnTruckRes", r))
                .collect::<Result<_, _>>()?,
            out_volume_through_hub: wire
                .out_volume_through_hub
                .iter()
                .map(|r| self.volume_through_hub("OutVolumeThroughHubOnTruckRes", r))
                .collect::<Result<_, _>>()?,
            inbound_aggregated: wire
                .inbound_aggregated
                .iter()
                .map(|r| self.aggregated("InBoundAggregated", r))
                .collect::<Result<_, _>>()?,
            outbound_aggregated: wire
                .outbound_aggregated
                .iter()
                .map(|r| self.aggregated("OutBoundAggregated", r))
                .collect::<Result<_, _>>()?,
        })
    }

    fn nb_trucks_on_route(&self, r: &WireNbTrucksOnRoute) -> Result<NbTrucksOnRoute, DecodeError> {
        const COLLECTION: &str = "NbTrucksOnRouteRes";
        Ok(NbTrucksOnRoute {
            spoke: self.spoke(COLLECTION, &r.spoke)?,
            hub: self.hub(COLLECTION, &r.hub)?,
            truck_type: self.truck_type(COLLECTION, &r.truck_type)?,
            nb_trucks: r.nb_truck,
        })
    }

    fn volume_through_hub(
        &self,
        collection: &'static str,
        r: &WireVolumeThroughHub,
    ) -> Result<VolumeThroughHub, DecodeError> {
        Ok(VolumeThroughHub {
            origin: self.spoke(collection, &r.origin)?,
            hub: self.hub(collection, &r.hub)?,
            destination: self.spoke(collection, &r.destination)?,
            truck_type: self.truck_type(collection, &r.truck_type)?,
            quantity: r.quantity,
        })
    }

    fn aggregated(
        &self,
        collection: &'static str,
        r: &WireAggregatedReport,
    ) -> Result<AggregatedReport, DecodeError> {
        Ok(AggregatedReport {
            spoke: self.spoke(collection, &r.spoke)?,
            hub: self.hub(collection, &r.hub)?,
            truck_type: self.truck_type(collection, &r.truck_type)?,
            quantity: r.quantity,
        })
    }

    fn hub(&self, collection: &'static str, key: &str) -> Result<Arc<Hub>, DecodeError> {
        let location = self
            .registry
            .location(key)
            .ok_or_else(|| dangling(collection, EntityKind::Location, key))?;
        location.as_hub().cloned().ok_or_else(|| DecodeError::WrongLocationKind {
            collection,
            key: key.to_string(),
            expected: "hub",
            found: location.kind_name(),
        })
    }

    fn spoke(&self, collection: &'static str, key: &str) -> Result<Arc<Spoke>, DecodeError> {
        let location = self
            .registry
            .location(key)
            .ok_or_else(|| dangling(collection, EntityKind::Location, key))?;
        location.as_spoke().cloned().ok_or_else(|| DecodeError::WrongLocationKind {
            collection,
            key: key.to_string(),
            expected: "spoke",
            found: location.kind_name(),
        })
    }

    fn truck_type(
        &self,
        collection: &'static str,
        key: &str,
    ) -> Result<Arc<TruckType>, DecodeError> {
        self.registry
            .truck_type(key)
            .cloned()
            .ok_or_else(|| dangling(collection, EntityKind::TruckType, key))
    }
}

fn dangling(collection: &'static str, kind: EntityKind, key: &str) -> DecodeError {
    DecodeError::DanglingReference {
        collection,
        kind,
        key: key.to_string(),
    }
}

/// Decode a job's output against a registry built fresh from that job's own problem.
pub fn decode_for_problem(problem: &Problem, payload: &[u8]) -> Result<Solution, DecodeError> {
    let registry = EntityRegistry::build(problem)?;
    ResultDecoder::new(&registry).decode(payload)
}
