use crate::models::{AggregatedReport, NbTrucksOnRoute, Problem, Solution, VolumeThroughHub};
use serde::{Deserialize, Serialize};

// ---------- Job input document: entities embedded by value ----------

pub fn to_input_document(problem: &Problem) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(problem)
}

/// Parse a job input document.
///
/// Relations in the document carry entity copies, so the returned problem
/// does not share instances between its collections and its relations.
pub fn from_input_document(bytes: &[u8]) -> serde_json::Result<Problem> {
    serde_json::from_slice(bytes)
}

// ---------- Job output document: entities referenced by identity key ----------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResult {
    pub total_cost: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNbTrucksOnRoute {
    pub spoke: String,
    pub hub: String,
    pub truck_type: String,
    pub nb_truck: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireVolumeThroughHub {
    pub origin: String,
    pub hub: String,
    pub destination: String,
    pub truck_type: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireAggregatedReport {
    pub spoke: String,
    pub hub: String,
    pub truck_type: String,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireSolution {
    #[serde(rename = "Result")]
    pub result: WireResult,
    #[serde(rename = "NbTrucksOnRouteRes", default)]
    pub nb_trucks_on_route: Vec<WireNbTrucksOnRoute>,
    #[serde(rename = "InVolumeThroughHubOnTruckRes", default)]
    pub in_volume_through_hub: Vec<WireVolumeThroughHub>,
    #[serde(rename = "OutVolumeThroughHubOnTruckRes", default)]
    pub out_volume_through_hub: Vec<WireVolumeThroughHub>,
    #[serde(rename = "InBoundAggregated", default)]
    pub inbound_aggregated: Vec<WireAggregatedReport>,
    #[serde(rename = "OutBoundAggregated", default)]
    pub outbound_aggregated: Vec<WireAggregatedReport>,
}

impl WireSolution {
    pub fn to_document(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

impl From<&NbTrucksOnRoute> for WireNbTrucksOnRoute {
    fn from(r: &NbTrucksOnRoute) -> Self {
        WireNbTrucksOnRoute {
            spoke: r.spoke.name.clone(),
            hub: r.hub.name.clone(),
            truck_type: r.truck_type.name.clone(),
            nb_truck: r.nb_trucks,
        }
    }
}

impl From<&VolumeThroughHub> for WireVolumeThroughHub {
    fn from(r: &VolumeThroughHub) -> Self {
        WireVolumeThroughHub {
            origin: r.origin.name.clone(),
            hub: r.hub.name.clone(),
            destination: r.destination.name.clone(),
            truck_type: r.truck_type.name.clone(),
            quantity: r.quantity,
        }
    }
}

impl From<&AggregatedReport> for WireAggregatedReport {
    fn from(r: &AggregatedReport) -> Self {
        WireAggregatedReport {
            spoke: r.spoke.name.clone(),
            hub: r.hub.name.clone(),
            truck_type: r.truck_type.name.clone(),
            quantity: r.quantity,
        }
    }
}

impl From<&Solution> for WireSolution {
    fn from(s: &Solution) -> Self {
        WireSolution {
            result: WireResult {
                total_cost: s.total_cost,
            },
            nb_trucks_on_route: s.nb_trucks_on_route.iter().map(Into::into).collect(),
            in_volume_through_hub: s.in_volume_through_hub.iter().map(Into::into).collect(),
            out_volume_through_hub: s.out_volume_through_hub.iter().map(Into::into).collect(),
            inbound_aggregated: s.inbound_aggregated.iter().map(Into::into).collect(),
            outbound_aggregated: s.outbound_aggregated.iter().map(Into::into).collect(),
        }
    }
}
