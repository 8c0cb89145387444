use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ---------- Input entities: shared by Arc, compared by identity ----------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hub {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spoke {
    pub name: String,
    /// Earliest departure time from the spoke
    pub min_dep_time: i32,
    /// Latest arrival time at the spoke
    pub max_arr_time: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TruckType {
    #[serde(rename = "truckType")]
    pub name: String,
    pub capacity: i32,
    pub cost_per_mile: i32,
    /// Truck speed
    pub miles_per_hour: i32,
}

/// A hub or a spoke. Both share one identity namespace keyed by name.
#[derive(Debug, Clone)]
pub enum Location {
    Hub(Arc<Hub>),
    Spoke(Arc<Spoke>),
}

impl Location {
    pub fn name(&self) -> &str {
        match self {
            Location::Hub(hub) => &hub.name,
            Location::Spoke(spoke) => &spoke.name,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Location::Hub(_) => "hub",
            Location::Spoke(_) => "spoke",
        }
    }

    pub fn as_hub(&self) -> Option<&Arc<Hub>> {
        match self {
            Location::Hub(hub) => Some(hub),
            Location::Spoke(_) => None,
        }
    }

    pub fn as_spoke(&self) -> Option<&Arc<Spoke>> {
        match self {
            Location::Spoke(spoke) => Some(spoke),
            Location::Hub(_) => None,
        }
    }

    /// Identity comparison: true only for the very same entity instance.
    pub fn is_same(&self, other: &Location) -> bool {
        match (self, other) {
            (Location::Hub(a), Location::Hub(b)) => Arc::ptr_eq(a, b),
            (Location::Spoke(a), Location::Spoke(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

// ---------- Input relations: hold the entity instances themselves ----------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Route {
    pub spoke: Arc<Spoke>,
    pub hub: Arc<Hub>,
    pub distance: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadTime {
    pub hub: Arc<Hub>,
    pub truck_type: Arc<TruckType>,
    pub load_time: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub origin: Arc<Spoke>,
    pub destination: Arc<Spoke>,
    pub total_volume: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    /// Maximum number of trucks of each type on a route
    pub max_trucks: i32,
    /// Maximum volume handled on each path for each truck type
    pub max_volume: i32,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            max_trucks: 100,
            max_volume: 5000,
        }
    }
}

/// One complete input dataset for a single optimization run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Problem {
    #[serde(rename = "Parameters", default)]
    pub parameters: Parameters,
    #[serde(rename = "Hubs", default)]
    pub hubs: Vec<Arc<Hub>>,
    #[serde(rename = "Spokes", default)]
    pub spokes: Vec<Arc<Spoke>>,
    #[serde(rename = "TruckTypes", default)]
    pub truck_types: Vec<Arc<TruckType>>,
    #[serde(rename = "LoadTimes", default)]
    pub load_times: Vec<LoadTime>,
    #[serde(rename = "Routes", default)]
    pub routes: Vec<Route>,
    #[serde(rename = "Shipments", default)]
    pub shipments: Vec<Shipment>,
}

impl Problem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_hub(&mut self, name: impl Into<String>) -> Arc<Hub> {
        let hub = Arc::new(Hub { name: name.into() });
        self.hubs.push(hub.clone());
        hub
    }

    pub fn add_spoke(
        &mut self,
        name: impl Into<String>,
        min_dep_time: i32,
        max_arr_time: i32,
    ) -> Arc<Spoke> {
        let spoke = Arc::new(Spoke {
            name: name.into(),
            min_dep_time,
            max_arr_time,
        });
        self.spokes.push(spoke.clone());
        spoke
    }

    pub fn add_truck_type(
        &mut self,
        name: impl Into<String>,
        capacity: i32,
        cost_per_mile: i32,
        miles_per_hour: i32,
    ) -> Arc<TruckType> {
        let truck_type = Arc::new(TruckType {
            name: name.into(),
            capacity,
            cost_per_mile,
            miles_per_hour,
        });
        self.truck_types.push(truck_type.clone());
        truck_type
    }

    pub fn add_route(&mut self, spoke: &Arc<Spoke>, hub: &Arc<Hub>, distance: i32) {
        self.routes.push(Route {
            spoke: spoke.clone(),
            hub: hub.clone(),
            distance,
        });
    }

    pub fn add_load_time(&mut self, hub: &Arc<Hub>, truck_type: &Arc<TruckType>, load_time: i32) {
        self.load_times.push(LoadTime {
            hub: hub.clone(),
            truck_type: truck_type.clone(),
            load_time,
        });
    }

    pub fn add_shipment(&mut self, origin: &Arc<Spoke>, destination: &Arc<Spoke>, total_volume: i32) {
        self.shipments.push(Shipment {
            origin: origin.clone(),
            destination: destination.clone(),
            total_volume,
        });
    }

    pub fn spoke(&self, name: &str) -> Option<&Arc<Spoke>> {
        self.spokes.iter().find(|s| s.name == name)
    }

    pub fn hub(&self, name: &str) -> Option<&Arc<Hub>> {
        self.hubs.iter().find(|h| h.name == name)
    }

    pub fn truck_type(&self, name: &str) -> Option<&Arc<TruckType>> {
        self.truck_types.iter().find(|t| t.name == name)
    }
}

// ---------- Result records: references into the problem's entities ----------

/// Number of trucks of one type assigned to a (spoke, hub) route.
#[derive(Debug, Clone)]
pub struct NbTrucksOnRoute {
    pub spoke: Arc<Spoke>,
    pub hub: Arc<Hub>,
    pub truck_type: Arc<TruckType>,
    pub nb_trucks: i32,
}

impl NbTrucksOnRoute {
    pub fn transport_capacity(&self) -> i32 {
        self.nb_trucks * self.truck_type.capacity
    }
}

/// Quantity moved through a hub on one truck type, by shipment origin and destination.
#[derive(Debug, Clone)]
pub struct VolumeThroughHub {
    pub origin: Arc<Spoke>,
    pub hub: Arc<Hub>,
    pub destination: Arc<Spoke>,
    pub truck_type: Arc<TruckType>,
    pub quantity: i32,
}

/// Quantity moved between a spoke and a hub on one truck type.
#[derive(Debug, Clone)]
pub struct AggregatedReport {
    pub spoke: Arc<Spoke>,
    pub hub: Arc<Hub>,
    pub truck_type: Arc<TruckType>,
    pub quantity: i32,
}

/// Borrowed view over any record of a [`Solution`].
#[derive(Debug, Clone, Copy)]
pub enum ResultRecord<'a> {
    NbTrucksOnRoute(&'a NbTrucksOnRoute),
    InVolumeThroughHub(&'a VolumeThroughHub),
    OutVolumeThroughHub(&'a VolumeThroughHub),
    InBoundAggregated(&'a AggregatedReport),
    OutBoundAggregated(&'a AggregatedReport),
}

impl<'a> ResultRecord<'a> {
    pub fn hub(&self) -> &'a Arc<Hub> {
        match *self {
            ResultRecord::NbTrucksOnRoute(r) => &r.hub,
            ResultRecord::InVolumeThroughHub(r) | ResultRecord::OutVolumeThroughHub(r) => &r.hub,
            ResultRecord::InBoundAggregated(r) | ResultRecord::OutBoundAggregated(r) => &r.hub,
        }
    }

    pub fn truck_type(&self) -> &'a Arc<TruckType> {
        match *self {
            ResultRecord::NbTrucksOnRoute(r) => &r.truck_type,
            ResultRecord::InVolumeThroughHub(r) | ResultRecord::OutVolumeThroughHub(r) => {
                &r.truck_type
            }
            ResultRecord::InBoundAggregated(r) | ResultRecord::OutBoundAggregated(r) => {
                &r.truck_type
            }
        }
    }

    /// Every spoke the record refers to.
    pub fn spokes(&self) -> Vec<&'a Arc<Spoke>> {
        match *self {
            ResultRecord::NbTrucksOnRoute(r) => vec![&r.spoke],
            ResultRecord::InVolumeThroughHub(r) | ResultRecord::OutVolumeThroughHub(r) => {
                vec![&r.origin, &r.destination]
            }
            ResultRecord::InBoundAggregated(r) | ResultRecord::OutBoundAggregated(r) => {
                vec![&r.spoke]
            }
        }
    }
}

/// Decoded job output. Owns no entities, only references into its problem.
#[derive(Debug, Clone, Default)]
pub struct Solution {
    pub total_cost: i32,
    pub nb_trucks_on_route: Vec<NbTrucksOnRoute>,
    pub in_volume_through_hub: Vec<VolumeThroughHub>,
    pub out_volume_through_hub: Vec<VolumeThroughHub>,
    pub inbound_aggregated: Vec<AggregatedReport>,
    pub outbound_aggregated: Vec<AggregatedReport>,
}

impl Solution {
    /// All records, in document order.
    pub fn records(&self) -> impl Iterator<Item = ResultRecord<'_>> {
        self.nb_trucks_on_route
            .iter()
            .map(ResultRecord::NbTrucksOnRoute)
            .chain(
                self.in_volume_through_hub
                    .iter()
                    .map(ResultRecord::InVolumeThroughHub),
            )
            .chain(
                self.out_volume_through_hub
                    .iter()
                    .map(ResultRecord::OutVolumeThroughHub),
            )
            .chain(
                self.inbound_aggregated
                    .iter()
                    .map(ResultRecord::InBoundAggregated),
            )
            .chain(
                self.outbound_aggregated
                    .iter()
                    .map(ResultRecord::OutBoundAggregated),
            )
    }
}

const SEPARATOR: &str = "------------------------------------------------";

impl fmt::Display for Solution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Total cost = {}", self.total_cost)?;
        writeln!(f, "{}", SEPARATOR)?;
        for r in &self.in_volume_through_hub {
            writeln!(
                f,
                "Using: {} \t--> from: {} to Hub: {} (shipment destination: {}) --> shipped quantity = {}",
                r.truck_type.name, r.origin.name, r.hub.name, r.destination.name, r.quantity
            )?;
        }
        writeln!(f, "{}", SEPARATOR)?;
        for r in &self.out_volume_through_hub {
            writeln!(
                f,
                "Using: {} \t--> from Hub: {} to: {} (shipment source: {}) --> shipped quantity = {}",
                r.truck_type.name, r.hub.name, r.destination.name, r.origin.name, r.quantity
            )?;
        }
        writeln!(f, "{}", SEPARATOR)?;
        for r in &self.nb_trucks_on_route {
            writeln!(
                f,
                "{} truck(s) of type: {}\t are assigned to route: Spoke {} <--> Hub {} (transport capacity = {} units)",
                r.nb_trucks,
                r.truck_type.name,
                r.spoke.name,
                r.hub.name,
                r.transport_capacity()
            )?;
        }
        writeln!(f, "{}", SEPARATOR)?;
        for r in &self.inbound_aggregated {
            writeln!(
                f,
                "Aggregated quantity transported from Spoke: {} to Hub: {} using truck type: {} \t= {}",
                r.spoke.name, r.hub.name, r.truck_type.name, r.quantity
            )?;
        }
        writeln!(f, "{}", SEPARATOR)?;
        for r in &self.outbound_aggregated {
            writeln!(
                f,
                "Aggregated quantity transported from Hub: {} to Spoke: {} using truck type: {} \t= {}",
                r.hub.name, r.spoke.name, r.truck_type.name, r.quantity
            )?;
        }
        write!(f, "{}", SEPARATOR)
    }
}
