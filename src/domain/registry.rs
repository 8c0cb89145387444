use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::models::{Location, Problem, TruckType};

/// Identity namespaces. Keys are unique within a namespace only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Location,
    TruckType,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Location => f.write_str("location"),
            EntityKind::TruckType => f.write_str("truck type"),
        }
    }
}

/// An entity resolved from the registry, sharing the problem's instance.
#[derive(Debug, Clone)]
pub enum Entity {
    Location(Location),
    TruckType(Arc<TruckType>),
}

impl Entity {
    pub fn key(&self) -> &str {
        match self {
            Entity::Location(location) => location.name(),
            Entity::TruckType(truck_type) => &truck_type.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("duplicate {kind} identity key `{key}`")]
    DuplicateIdentity { kind: EntityKind, key: String },
}

/// Read-only lookup from identity key to entity, built from exactly one problem.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    locations: HashMap<String, Location>,
    truck_types: HashMap<String, Arc<TruckType>>,
}

impl EntityRegistry {
    pub fn build(problem: &Problem) -> Result<Self, RegistryError> {
        let mut registry = EntityRegistry {
            locations: HashMap::with_capacity(problem.hubs.len() + problem.spokes.len()),
            truck_types: HashMap::with_capacity(problem.truck_types.len()),
        };

        let locations = problem
            .hubs
            .iter()
            .map(|h| Location::Hub(h.clone()))
            .chain(problem.spokes.iter().map(|s| Location::Spoke(s.clone())));
        for location in locations {
            match registry.locations.entry(location.name().to_string()) {
                Entry::Occupied(e) => {
                    return Err(RegistryError::DuplicateIdentity {
                        kind: EntityKind::Location,
                        key: e.key().clone(),
                    })
                }
                Entry::Vacant(e) => {
                    e.insert(location);
                }
            }
        }

        for truck_type in &problem.truck_types {
            match registry.truck_types.entry(truck_type.name.clone()) {
                Entry::Occupied(e) => {
                    return Err(RegistryError::DuplicateIdentity {
                        kind: EntityKind::TruckType,
                        key: e.key().clone(),
                    })
                }
                Entry::Vacant(e) => {
                    e.insert(truck_type.clone());
                }
            }
        }

        Ok(registry)
    }

    pub fn resolve(&self, kind: EntityKind, key: &str) -> Option<Entity> {
        match kind {
            EntityKind::Location => self.location(key).cloned().map(Entity::Location),
            EntityKind::TruckType => self.truck_type(key).cloned().map(Entity::TruckType),
        }
    }

    pub fn location(&self, key: &str) -> Option<&Location> {
        self.locations.get(key)
    }

    pub fn truck_type(&self, key: &str) -> Option<&Arc<TruckType>> {
        self.truck_types.get(key)
    }

    pub fn len(&self) -> usize {
        self.locations.len() + self.truck_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
