//! Error type shared by the whole simulation core.

use thiserror::Error;

use super::types::{ComponentRef, Location, Tick, VehicleId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("invalid region: {0}")]
    InvalidRegion(String),
    #[error("edge location A {a} must be <= location B {b}")]
    InvalidEdge { a: Location, b: Location },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("no node at {0}")]
    NodeNotFound(Location),
    #[error("could not find occupied component {0:?}")]
    OccupiedNotFound(ComponentRef),
    #[error("vehicle {0:?} is not managed here")]
    VehicleNotFound(VehicleId),
    #[error("node {0} is not a restaurant")]
    NotARestaurant(Location),
    #[error("node {0} is not a neighborhood")]
    NotANeighborhood(Location),
    #[error("no path from {from} to {to}")]
    NoPath { from: Location, to: Location },

    #[error(
        "vehicle {vehicle:?} cannot take weight {weight} (carrying {current} of {capacity})"
    )]
    CapacityExceeded {
        vehicle: VehicleId,
        capacity: f64,
        current: f64,
        weight: f64,
    },
    #[error("vehicle {vehicle:?} is not at restaurant {restaurant}")]
    VehicleNotAtRestaurant {
        vehicle: VehicleId,
        restaurant: Location,
    },
    #[error("vehicle {0:?} has not spawned yet")]
    VehicleNotSpawned(VehicleId),

    #[error("tick {0} is negative")]
    NegativeTick(Tick),
}

pub type Result<T> = std::result::Result<T, SimError>;
