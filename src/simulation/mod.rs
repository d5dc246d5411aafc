//! Standalone food delivery simulation
//!
//! Vehicles based at restaurants pick up orders and drive them over an
//! undirected region graph to neighborhoods. Everything runs in discrete
//! ticks and can be driven from tests or the headless binary.

mod delivery_service;
mod error;
mod event;
mod generator;
mod occupied;
mod order;
mod path;
mod rating;
mod region;
mod stats;
mod types;
mod vehicle;
mod vehicle_manager;
mod world;

pub use delivery_service::DeliveryService;
pub use error::{Result, SimError};
pub use event::Event;
pub use generator::{
    FridayOrderGenerator, FridayOrderGeneratorBuilder, OrderGenerator, ScriptedOrderGenerator,
};
pub use occupied::{
    EdgeTraversal, Occupied, OccupiedEdge, OccupiedKind, OccupiedNode, VehicleStats,
};
pub use order::ConfirmedOrder;
pub use path::{path_duration_along, CachedPathCalculator, DijkstraPathCalculator, PathCalculator};
pub use rating::{
    AmountDeliveredRater, AmountDeliveredRaterFactory, AmountDeliveredRaterFactoryBuilder,
    InTimeRater, InTimeRaterFactory, InTimeRaterFactoryBuilder, Rater, RaterFactory,
    RatingCriteria, TravelDistanceRater, TravelDistanceRaterFactory,
    TravelDistanceRaterFactoryBuilder,
};
pub use region::{Edge, Node, NodeKind, Region, RegionBuilder, RegionId, RestaurantPreset};
pub use stats::SimulationStats;
pub use types::{
    ComponentRef, DistanceMetric, EdgeKey, Location, OrderId, Tick, TickInterval, VehicleId,
};
pub use vehicle::{ArrivalAction, QueuedMove, Vehicle};
pub use vehicle_manager::VehicleManager;
pub use world::{SimWorld, TestWorldConfig};
