//! Events emitted while the simulation advances

use super::order::ConfirmedOrder;
use super::region::Edge;
use super::types::{Location, Tick, VehicleId};

/// Something that happened during a single tick
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A vehicle entered the simulation at its home restaurant
    Spawn {
        tick: Tick,
        vehicle: VehicleId,
        node: Location,
    },
    /// A vehicle reached a node after traversing `last_edge`
    ArrivedAtNode {
        tick: Tick,
        vehicle: VehicleId,
        node: Location,
        last_edge: Edge,
    },
    /// A vehicle left `last_node` and started traversing `edge`
    ArrivedAtEdge {
        tick: Tick,
        vehicle: VehicleId,
        edge: Edge,
        last_node: Location,
    },
    /// A new order entered the pending pool
    OrderReceived { tick: Tick, order: ConfirmedOrder },
    /// A restaurant handed an order to a vehicle
    LoadOrder {
        tick: Tick,
        vehicle: VehicleId,
        restaurant: Location,
        order: ConfirmedOrder,
    },
    /// A vehicle handed an order over at its destination
    DeliverOrder {
        tick: Tick,
        vehicle: VehicleId,
        node: Location,
        order: ConfirmedOrder,
    },
}

impl Event {
    pub fn tick(&self) -> Tick {
        match self {
            Event::Spawn { tick, .. }
            | Event::ArrivedAtNode { tick, .. }
            | Event::ArrivedAtEdge { tick, .. }
            | Event::OrderReceived { tick, .. }
            | Event::LoadOrder { tick, .. }
            | Event::DeliverOrder { tick, .. } => *tick,
        }
    }

    /// The vehicle involved, if any
    pub fn vehicle(&self) -> Option<VehicleId> {
        match self {
            Event::Spawn { vehicle, .. }
            | Event::ArrivedAtNode { vehicle, .. }
            | Event::ArrivedAtEdge { vehicle, .. }
            | Event::LoadOrder { vehicle, .. }
            | Event::DeliverOrder { vehicle, .. } => Some(*vehicle),
            Event::OrderReceived { .. } => None,
        }
    }
}
