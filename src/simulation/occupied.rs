//! Runtime occupancy of nodes and edges
//!
//! Each region component gets one occupancy record, owned by the
//! vehicle manager, describing which vehicles currently sit on it.

use std::collections::{BTreeMap, BTreeSet};

use super::region::{Edge, Node, NodeKind};
use super::types::{Location, Tick, VehicleId};

/// Arrival bookkeeping for a vehicle standing on a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VehicleStats {
    pub arrived: Tick,
    /// Tick at which the vehicle is expected to leave, once a move is queued
    pub departure: Option<Tick>,
}

/// Variant-specific occupancy state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccupiedKind {
    Plain,
    Neighborhood {
        delivered_orders: usize,
    },
    /// Vehicles based here return to this restaurant between trips
    Restaurant {
        based_vehicles: BTreeSet<VehicleId>,
    },
}

/// Occupancy of one node
#[derive(Debug, Clone)]
pub struct OccupiedNode {
    node: Node,
    vehicles: BTreeMap<VehicleId, VehicleStats>,
    kind: OccupiedKind,
}

impl OccupiedNode {
    pub fn new(node: Node) -> Self {
        let kind = match node.kind() {
            NodeKind::Plain => OccupiedKind::Plain,
            NodeKind::Neighborhood => OccupiedKind::Neighborhood {
                delivered_orders: 0,
            },
            NodeKind::Restaurant { .. } => OccupiedKind::Restaurant {
                based_vehicles: BTreeSet::new(),
            },
        };
        Self {
            node,
            vehicles: BTreeMap::new(),
            kind,
        }
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn location(&self) -> Location {
        self.node.location()
    }

    pub fn kind(&self) -> &OccupiedKind {
        &self.kind
    }

    pub fn is_restaurant(&self) -> bool {
        matches!(self.kind, OccupiedKind::Restaurant { .. })
    }

    pub fn is_neighborhood(&self) -> bool {
        matches!(self.kind, OccupiedKind::Neighborhood { .. })
    }

    /// Vehicles currently standing on this node, by id
    pub fn vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.keys().copied()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn contains(&self, vehicle: VehicleId) -> bool {
        self.vehicles.contains_key(&vehicle)
    }

    pub fn stats(&self, vehicle: VehicleId) -> Option<&VehicleStats> {
        self.vehicles.get(&vehicle)
    }

    /// Vehicles whose home is this restaurant; empty for other kinds
    pub fn based_vehicles(&self) -> Vec<VehicleId> {
        match &self.kind {
            OccupiedKind::Restaurant { based_vehicles } => {
                based_vehicles.iter().copied().collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn delivered_orders(&self) -> usize {
        match &self.kind {
            OccupiedKind::Neighborhood { delivered_orders } => *delivered_orders,
            _ => 0,
        }
    }

    pub(crate) fn arrive(&mut self, vehicle: VehicleId, tick: Tick) {
        self.vehicles.insert(
            vehicle,
            VehicleStats {
                arrived: tick,
                departure: None,
            },
        );
    }

    pub(crate) fn depart(&mut self, vehicle: VehicleId) -> Option<VehicleStats> {
        self.vehicles.remove(&vehicle)
    }

    pub(crate) fn schedule_departure(&mut self, vehicle: VehicleId, tick: Tick) {
        if let Some(stats) = self.vehicles.get_mut(&vehicle) {
            stats.departure.get_or_insert(tick);
        }
    }

    pub(crate) fn add_based_vehicle(&mut self, vehicle: VehicleId) {
        if let OccupiedKind::Restaurant { based_vehicles } = &mut self.kind {
            based_vehicles.insert(vehicle);
        }
    }

    pub(crate) fn record_delivery(&mut self) {
        if let OccupiedKind::Neighborhood { delivered_orders } = &mut self.kind {
            *delivered_orders += 1;
        }
    }

    /// Clears runtime state. Based vehicles are configuration and survive.
    pub(crate) fn reset(&mut self) {
        self.vehicles.clear();
        if let OccupiedKind::Neighborhood { delivered_orders } = &mut self.kind {
            *delivered_orders = 0;
        }
    }
}

/// Progress of a vehicle along an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeTraversal {
    pub entered: Tick,
    pub progress: u64,
    pub from: Location,
    pub to: Location,
}

/// Occupancy of one edge
#[derive(Debug, Clone)]
pub struct OccupiedEdge {
    edge: Edge,
    vehicles: BTreeMap<VehicleId, EdgeTraversal>,
}

impl OccupiedEdge {
    pub fn new(edge: Edge) -> Self {
        Self {
            edge,
            vehicles: BTreeMap::new(),
        }
    }

    pub fn edge(&self) -> &Edge {
        &self.edge
    }

    pub fn vehicles(&self) -> impl Iterator<Item = VehicleId> + '_ {
        self.vehicles.keys().copied()
    }

    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    pub fn contains(&self, vehicle: VehicleId) -> bool {
        self.vehicles.contains_key(&vehicle)
    }

    pub fn traversal(&self, vehicle: VehicleId) -> Option<&EdgeTraversal> {
        self.vehicles.get(&vehicle)
    }

    pub(crate) fn enter(&mut self, vehicle: VehicleId, tick: Tick, from: Location) {
        let to = self.edge.key().other(from);
        self.vehicles.insert(
            vehicle,
            EdgeTraversal {
                entered: tick,
                progress: 0,
                from,
                to,
            },
        );
    }

    /// Moves every vehicle one unit along the edge and removes those that
    /// reached the far end, returning them with their destination.
    ///
    /// Vehicles that entered during `tick` are left untouched.
    pub(crate) fn advance(&mut self, tick: Tick) -> Vec<(VehicleId, Location)> {
        let duration = self.edge.duration();
        let mut arrived = Vec::new();
        for (vehicle, traversal) in self.vehicles.iter_mut() {
            if traversal.entered >= tick {
                continue;
            }
            traversal.progress += 1;
            if traversal.progress >= duration {
                arrived.push((*vehicle, traversal.to));
            }
        }
        for (vehicle, _) in &arrived {
            self.vehicles.remove(vehicle);
        }
        arrived
    }

    pub(crate) fn reset(&mut self) {
        self.vehicles.clear();
    }
}

/// Read-only view of a component's occupancy
#[derive(Debug, Clone, Copy)]
pub enum Occupied<'a> {
    Node(&'a OccupiedNode),
    Edge(&'a OccupiedEdge),
}

impl Occupied<'_> {
    pub fn vehicle_ids(&self) -> Vec<VehicleId> {
        match self {
            Occupied::Node(node) => node.vehicles().collect(),
            Occupied::Edge(edge) => edge.vehicles().collect(),
        }
    }
}
