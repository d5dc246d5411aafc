//! Delivery vehicles and their queued moves
//!
//! A vehicle never moves itself. It only records what it carries and where
//! it wants to go; the vehicle manager consumes the move queue while ticking.

use std::collections::VecDeque;
use std::fmt;

use super::error::{Result, SimError};
use super::order::ConfirmedOrder;
use super::types::{ComponentRef, Location, Tick, VehicleId};

/// Slack for rounding in summed order weights
const CAPACITY_TOLERANCE: f64 = 1e-9;

/// What to do when a queued move reaches its target
pub enum ArrivalAction {
    /// Hand over every loaded order addressed to the arrival node
    DeliverOrders,
    /// Run an arbitrary closure exactly once
    Callback(Box<dyn FnOnce(VehicleId, Tick) + Send>),
}

impl fmt::Debug for ArrivalAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArrivalAction::DeliverOrders => write!(f, "DeliverOrders"),
            ArrivalAction::Callback(_) => write!(f, "Callback(..)"),
        }
    }
}

/// One leg of a vehicle's itinerary
#[derive(Debug)]
pub struct QueuedMove {
    pub target: Location,
    /// Nodes still to be reached, ending with `target`
    pub path: VecDeque<Location>,
    pub action: Option<ArrivalAction>,
}

/// A delivery vehicle
#[derive(Debug)]
pub struct Vehicle {
    id: VehicleId,
    capacity: f64,
    orders: Vec<ConfirmedOrder>,
    starting_node: Location,
    pub(crate) move_queue: VecDeque<QueuedMove>,
    pub(crate) position: ComponentRef,
    pub(crate) spawned: bool,
}

impl Vehicle {
    pub(crate) fn new(id: VehicleId, capacity: f64, starting_node: Location) -> Self {
        Self {
            id,
            capacity,
            orders: Vec::new(),
            starting_node,
            move_queue: VecDeque::new(),
            position: ComponentRef::Node(starting_node),
            spawned: false,
        }
    }

    pub fn id(&self) -> VehicleId {
        self.id
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn current_weight(&self) -> f64 {
        self.orders.iter().map(|order| order.weight()).sum()
    }

    pub fn remaining_capacity(&self) -> f64 {
        self.capacity - self.current_weight()
    }

    /// Whether an order of `weight` fits; an exact fit is accepted
    pub fn can_load(&self, weight: f64) -> bool {
        self.capacity - (self.current_weight() + weight) >= -CAPACITY_TOLERANCE
    }

    pub fn orders(&self) -> &[ConfirmedOrder] {
        &self.orders
    }

    /// Home restaurant where the vehicle spawns
    pub fn starting_node(&self) -> Location {
        self.starting_node
    }

    /// Component the vehicle currently occupies (its home before spawning)
    pub fn position(&self) -> ComponentRef {
        self.position
    }

    /// Node the vehicle stands on, if it is not on an edge
    pub fn current_node(&self) -> Option<Location> {
        match self.position {
            ComponentRef::Node(location) => Some(location),
            ComponentRef::Edge(_) => None,
        }
    }

    pub fn is_spawned(&self) -> bool {
        self.spawned
    }

    /// No moves are pending
    pub fn is_idle(&self) -> bool {
        self.move_queue.is_empty()
    }

    pub fn queued_targets(&self) -> Vec<Location> {
        self.move_queue.iter().map(|mv| mv.target).collect()
    }

    /// Where the vehicle ends up once its queue is drained
    pub(crate) fn planned_end(&self) -> Option<Location> {
        match self.move_queue.back() {
            Some(mv) => Some(mv.target),
            None => self.current_node(),
        }
    }

    pub(crate) fn load(&mut self, order: ConfirmedOrder) -> Result<()> {
        if !self.can_load(order.weight()) {
            return Err(SimError::CapacityExceeded {
                vehicle: self.id,
                capacity: self.capacity,
                current: self.current_weight(),
                weight: order.weight(),
            });
        }
        self.orders.push(order);
        Ok(())
    }

    /// Removes and returns every loaded order addressed to `location`
    pub(crate) fn unload_for(&mut self, location: Location) -> Vec<ConfirmedOrder> {
        let (delivered, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.orders)
            .into_iter()
            .partition(|order| order.location() == location);
        self.orders = kept;
        delivered
    }

    /// Back to the pre-spawn state at the home restaurant
    pub(crate) fn reset(&mut self) {
        self.orders.clear();
        self.move_queue.clear();
        self.position = ComponentRef::Node(self.starting_node);
        self.spawned = false;
    }
}
