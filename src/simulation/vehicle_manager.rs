//! Vehicle roster and the per-tick state machine
//!
//! The manager owns every vehicle and every occupancy record. A tick runs in
//! a fixed order: spawn queued vehicles, tick all nodes, then tick all edges.
//! Nodes go first so a vehicle leaving a node lands on an edge that has not
//! been ticked yet; the edge then skips it, so no vehicle changes state
//! twice in one tick.

use log::{debug, warn};
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use super::error::{Result, SimError};
use super::event::Event;
use super::occupied::{Occupied, OccupiedEdge, OccupiedNode};
use super::order::ConfirmedOrder;
use super::path::PathCalculator;
use super::region::Region;
use super::types::{ComponentRef, EdgeKey, Location, Tick, VehicleId};
use super::vehicle::{ArrivalAction, QueuedMove, Vehicle};

pub struct VehicleManager {
    region: Arc<Region>,
    path_calculator: Arc<dyn PathCalculator>,
    occupied_nodes: BTreeMap<Location, OccupiedNode>,
    occupied_edges: BTreeMap<EdgeKey, OccupiedEdge>,
    /// Indexed by `VehicleId.0`
    vehicles: Vec<Vehicle>,
    vehicles_to_spawn: Vec<VehicleId>,
    /// Events of the tick in progress
    events: Vec<Event>,
    last_tick: Option<Tick>,
}

impl VehicleManager {
    pub fn new(region: Arc<Region>, path_calculator: Arc<dyn PathCalculator>) -> Self {
        let occupied_nodes = region
            .nodes()
            .map(|node| (node.location(), OccupiedNode::new(node.clone())))
            .collect();
        let occupied_edges = region
            .edges()
            .map(|edge| (edge.key(), OccupiedEdge::new(edge.clone())))
            .collect();

        Self {
            region,
            path_calculator,
            occupied_nodes,
            occupied_edges,
            vehicles: Vec::new(),
            vehicles_to_spawn: Vec::new(),
            events: Vec::new(),
            last_tick: None,
        }
    }

    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    pub fn path_calculator(&self) -> &Arc<dyn PathCalculator> {
        &self.path_calculator
    }

    /// Registers a vehicle at a restaurant; it spawns on the next tick
    pub fn add_vehicle(&mut self, location: Location, capacity: f64) -> Result<VehicleId> {
        if !capacity.is_finite() || capacity <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "vehicle capacity must be positive, got {capacity}"
            )));
        }
        let occupied = self
            .occupied_nodes
            .get_mut(&location)
            .ok_or(SimError::NodeNotFound(location))?;
        if !occupied.is_restaurant() {
            return Err(SimError::NotARestaurant(location));
        }

        let id = VehicleId(self.vehicles.len());
        occupied.add_based_vehicle(id);
        self.vehicles.push(Vehicle::new(id, capacity, location));
        self.vehicles_to_spawn.push(id);
        debug!("Vehicle {:?} registered at {} (capacity {})", id, location, capacity);
        Ok(id)
    }

    /// Vehicles that have spawned, in id order
    pub fn vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter().filter(|vehicle| vehicle.is_spawned())
    }

    /// Every known vehicle, spawned or not
    pub fn all_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.iter()
    }

    pub fn vehicle(&self, id: VehicleId) -> Result<&Vehicle> {
        self.vehicles.get(id.0).ok_or(SimError::VehicleNotFound(id))
    }

    fn vehicle_mut(&mut self, id: VehicleId) -> Result<&mut Vehicle> {
        self.vehicles.get_mut(id.0).ok_or(SimError::VehicleNotFound(id))
    }

    pub fn pending_spawn(&self) -> &[VehicleId] {
        &self.vehicles_to_spawn
    }

    pub fn occupied(&self, component: ComponentRef) -> Result<Occupied<'_>> {
        match component {
            ComponentRef::Node(location) => self
                .occupied_nodes
                .get(&location)
                .map(Occupied::Node)
                .ok_or(SimError::OccupiedNotFound(component)),
            ComponentRef::Edge(key) => self
                .occupied_edges
                .get(&key)
                .map(Occupied::Edge)
                .ok_or(SimError::OccupiedNotFound(component)),
        }
    }

    pub fn occupied_node(&self, location: Location) -> Result<&OccupiedNode> {
        self.occupied_nodes
            .get(&location)
            .ok_or(SimError::OccupiedNotFound(ComponentRef::Node(location)))
    }

    /// Occupancy of the edge between `x` and `y`, in either order
    pub fn occupied_edge(&self, x: Location, y: Location) -> Result<&OccupiedEdge> {
        let key = EdgeKey::between(x, y);
        self.occupied_edges
            .get(&key)
            .ok_or(SimError::OccupiedNotFound(ComponentRef::Edge(key)))
    }

    pub fn occupied_restaurant(&self, location: Location) -> Result<&OccupiedNode> {
        self.occupied_nodes
            .get(&location)
            .filter(|occupied| occupied.is_restaurant())
            .ok_or(SimError::NotARestaurant(location))
    }

    pub fn occupied_neighborhood(&self, location: Location) -> Result<&OccupiedNode> {
        self.occupied_nodes
            .get(&location)
            .filter(|occupied| occupied.is_neighborhood())
            .ok_or(SimError::NotANeighborhood(location))
    }

    pub fn occupied_nodes(&self) -> impl Iterator<Item = &OccupiedNode> {
        self.occupied_nodes.values()
    }

    pub fn occupied_edges(&self) -> impl Iterator<Item = &OccupiedEdge> {
        self.occupied_edges.values()
    }

    pub fn occupied_restaurants(&self) -> impl Iterator<Item = &OccupiedNode> {
        self.occupied_nodes.values().filter(|occupied| occupied.is_restaurant())
    }

    pub fn occupied_neighborhoods(&self) -> impl Iterator<Item = &OccupiedNode> {
        self.occupied_nodes
            .values()
            .filter(|occupied| occupied.is_neighborhood())
    }

    /// Appends a move to `target` behind the vehicle's pending moves.
    ///
    /// The route is planned from wherever the previous move ends, so an
    /// unreachable target is rejected here instead of stalling a tick.
    pub fn queue_move(
        &mut self,
        vehicle: VehicleId,
        target: Location,
        action: Option<ArrivalAction>,
    ) -> Result<()> {
        if self.region.node(target).is_none() {
            return Err(SimError::NodeNotFound(target));
        }
        let current = self.vehicle(vehicle)?;
        let origin = current
            .planned_end()
            .ok_or(SimError::OccupiedNotFound(current.position()))?;
        let path = self.path_calculator.get_path(origin, target)?;

        let departure = self.last_tick.map_or(0, |tick| tick + 1);
        let entry = self.vehicle_mut(vehicle)?;
        let was_idle = entry.is_idle();
        let spawned = entry.is_spawned();
        entry.move_queue.push_back(QueuedMove {
            target,
            path: VecDeque::from(path),
            action,
        });

        if was_idle && spawned {
            if let Some(node) = self.occupied_nodes.get_mut(&origin) {
                node.schedule_departure(vehicle, departure);
            }
        }
        Ok(())
    }

    /// Drops all pending moves and heads for `target` instead.
    ///
    /// A vehicle on an edge still finishes that edge first.
    pub fn move_direct(
        &mut self,
        vehicle: VehicleId,
        target: Location,
        action: Option<ArrivalAction>,
    ) -> Result<()> {
        if self.region.node(target).is_none() {
            return Err(SimError::NodeNotFound(target));
        }
        let position = self.vehicle(vehicle)?.position();
        let next_node = match position {
            ComponentRef::Edge(key) => self
                .occupied_edges
                .get(&key)
                .and_then(|edge| edge.traversal(vehicle))
                .map(|traversal| traversal.to),
            ComponentRef::Node(_) => None,
        };

        let entry = self.vehicle_mut(vehicle)?;
        entry.move_queue.clear();
        if let Some(next_node) = next_node {
            entry.move_queue.push_back(QueuedMove {
                target: next_node,
                path: VecDeque::from([next_node]),
                action: None,
            });
        }
        self.queue_move(vehicle, target, action)
    }

    /// Has the restaurant at the vehicle's position hand `order` to it
    pub fn load_order(
        &mut self,
        vehicle: VehicleId,
        order: ConfirmedOrder,
        tick: Tick,
    ) -> Result<Event> {
        let restaurant = order.restaurant();
        self.occupied_restaurant(restaurant)?;
        self.occupied_neighborhood(order.location())?;

        let entry = self.vehicle_mut(vehicle)?;
        if !entry.is_spawned() {
            return Err(SimError::VehicleNotSpawned(vehicle));
        }
        if entry.current_node() != Some(restaurant) {
            return Err(SimError::VehicleNotAtRestaurant {
                vehicle,
                restaurant,
            });
        }
        entry.load(order.clone())?;
        debug!(
            "Vehicle {:?} loaded order {:?} at {} (now {:.2}/{:.2})",
            vehicle,
            order.id(),
            restaurant,
            entry.current_weight(),
            entry.capacity()
        );

        Ok(Event::LoadOrder {
            tick,
            vehicle,
            restaurant,
            order,
        })
    }

    /// Advances the whole simulation by one tick and returns its events
    pub fn tick(&mut self, current_tick: Tick) -> Vec<Event> {
        self.spawn_vehicles(current_tick);
        self.tick_nodes(current_tick);
        self.tick_edges(current_tick);
        self.last_tick = Some(current_tick);
        std::mem::take(&mut self.events)
    }

    /// Clears all positions, loads and occupancy and queues every vehicle
    /// for spawning again. Calling it twice is the same as calling it once.
    pub fn reset(&mut self) {
        for node in self.occupied_nodes.values_mut() {
            node.reset();
        }
        for edge in self.occupied_edges.values_mut() {
            edge.reset();
        }
        for vehicle in &mut self.vehicles {
            vehicle.reset();
        }
        self.vehicles_to_spawn = self.vehicles.iter().map(|vehicle| vehicle.id()).collect();
        self.events.clear();
        self.last_tick = None;
    }

    fn spawn_vehicles(&mut self, tick: Tick) {
        for id in std::mem::take(&mut self.vehicles_to_spawn) {
            let Some(vehicle) = self.vehicles.get_mut(id.0) else {
                continue;
            };
            let home = vehicle.starting_node();
            vehicle.spawned = true;
            vehicle.position = ComponentRef::Node(home);
            if let Some(node) = self.occupied_nodes.get_mut(&home) {
                node.arrive(id, tick);
            }
            debug!("Vehicle {:?} spawned at {}", id, home);
            self.events.push(Event::Spawn {
                tick,
                vehicle: id,
                node: home,
            });
        }
    }

    fn tick_nodes(&mut self, tick: Tick) {
        let occupants: Vec<(Location, VehicleId)> = self
            .occupied_nodes
            .iter()
            .flat_map(|(location, node)| node.vehicles().map(move |id| (*location, id)))
            .collect();

        for (location, id) in occupants {
            self.advance_at_node(id, location, tick);
        }
    }

    /// Starts the vehicle's next leg, finishing any zero-length moves first
    fn advance_at_node(&mut self, id: VehicleId, location: Location, tick: Tick) {
        loop {
            let Some(vehicle) = self.vehicles.get_mut(id.0) else {
                return;
            };
            let Some(front) = vehicle.move_queue.front() else {
                return;
            };

            let Some(next) = front.path.front().copied() else {
                let finished = vehicle.move_queue.pop_front();
                if let Some(finished) = finished {
                    self.run_arrival_action(id, location, finished.action, tick);
                }
                continue;
            };

            let key = EdgeKey::between(location, next);
            let Some(edge) = self.occupied_edges.get_mut(&key) else {
                warn!(
                    "Vehicle {:?} cannot leave {} towards {}: no such edge, dropping move",
                    id, location, next
                );
                vehicle.move_queue.pop_front();
                continue;
            };

            if let Some(node) = self.occupied_nodes.get_mut(&location) {
                node.depart(id);
            }
            edge.enter(id, tick, location);
            vehicle.position = ComponentRef::Edge(key);
            debug!("Vehicle {:?} left {} towards {}", id, location, next);
            self.events.push(Event::ArrivedAtEdge {
                tick,
                vehicle: id,
                edge: edge.edge().clone(),
                last_node: location,
            });
            return;
        }
    }

    fn tick_edges(&mut self, tick: Tick) {
        let keys: Vec<EdgeKey> = self.occupied_edges.keys().copied().collect();
        for key in keys {
            let arrivals = match self.occupied_edges.get_mut(&key) {
                Some(edge) => edge.advance(tick),
                None => continue,
            };
            for (id, node) in arrivals {
                self.arrive_at_node(id, key, node, tick);
            }
        }
    }

    fn arrive_at_node(&mut self, id: VehicleId, key: EdgeKey, location: Location, tick: Tick) {
        let Some(vehicle) = self.vehicles.get_mut(id.0) else {
            return;
        };
        vehicle.position = ComponentRef::Node(location);

        let finished = match vehicle.move_queue.front_mut() {
            Some(front) => {
                if front.path.front() == Some(&location) {
                    front.path.pop_front();
                }
                front.path.is_empty()
            }
            None => false,
        };
        let finished = if finished {
            vehicle.move_queue.pop_front()
        } else {
            None
        };
        let moving_on = !vehicle.move_queue.is_empty();

        if let Some(node) = self.occupied_nodes.get_mut(&location) {
            node.arrive(id, tick);
            if moving_on {
                node.schedule_departure(id, tick + 1);
            }
        }

        if let Some(last_edge) = self.region.edge_by_key(key) {
            self.events.push(Event::ArrivedAtNode {
                tick,
                vehicle: id,
                node: location,
                last_edge: last_edge.clone(),
            });
        }
        debug!("Vehicle {:?} arrived at {}", id, location);

        if let Some(finished) = finished {
            self.run_arrival_action(id, location, finished.action, tick);
        }
    }

    fn run_arrival_action(
        &mut self,
        id: VehicleId,
        location: Location,
        action: Option<ArrivalAction>,
        tick: Tick,
    ) {
        match action {
            None => {}
            Some(ArrivalAction::Callback(callback)) => callback(id, tick),
            Some(ArrivalAction::DeliverOrders) => self.deliver_orders(id, location, tick),
        }
    }

    fn deliver_orders(&mut self, id: VehicleId, location: Location, tick: Tick) {
        let Some(node) = self.occupied_nodes.get_mut(&location) else {
            return;
        };
        if !node.is_neighborhood() {
            warn!(
                "Vehicle {:?} tried to deliver at {}, which is not a neighborhood",
                id, location
            );
            return;
        }
        let Some(vehicle) = self.vehicles.get_mut(id.0) else {
            return;
        };

        for mut order in vehicle.unload_for(location) {
            order.mark_delivered(tick);
            node.record_delivery();
            debug!("Vehicle {:?} delivered order {:?} at {}", id, order.id(), location);
            self.events.push(Event::DeliverOrder {
                tick,
                vehicle: id,
                node: location,
                order,
            });
        }
    }
}
