//! Dispatch policy: which vehicle carries which order
//!
//! Orders wait in a pending pool sorted by the start of their delivery
//! window. Every tick, each idle vehicle standing at a restaurant is filled
//! greedily from that restaurant's pending orders, gets one leg per distinct
//! destination and a final leg back home.

use log::{debug, warn};
use sorted_vec::SortedVec;
use std::cmp::Ordering;
use std::collections::HashSet;

use super::error::{Result, SimError};
use super::event::Event;
use super::order::ConfirmedOrder;
use super::types::{Location, OrderId, Tick, VehicleId};
use super::vehicle::ArrivalAction;
use super::vehicle_manager::VehicleManager;

/// An order in the pending pool, ordered by window start then arrival
#[derive(Debug, Clone)]
struct PendingOrder {
    start: Tick,
    sequence: u64,
    order: ConfirmedOrder,
}

impl PartialEq for PendingOrder {
    fn eq(&self, other: &Self) -> bool {
        self.start == other.start && self.sequence == other.sequence
    }
}

impl Eq for PendingOrder {}

impl PartialOrd for PendingOrder {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingOrder {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start
            .cmp(&other.start)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

pub struct DeliveryService {
    vehicle_manager: VehicleManager,
    pending_orders: SortedVec<PendingOrder>,
    next_sequence: u64,
}

impl DeliveryService {
    pub fn new(vehicle_manager: VehicleManager) -> Self {
        Self {
            vehicle_manager,
            pending_orders: SortedVec::new(),
            next_sequence: 0,
        }
    }

    pub fn vehicle_manager(&self) -> &VehicleManager {
        &self.vehicle_manager
    }

    pub fn vehicle_manager_mut(&mut self) -> &mut VehicleManager {
        &mut self.vehicle_manager
    }

    /// Orders not yet loaded onto any vehicle, earliest window first
    pub fn pending_orders(&self) -> impl Iterator<Item = &ConfirmedOrder> {
        self.pending_orders.iter().map(|pending| &pending.order)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_orders.len()
    }

    /// Advances the vehicles, accepts `new_orders` and loads idle vehicles.
    ///
    /// Returns the vehicle manager's events followed by one `OrderReceived`
    /// per new order and one `LoadOrder` per order loaded this tick.
    pub fn tick(&mut self, current_tick: Tick, new_orders: Vec<ConfirmedOrder>) -> Vec<Event> {
        let mut events = self.vehicle_manager.tick(current_tick);

        for order in new_orders {
            if let Err(err) = self.validate(&order) {
                warn!("Rejecting order {:?}: {}", order.id(), err);
                continue;
            }
            events.push(Event::OrderReceived {
                tick: current_tick,
                order: order.clone(),
            });
            self.pending_orders.insert(PendingOrder {
                start: order.delivery_interval().start(),
                sequence: self.next_sequence,
                order,
            });
            self.next_sequence += 1;
        }

        let ready: Vec<(Location, VehicleId)> = self
            .vehicle_manager
            .occupied_restaurants()
            .flat_map(|restaurant| {
                let location = restaurant.location();
                restaurant.vehicles().map(move |vehicle| (location, vehicle))
            })
            .collect();

        for (restaurant, vehicle) in ready {
            let idle = self
                .vehicle_manager
                .vehicle(vehicle)
                .is_ok_and(|entry| entry.is_idle());
            if idle {
                self.load_orders(current_tick, restaurant, vehicle, &mut events);
            }
        }

        events
    }

    /// An order must come from a restaurant and go to a neighborhood
    fn validate(&self, order: &ConfirmedOrder) -> Result<()> {
        let region = self.vehicle_manager.region();
        if !region
            .node(order.restaurant())
            .is_some_and(|node| node.is_restaurant())
        {
            return Err(SimError::NotARestaurant(order.restaurant()));
        }
        if !region
            .node(order.location())
            .is_some_and(|node| node.is_neighborhood())
        {
            return Err(SimError::NotANeighborhood(order.location()));
        }
        Ok(())
    }

    fn load_orders(
        &mut self,
        current_tick: Tick,
        restaurant: Location,
        vehicle: VehicleId,
        events: &mut Vec<Event>,
    ) {
        let available: Vec<ConfirmedOrder> = self
            .pending_orders
            .iter()
            .filter(|pending| pending.order.restaurant() == restaurant)
            .map(|pending| pending.order.clone())
            .collect();

        let mut loaded: HashSet<OrderId> = HashSet::new();
        let mut destinations: Vec<Location> = Vec::new();

        for order in available {
            let fits = self
                .vehicle_manager
                .vehicle(vehicle)
                .is_ok_and(|entry| entry.can_load(order.weight()));
            if !fits {
                break;
            }

            if let Err(err) = self
                .vehicle_manager
                .path_calculator()
                .get_path(restaurant, order.location())
            {
                warn!("Skipping order {:?}: {}", order.id(), err);
                continue;
            }

            let destination = order.location();
            let order_id = order.id();
            match self.vehicle_manager.load_order(vehicle, order, current_tick) {
                Ok(event) => events.push(event),
                Err(err) => {
                    warn!("Could not load order {:?}: {}", order_id, err);
                    break;
                }
            }
            loaded.insert(order_id);

            if destinations.contains(&destination) {
                continue;
            }
            if let Err(err) = self.vehicle_manager.queue_move(
                vehicle,
                destination,
                Some(ArrivalAction::DeliverOrders),
            ) {
                warn!("Vehicle {:?} cannot head to {}: {}", vehicle, destination, err);
            }
            destinations.push(destination);
        }

        if loaded.is_empty() {
            return;
        }
        self.pending_orders
            .retain(|pending| !loaded.contains(&pending.order.id()));

        if let Err(err) = self.vehicle_manager.queue_move(vehicle, restaurant, None) {
            warn!("Vehicle {:?} cannot return to {}: {}", vehicle, restaurant, err);
        }
        debug!(
            "Vehicle {:?} dispatched from {} with {} orders to {} stops",
            vehicle,
            restaurant,
            loaded.len(),
            destinations.len()
        );
    }

    /// Resets the vehicle manager and empties the pending pool
    pub fn reset(&mut self) {
        self.vehicle_manager.reset();
        self.pending_orders.clear();
        self.next_sequence = 0;
    }
}
