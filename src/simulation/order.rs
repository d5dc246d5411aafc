//! Confirmed delivery orders

use ordered_float::OrderedFloat;

use super::error::{Result, SimError};
use super::types::{Location, OrderId, Tick, TickInterval};

/// A customer request to bring food from a restaurant to a location
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConfirmedOrder {
    id: OrderId,
    location: Location,
    restaurant: Location,
    delivery_interval: TickInterval,
    food_list: Vec<String>,
    weight: OrderedFloat<f64>,
    actual_delivery_tick: Option<Tick>,
}

impl ConfirmedOrder {
    /// Fails on negative or non-finite weights
    pub fn new(
        id: OrderId,
        location: Location,
        restaurant: Location,
        delivery_interval: TickInterval,
        food_list: Vec<String>,
        weight: f64,
    ) -> Result<Self> {
        if !weight.is_finite() || weight < 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "order weight must be a non-negative number, got {weight}"
            )));
        }
        Ok(Self {
            id,
            location,
            restaurant,
            delivery_interval,
            food_list,
            weight: OrderedFloat(weight),
            actual_delivery_tick: None,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    /// Where the order has to be delivered
    pub fn location(&self) -> Location {
        self.location
    }

    /// Location of the restaurant preparing the order
    pub fn restaurant(&self) -> Location {
        self.restaurant
    }

    pub fn delivery_interval(&self) -> TickInterval {
        self.delivery_interval
    }

    pub fn food_list(&self) -> &[String] {
        &self.food_list
    }

    pub fn weight(&self) -> f64 {
        self.weight.into_inner()
    }

    pub fn actual_delivery_tick(&self) -> Option<Tick> {
        self.actual_delivery_tick
    }

    pub(crate) fn mark_delivered(&mut self, tick: Tick) {
        self.actual_delivery_tick = Some(tick);
    }
}
