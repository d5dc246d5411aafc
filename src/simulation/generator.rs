//! Order sources feeding the delivery service

use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use super::error::{Result, SimError};
use super::order::ConfirmedOrder;
use super::region::Region;
use super::types::{Location, OrderId, Tick, TickInterval};

/// Supplies the orders that arrive at each tick
pub trait OrderGenerator: Send {
    /// Orders placed during `tick`; fails for negative ticks
    fn generate_orders(&mut self, tick: Tick) -> Result<Vec<ConfirmedOrder>>;
}

/// Replays a fixed tick to orders table
#[derive(Debug, Clone, Default)]
pub struct ScriptedOrderGenerator {
    orders: BTreeMap<Tick, Vec<ConfirmedOrder>>,
}

impl ScriptedOrderGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_order(&mut self, tick: Tick, order: ConfirmedOrder) -> &mut Self {
        self.orders.entry(tick).or_default().push(order);
        self
    }

    pub fn order_count(&self) -> usize {
        self.orders.values().map(Vec::len).sum()
    }
}

impl OrderGenerator for ScriptedOrderGenerator {
    fn generate_orders(&mut self, tick: Tick) -> Result<Vec<ConfirmedOrder>> {
        if tick < 0 {
            return Err(SimError::NegativeTick(tick));
        }
        Ok(self.orders.get(&tick).cloned().unwrap_or_default())
    }
}

/// Busy-evening demand: order times follow a normal distribution centered
/// on the middle of the run, truncated to `[0, last_tick]`.
pub struct FridayOrderGenerator {
    rng: StdRng,
    standard_deviation: f64,
    order_count: usize,
    delivery_interval: Tick,
    max_weight: f64,
    last_tick: Tick,
    restaurants: Vec<(Location, Vec<String>)>,
    neighborhoods: Vec<Location>,
    orders_by_tick: Option<BTreeMap<Tick, Vec<ConfirmedOrder>>>,
}

impl FridayOrderGenerator {
    pub fn builder() -> FridayOrderGeneratorBuilder {
        FridayOrderGeneratorBuilder::default()
    }

    /// Normal sample with mean 0.5, redrawn until it lands in `[0, 1]`
    pub fn random_gaussian_between_zero_and_one(&mut self) -> f64 {
        loop {
            let sample = 0.5 + self.standard_deviation * self.standard_normal();
            if (0.0..=1.0).contains(&sample) {
                return sample;
            }
        }
    }

    /// Box-Muller transform over two uniform samples; the crate depends on
    /// `rand` only, not `rand_distr`
    fn standard_normal(&mut self) -> f64 {
        let u1: f64 = 1.0 - self.rng.random::<f64>();
        let u2: f64 = self.rng.random::<f64>();
        (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
    }

    fn populate(&mut self) -> Result<BTreeMap<Tick, Vec<ConfirmedOrder>>> {
        let mut orders_by_tick: BTreeMap<Tick, Vec<ConfirmedOrder>> = BTreeMap::new();

        for index in 0..self.order_count {
            let tick = (self.random_gaussian_between_zero_and_one() * self.last_tick as f64).round()
                as Tick;

            let Some((restaurant, menu)) = self.restaurants.choose(&mut self.rng).cloned() else {
                break;
            };
            let Some(destination) = self.neighborhoods.choose(&mut self.rng).copied() else {
                break;
            };

            let food_count = self.rng.random_range(1..10);
            let food_list = (0..food_count)
                .filter_map(|_| menu.choose(&mut self.rng).cloned())
                .collect();
            let weight = self.rng.random_range(0.0..self.max_weight);

            let order = ConfirmedOrder::new(
                OrderId(index as u64),
                destination,
                restaurant,
                TickInterval::new(tick, tick + self.delivery_interval)?,
                food_list,
                weight,
            )?;
            orders_by_tick.entry(tick).or_default().push(order);
        }

        Ok(orders_by_tick)
    }
}

impl OrderGenerator for FridayOrderGenerator {
    fn generate_orders(&mut self, tick: Tick) -> Result<Vec<ConfirmedOrder>> {
        if tick < 0 {
            return Err(SimError::NegativeTick(tick));
        }
        if self.orders_by_tick.is_none() {
            self.orders_by_tick = Some(self.populate()?);
        }
        Ok(self
            .orders_by_tick
            .as_ref()
            .and_then(|orders| orders.get(&tick))
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct FridayOrderGeneratorBuilder {
    order_count: usize,
    delivery_interval: Tick,
    max_weight: f64,
    standard_deviation: f64,
    last_tick: Tick,
    seed: Option<u64>,
}

impl Default for FridayOrderGeneratorBuilder {
    fn default() -> Self {
        Self {
            order_count: 1000,
            delivery_interval: 15,
            max_weight: 0.5,
            standard_deviation: 0.5,
            last_tick: 480,
            seed: None,
        }
    }
}

impl FridayOrderGeneratorBuilder {
    pub fn order_count(mut self, order_count: usize) -> Self {
        self.order_count = order_count;
        self
    }

    pub fn delivery_interval(mut self, delivery_interval: Tick) -> Self {
        self.delivery_interval = delivery_interval;
        self
    }

    pub fn max_weight(mut self, max_weight: f64) -> Self {
        self.max_weight = max_weight;
        self
    }

    pub fn standard_deviation(mut self, standard_deviation: f64) -> Self {
        self.standard_deviation = standard_deviation;
        self
    }

    pub fn last_tick(mut self, last_tick: Tick) -> Self {
        self.last_tick = last_tick;
        self
    }

    /// Fixes the random sequence; without a seed every generator differs
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Creates a generator drawing restaurants and neighborhoods from `region`
    pub fn build(&self, region: &Region) -> Result<FridayOrderGenerator> {
        if self.delivery_interval < 0 {
            return Err(SimError::InvalidParameter(format!(
                "delivery_interval must not be negative, got {}",
                self.delivery_interval
            )));
        }
        if !self.max_weight.is_finite() || self.max_weight <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "max_weight must be positive, got {}",
                self.max_weight
            )));
        }
        if !self.standard_deviation.is_finite() || self.standard_deviation <= 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "standard_deviation must be positive, got {}",
                self.standard_deviation
            )));
        }
        if self.last_tick < 0 {
            return Err(SimError::InvalidParameter(format!(
                "last_tick must not be negative, got {}",
                self.last_tick
            )));
        }

        let restaurants: Vec<(Location, Vec<String>)> = region
            .restaurants()
            .map(|node| {
                (
                    node.location(),
                    node.available_food().map(<[String]>::to_vec).unwrap_or_default(),
                )
            })
            .collect();
        let neighborhoods: Vec<Location> = region.neighborhoods().map(|node| node.location()).collect();
        if self.order_count > 0 && (restaurants.is_empty() || neighborhoods.is_empty()) {
            return Err(SimError::InvalidRegion(
                "order generation needs at least one restaurant and one neighborhood".into(),
            ));
        }

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Ok(FridayOrderGenerator {
            rng,
            standard_deviation: self.standard_deviation,
            order_count: self.order_count,
            delivery_interval: self.delivery_interval,
            max_weight: self.max_weight,
            last_tick: self.last_tick,
            restaurants,
            neighborhoods,
            orders_by_tick: None,
        })
    }
}
