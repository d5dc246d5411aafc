//! Simulation driver that ties region, vehicles, orders and raters together
//!
//! This is the entry point for running a delivery simulation headless.

use log::{debug, info};
use std::collections::BTreeMap;
use std::sync::Arc;

use super::delivery_service::DeliveryService;
use super::error::Result;
use super::event::Event;
use super::generator::{FridayOrderGenerator, OrderGenerator};
use super::path::{CachedPathCalculator, DijkstraPathCalculator, PathCalculator};
use super::rating::{
    AmountDeliveredRaterFactory, InTimeRaterFactory, Rater, RaterFactory, RatingCriteria,
    TravelDistanceRaterFactory,
};
use super::region::{Region, RestaurantPreset};
use super::stats::{self, SimulationStats};
use super::types::{Location, Tick};
use super::vehicle_manager::VehicleManager;

/// Knobs of the built-in test world
#[derive(Debug, Clone)]
pub struct TestWorldConfig {
    pub order_count: usize,
    pub vehicles_per_restaurant: usize,
    pub vehicle_capacity: f64,
    /// Last tick at which orders are placed
    pub last_order_tick: Tick,
    pub seed: Option<u64>,
}

impl Default for TestWorldConfig {
    fn default() -> Self {
        Self {
            order_count: 200,
            vehicles_per_restaurant: 2,
            vehicle_capacity: 1.0,
            last_order_tick: 480,
            seed: None,
        }
    }
}

/// Spacing between neighboring grid nodes of the test world
const GRID_SPACING: i32 = 5;
const GRID_SIZE: i32 = 4;

/// The main simulation world
pub struct SimWorld {
    delivery_service: DeliveryService,
    order_generator: Box<dyn OrderGenerator>,
    rater_factories: Vec<Box<dyn RaterFactory>>,
    raters: Vec<Box<dyn Rater>>,
    current_tick: Tick,
    stats: SimulationStats,
}

impl SimWorld {
    pub fn new(
        delivery_service: DeliveryService,
        order_generator: Box<dyn OrderGenerator>,
        rater_factories: Vec<Box<dyn RaterFactory>>,
    ) -> Self {
        let raters = rater_factories.iter().map(|factory| factory.create()).collect();
        Self {
            delivery_service,
            order_generator,
            rater_factories,
            raters,
            current_tick: 0,
            stats: SimulationStats::default(),
        }
    }

    /// Tick that the next call to [`SimWorld::tick`] simulates
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    pub fn delivery_service(&self) -> &DeliveryService {
        &self.delivery_service
    }

    pub fn delivery_service_mut(&mut self) -> &mut DeliveryService {
        &mut self.delivery_service
    }

    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// Runs one tick: fetch new orders, advance the delivery service, rate
    pub fn tick(&mut self) -> Result<Vec<Event>> {
        let tick = self.current_tick;
        let orders = self.order_generator.generate_orders(tick)?;
        let events = self.delivery_service.tick(tick, orders);

        for rater in &mut self.raters {
            rater.on_tick(&events, tick);
        }
        self.stats.record(&events);
        self.current_tick += 1;
        Ok(events)
    }

    pub fn run(&mut self, ticks: u64) -> Result<()> {
        for _ in 0..ticks {
            self.tick()?;
        }
        debug!("Ran {} ticks, now at tick {}", ticks, self.current_tick);
        Ok(())
    }

    /// Starts over from tick 0 with fresh raters; the order source is kept
    pub fn reset(&mut self) {
        self.delivery_service.reset();
        self.raters = self
            .rater_factories
            .iter()
            .map(|factory| factory.create())
            .collect();
        self.current_tick = 0;
        self.stats = SimulationStats::default();
    }

    pub fn scores(&self) -> BTreeMap<RatingCriteria, f64> {
        self.raters
            .iter()
            .map(|rater| (rater.criteria(), rater.score()))
            .collect()
    }

    pub fn print_summary(&self) {
        let manager = self.delivery_service.vehicle_manager();
        let region = manager.region();
        info!(
            "Nodes: {}, Edges: {}, Restaurants: {}, Neighborhoods: {}",
            region.node_count(),
            region.edge_count(),
            region.restaurants().count(),
            region.neighborhoods().count()
        );
        info!(
            "Vehicles on the road: {}",
            manager
                .occupied_edges()
                .map(|edge| edge.vehicle_count())
                .sum::<usize>()
        );
        info!("Pending orders: {}", self.delivery_service.pending_count());
        stats::log_summary(self.current_tick, &self.stats, &self.scores());
    }

    /// A 4x4 grid with three restaurants and seeded demand
    pub fn create_test_world(seed: u64) -> Result<Self> {
        Self::build_test_world(&TestWorldConfig {
            seed: Some(seed),
            ..TestWorldConfig::default()
        })
    }

    pub fn build_test_world(config: &TestWorldConfig) -> Result<Self> {
        let region = Arc::new(Self::test_region()?);
        let dijkstra: Arc<dyn PathCalculator> =
            Arc::new(DijkstraPathCalculator::new(Arc::clone(&region)));
        let path_calculator: Arc<dyn PathCalculator> =
            Arc::new(CachedPathCalculator::new(dijkstra, Arc::clone(&region)));

        let mut vehicle_manager = VehicleManager::new(Arc::clone(&region), Arc::clone(&path_calculator));
        let restaurants: Vec<Location> = region.restaurants().map(|node| node.location()).collect();
        for restaurant in restaurants {
            for _ in 0..config.vehicles_per_restaurant {
                vehicle_manager.add_vehicle(restaurant, config.vehicle_capacity)?;
            }
        }

        let order_generator = FridayOrderGenerator::builder()
            .order_count(config.order_count)
            .last_tick(config.last_order_tick)
            .seed(config.seed)
            .build(&region)?;

        let rater_factories: Vec<Box<dyn RaterFactory>> = vec![
            Box::new(InTimeRaterFactory::builder().build()?),
            Box::new(TravelDistanceRaterFactory::builder(path_calculator).build()?),
            Box::new(AmountDeliveredRaterFactory::builder().build()?),
        ];

        Ok(Self::new(
            DeliveryService::new(vehicle_manager),
            Box::new(order_generator),
            rater_factories,
        ))
    }

    fn test_region() -> Result<Region> {
        let restaurants = [
            (Location::new(5, 5), RestaurantPreset::PizzaPalace),
            (Location::new(10, 10), RestaurantPreset::BurgerBarn),
            (Location::new(15, 0), RestaurantPreset::SushiCorner),
        ];
        let crossing = Location::new(10, 5);

        let mut builder = Region::builder();
        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                let location = Location::new(x * GRID_SPACING, y * GRID_SPACING);
                if let Some((_, preset)) = restaurants.iter().find(|(at, _)| *at == location) {
                    builder.add_restaurant(location, *preset)?;
                } else if location == crossing {
                    builder.add_node("Crossing", location)?;
                } else {
                    builder.add_neighborhood(format!("Block {x}-{y}"), location)?;
                }
            }
        }

        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                let here = Location::new(x * GRID_SPACING, y * GRID_SPACING);
                if x + 1 < GRID_SIZE {
                    let east = here + Location::new(GRID_SPACING, 0);
                    builder.add_edge(format!("Street {x}-{y} east"), here, east)?;
                }
                if y + 1 < GRID_SIZE {
                    let north = here + Location::new(0, GRID_SPACING);
                    builder.add_edge(format!("Avenue {x}-{y} north"), here, north)?;
                }
            }
        }

        builder.build()
    }
}
