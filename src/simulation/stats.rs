//! Per-run counters and the end-of-run log summary

use log::info;
use std::collections::BTreeMap;

use super::event::Event;
use super::rating::RatingCriteria;
use super::types::Tick;

/// Running counters of one simulation run, fed from the event stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationStats {
    pub ticks_run: u64,
    pub vehicles_spawned: u32,
    pub orders_received: u32,
    pub orders_loaded: u32,
    pub orders_delivered: u32,
    pub edges_traveled: u32,
    pub distance_traveled: u64,
}

impl SimulationStats {
    pub fn record(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::Spawn { .. } => self.vehicles_spawned += 1,
                Event::OrderReceived { .. } => self.orders_received += 1,
                Event::LoadOrder { .. } => self.orders_loaded += 1,
                Event::DeliverOrder { .. } => self.orders_delivered += 1,
                Event::ArrivedAtNode { last_edge, .. } => {
                    self.edges_traveled += 1;
                    self.distance_traveled += last_edge.duration();
                }
                Event::ArrivedAtEdge { .. } => {}
            }
        }
        self.ticks_run += 1;
    }

    /// Share of received orders that reached their customer, in percent
    pub fn delivery_rate(&self) -> f64 {
        if self.orders_received == 0 {
            return 0.0;
        }
        self.orders_delivered as f64 / self.orders_received as f64 * 100.0
    }
}

/// Logs the final state of a run
pub fn log_summary(tick: Tick, stats: &SimulationStats, scores: &BTreeMap<RatingCriteria, f64>) {
    info!("Tick: {}", tick);
    info!("Vehicles spawned: {}", stats.vehicles_spawned);
    info!("Orders received: {}", stats.orders_received);
    info!("Orders loaded: {}", stats.orders_loaded);
    info!("Orders delivered: {}", stats.orders_delivered);
    info!("Distance traveled: {}", stats.distance_traveled);
    info!("Delivery rate: {:.1}%", stats.delivery_rate());
    for (criteria, score) in scores {
        info!("Score {}: {:.4}", criteria, score);
    }
}
