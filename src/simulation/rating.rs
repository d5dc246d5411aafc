//! Raters turn the event stream of a run into scores in `[0, 1]`
//!
//! Each rater is a plain accumulator: it only ever sees the events handed to
//! [`Rater::on_tick`] and keeps running totals. Factories hold the
//! configuration so a fresh rater can be created for every run.

use log::warn;
use std::fmt;
use std::sync::Arc;

use super::error::{Result, SimError};
use super::event::Event;
use super::path::PathCalculator;
use super::types::Tick;

/// The aspects a simulation run is scored on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RatingCriteria {
    InTime,
    TravelDistance,
    AmountDelivered,
}

impl fmt::Display for RatingCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RatingCriteria::InTime => "IN_TIME",
            RatingCriteria::TravelDistance => "TRAVEL_DISTANCE",
            RatingCriteria::AmountDelivered => "AMOUNT_DELIVERED",
        };
        f.write_str(name)
    }
}

pub trait Rater: Send {
    fn criteria(&self) -> RatingCriteria;

    /// Folds one tick's events into the running totals
    fn on_tick(&mut self, events: &[Event], tick: Tick);

    /// Current score in `[0, 1]`; 0 while there is nothing to compare against
    fn score(&self) -> f64;
}

/// Creates fresh raters for consecutive runs
pub trait RaterFactory: Send + Sync {
    fn criteria(&self) -> RatingCriteria;

    fn create(&self) -> Box<dyn Rater>;
}

/// Scores how close deliveries land to their expected window
///
/// Every received order first counts as `max_ticks_off` late; its delivery
/// replaces that with the real, clamped deviation.
#[derive(Debug, Clone)]
pub struct InTimeRater {
    ignored_ticks_off: i64,
    max_ticks_off: i64,
    max_total_ticks_off: f64,
    actual_total_ticks_off: f64,
}

impl InTimeRater {
    pub fn ignored_ticks_off(&self) -> i64 {
        self.ignored_ticks_off
    }

    pub fn max_ticks_off(&self) -> i64 {
        self.max_ticks_off
    }

    pub fn actual_total_ticks_off(&self) -> f64 {
        self.actual_total_ticks_off
    }

    pub fn max_total_ticks_off(&self) -> f64 {
        self.max_total_ticks_off
    }

    /// Ticks outside the grace window around `[start, end]`, at most `max_ticks_off`
    fn ticks_off(&self, delivered: Tick, start: Tick, end: Tick) -> i64 {
        let late_limit = end + self.ignored_ticks_off;
        let early_limit = start - self.ignored_ticks_off;
        let off = if delivered > late_limit {
            delivered - late_limit
        } else if delivered < early_limit {
            early_limit - delivered
        } else {
            0
        };
        off.min(self.max_ticks_off)
    }
}

impl Rater for InTimeRater {
    fn criteria(&self) -> RatingCriteria {
        RatingCriteria::InTime
    }

    fn on_tick(&mut self, events: &[Event], _tick: Tick) {
        for event in events {
            match event {
                Event::OrderReceived { .. } => {
                    self.max_total_ticks_off += self.max_ticks_off as f64;
                    self.actual_total_ticks_off += self.max_ticks_off as f64;
                }
                Event::DeliverOrder { tick, order, .. } => {
                    let delivered = order.actual_delivery_tick().unwrap_or(*tick);
                    let window = order.delivery_interval();
                    let off = self.ticks_off(delivered, window.start(), window.end());
                    self.actual_total_ticks_off -= self.max_ticks_off as f64;
                    self.actual_total_ticks_off += off as f64;
                }
                _ => {}
            }
        }
    }

    fn score(&self) -> f64 {
        if self.max_total_ticks_off == 0.0 {
            return 0.0;
        }
        (1.0 - self.actual_total_ticks_off / self.max_total_ticks_off).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone)]
pub struct InTimeRaterFactory {
    ignored_ticks_off: i64,
    max_ticks_off: i64,
}

impl InTimeRaterFactory {
    pub fn builder() -> InTimeRaterFactoryBuilder {
        InTimeRaterFactoryBuilder::default()
    }

    pub fn ignored_ticks_off(&self) -> i64 {
        self.ignored_ticks_off
    }

    pub fn max_ticks_off(&self) -> i64 {
        self.max_ticks_off
    }

    /// Concrete rater, for callers that want more than the trait exposes
    pub fn create_in_time(&self) -> InTimeRater {
        InTimeRater {
            ignored_ticks_off: self.ignored_ticks_off,
            max_ticks_off: self.max_ticks_off,
            max_total_ticks_off: 0.0,
            actual_total_ticks_off: 0.0,
        }
    }
}

impl RaterFactory for InTimeRaterFactory {
    fn criteria(&self) -> RatingCriteria {
        RatingCriteria::InTime
    }

    fn create(&self) -> Box<dyn Rater> {
        Box::new(self.create_in_time())
    }
}

#[derive(Debug, Clone)]
pub struct InTimeRaterFactoryBuilder {
    ignored_ticks_off: i64,
    max_ticks_off: i64,
}

impl Default for InTimeRaterFactoryBuilder {
    fn default() -> Self {
        Self {
            ignored_ticks_off: 5,
            max_ticks_off: 25,
        }
    }
}

impl InTimeRaterFactoryBuilder {
    pub fn ignored_ticks_off(mut self, ignored_ticks_off: i64) -> Self {
        self.ignored_ticks_off = ignored_ticks_off;
        self
    }

    pub fn max_ticks_off(mut self, max_ticks_off: i64) -> Self {
        self.max_ticks_off = max_ticks_off;
        self
    }

    pub fn build(self) -> Result<InTimeRaterFactory> {
        if self.ignored_ticks_off < 0 {
            return Err(SimError::InvalidParameter(format!(
                "ignored_ticks_off must not be negative, got {}",
                self.ignored_ticks_off
            )));
        }
        if self.max_ticks_off <= 0 {
            return Err(SimError::InvalidParameter(format!(
                "max_ticks_off must be positive, got {}",
                self.max_ticks_off
            )));
        }
        Ok(InTimeRaterFactory {
            ignored_ticks_off: self.ignored_ticks_off,
            max_ticks_off: self.max_ticks_off,
        })
    }
}

/// Compares the distance actually driven against a round trip per delivery
pub struct TravelDistanceRater {
    path_calculator: Arc<dyn PathCalculator>,
    factor: f64,
    actual_distance: f64,
    worst_distance: f64,
}

impl TravelDistanceRater {
    pub fn actual_distance(&self) -> f64 {
        self.actual_distance
    }

    pub fn worst_distance(&self) -> f64 {
        self.worst_distance
    }
}

impl Rater for TravelDistanceRater {
    fn criteria(&self) -> RatingCriteria {
        RatingCriteria::TravelDistance
    }

    fn on_tick(&mut self, events: &[Event], _tick: Tick) {
        for event in events {
            match event {
                Event::ArrivedAtNode { last_edge, .. } => {
                    self.actual_distance += last_edge.duration() as f64;
                }
                Event::DeliverOrder { node, order, .. } => {
                    match self.path_calculator.path_duration(order.restaurant(), *node) {
                        Ok(one_way) => self.worst_distance += 2.0 * one_way as f64,
                        Err(err) => warn!(
                            "No baseline for order {:?} delivered at {}: {}",
                            order.id(),
                            node,
                            err
                        ),
                    }
                }
                _ => {}
            }
        }
    }

    fn score(&self) -> f64 {
        let limit = self.worst_distance * self.factor;
        if 0.0 <= self.actual_distance && self.actual_distance < limit {
            1.0 - self.actual_distance / limit
        } else {
            0.0
        }
    }
}

#[derive(Clone)]
pub struct TravelDistanceRaterFactory {
    path_calculator: Arc<dyn PathCalculator>,
    factor: f64,
}

impl TravelDistanceRaterFactory {
    pub fn builder(path_calculator: Arc<dyn PathCalculator>) -> TravelDistanceRaterFactoryBuilder {
        TravelDistanceRaterFactoryBuilder {
            path_calculator,
            factor: 0.5,
        }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn create_travel_distance(&self) -> TravelDistanceRater {
        TravelDistanceRater {
            path_calculator: Arc::clone(&self.path_calculator),
            factor: self.factor,
            actual_distance: 0.0,
            worst_distance: 0.0,
        }
    }
}

impl RaterFactory for TravelDistanceRaterFactory {
    fn criteria(&self) -> RatingCriteria {
        RatingCriteria::TravelDistance
    }

    fn create(&self) -> Box<dyn Rater> {
        Box::new(self.create_travel_distance())
    }
}

pub struct TravelDistanceRaterFactoryBuilder {
    path_calculator: Arc<dyn PathCalculator>,
    factor: f64,
}

impl TravelDistanceRaterFactoryBuilder {
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn build(self) -> Result<TravelDistanceRaterFactory> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(SimError::InvalidParameter(format!(
                "factor must be a non-negative number, got {}",
                self.factor
            )));
        }
        Ok(TravelDistanceRaterFactory {
            path_calculator: self.path_calculator,
            factor: self.factor,
        })
    }
}

/// Scores the share of received orders that got delivered
///
/// Up to `(1 - factor)` of all received orders may stay undelivered before
/// the score drops to 0.
#[derive(Debug, Clone)]
pub struct AmountDeliveredRater {
    factor: f64,
    received: u64,
    delivered: u64,
}

impl AmountDeliveredRater {
    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

impl Rater for AmountDeliveredRater {
    fn criteria(&self) -> RatingCriteria {
        RatingCriteria::AmountDelivered
    }

    fn on_tick(&mut self, events: &[Event], _tick: Tick) {
        for event in events {
            match event {
                Event::OrderReceived { .. } => self.received += 1,
                Event::DeliverOrder { .. } => self.delivered += 1,
                _ => {}
            }
        }
    }

    fn score(&self) -> f64 {
        if self.received == 0 {
            return 0.0;
        }
        let undelivered = self.received.saturating_sub(self.delivered) as f64;
        let tolerated = self.received as f64 * (1.0 - self.factor);
        if undelivered >= tolerated {
            return 0.0;
        }
        1.0 - undelivered / tolerated
    }
}

#[derive(Debug, Clone)]
pub struct AmountDeliveredRaterFactory {
    factor: f64,
}

impl AmountDeliveredRaterFactory {
    pub fn builder() -> AmountDeliveredRaterFactoryBuilder {
        AmountDeliveredRaterFactoryBuilder { factor: 0.99 }
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn create_amount_delivered(&self) -> AmountDeliveredRater {
        AmountDeliveredRater {
            factor: self.factor,
            received: 0,
            delivered: 0,
        }
    }
}

impl RaterFactory for AmountDeliveredRaterFactory {
    fn criteria(&self) -> RatingCriteria {
        RatingCriteria::AmountDelivered
    }

    fn create(&self) -> Box<dyn Rater> {
        Box::new(self.create_amount_delivered())
    }
}

#[derive(Debug, Clone)]
pub struct AmountDeliveredRaterFactoryBuilder {
    factor: f64,
}

impl AmountDeliveredRaterFactoryBuilder {
    pub fn factor(mut self, factor: f64) -> Self {
        self.factor = factor;
        self
    }

    pub fn build(self) -> Result<AmountDeliveredRaterFactory> {
        if !(0.0..1.0).contains(&self.factor) {
            return Err(SimError::InvalidParameter(format!(
                "factor must be in [0, 1), got {}",
                self.factor
            )));
        }
        Ok(AmountDeliveredRaterFactory {
            factor: self.factor,
        })
    }
}
