//! Core value types for the delivery simulation
//!
//! These are plain `Copy` types used as stable keys throughout the crate.

use std::fmt;
use std::ops::{Add, Sub};

use super::error::{Result, SimError};

/// A discrete simulation time step
pub type Tick = i64;

/// A wrapper type for vehicle IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VehicleId(pub usize);

/// A wrapper type for order IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OrderId(pub u64);

/// A 2D integer position in a region
///
/// Ordered lexicographically by `x`, then `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Location {
    pub x: i32,
    pub y: i32,
}

impl Location {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl Add for Location {
    type Output = Location;

    fn add(self, other: Location) -> Location {
        Location::new(self.x + other.x, self.y + other.y)
    }
}

impl Sub for Location {
    type Output = Location;

    fn sub(self, other: Location) -> Location {
        Location::new(self.x - other.x, self.y - other.y)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// How the distance between two locations is measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    Euclidean,
    Manhattan,
    /// Maximum of the per-axis distances
    Chessboard,
}

impl DistanceMetric {
    pub fn distance(&self, a: Location, b: Location) -> f64 {
        let dx = (a.x as f64 - b.x as f64).abs();
        let dy = (a.y as f64 - b.y as f64).abs();
        match self {
            DistanceMetric::Euclidean => (dx * dx + dy * dy).sqrt(),
            DistanceMetric::Manhattan => dx + dy,
            DistanceMetric::Chessboard => dx.max(dy),
        }
    }
}

/// An expected delivery window, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickInterval {
    start: Tick,
    end: Tick,
}

impl TickInterval {
    pub fn new(start: Tick, end: Tick) -> Result<Self> {
        if start > end {
            return Err(SimError::InvalidParameter(format!(
                "tick interval start {start} is after end {end}"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Tick {
        self.start
    }

    pub fn end(&self) -> Tick {
        self.end
    }

    pub fn duration(&self) -> Tick {
        self.end - self.start
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.start <= tick && tick <= self.end
    }
}

/// Key of an undirected edge, endpoints in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeKey {
    pub a: Location,
    pub b: Location,
}

impl EdgeKey {
    /// Builds the key for the edge between `x` and `y`, in either order
    pub fn between(x: Location, y: Location) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    /// The endpoint opposite to `from`
    pub fn other(&self, from: Location) -> Location {
        if from == self.a {
            self.b
        } else {
            self.a
        }
    }
}

/// Addresses a graph component whose occupancy is tracked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ComponentRef {
    Node(Location),
    Edge(EdgeKey),
}
