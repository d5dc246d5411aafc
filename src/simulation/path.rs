//! Shortest paths over a region, weighted by edge duration

use log::debug;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Mutex};

use super::error::{Result, SimError};
use super::region::Region;
use super::types::Location;

/// Computes routes between nodes of a region
///
/// Implementations are read-only with respect to the region and must be
/// safe to share between the vehicle manager and raters.
pub trait PathCalculator: Send + Sync {
    /// Locations visited on a minimum-duration path, excluding `from` and
    /// ending with `to`. Empty when `from == to`.
    fn get_path(&self, from: Location, to: Location) -> Result<Vec<Location>>;

    /// Total duration of the path returned by [`PathCalculator::get_path`]
    fn path_duration(&self, from: Location, to: Location) -> Result<u64>;
}

/// Dijkstra over edge durations
///
/// Equal-cost alternatives are resolved by popping the smallest location
/// first, so repeated queries always yield the same path.
pub struct DijkstraPathCalculator {
    region: Arc<Region>,
}

impl DijkstraPathCalculator {
    pub fn new(region: Arc<Region>) -> Self {
        Self { region }
    }

    pub fn region(&self) -> &Arc<Region> {
        &self.region
    }

    fn search(&self, from: Location, to: Location) -> Result<(u64, Vec<Location>)> {
        for location in [from, to] {
            if self.region.node(location).is_none() {
                return Err(SimError::NodeNotFound(location));
            }
        }
        if from == to {
            return Ok((0, Vec::new()));
        }

        let graph = self.region.graph();
        let mut best: HashMap<Location, u64> = HashMap::new();
        let mut previous: HashMap<Location, Location> = HashMap::new();
        let mut heap = BinaryHeap::new();

        best.insert(from, 0);
        heap.push(Reverse((0u64, from)));

        while let Some(Reverse((cost, location))) = heap.pop() {
            if location == to {
                break;
            }
            if best.get(&location).is_some_and(|known| cost > *known) {
                continue;
            }
            for (_, next, duration) in graph.edges(location) {
                let candidate = cost + *duration;
                let improves = best.get(&next).is_none_or(|known| candidate < *known);
                if improves {
                    best.insert(next, candidate);
                    previous.insert(next, location);
                    heap.push(Reverse((candidate, next)));
                }
            }
        }

        let total = *best.get(&to).ok_or(SimError::NoPath { from, to })?;

        let mut path = vec![to];
        let mut cursor = to;
        while let Some(prev) = previous.get(&cursor) {
            if *prev == from {
                break;
            }
            path.push(*prev);
            cursor = *prev;
        }
        path.reverse();
        Ok((total, path))
    }
}

impl PathCalculator for DijkstraPathCalculator {
    fn get_path(&self, from: Location, to: Location) -> Result<Vec<Location>> {
        self.search(from, to).map(|(_, path)| path)
    }

    fn path_duration(&self, from: Location, to: Location) -> Result<u64> {
        self.search(from, to).map(|(total, _)| total)
    }
}

/// Memoizes another calculator's answers
///
/// The cache is cleared once it holds `capacity` entries.
pub struct CachedPathCalculator {
    inner: Arc<dyn PathCalculator>,
    region: Arc<Region>,
    capacity: usize,
    path_cache: Mutex<HashMap<(Location, Location), Vec<Location>>>,
}

impl CachedPathCalculator {
    pub const DEFAULT_CAPACITY: usize = 1024;

    pub fn new(inner: Arc<dyn PathCalculator>, region: Arc<Region>) -> Self {
        Self::with_capacity(inner, region, Self::DEFAULT_CAPACITY)
    }

    pub fn with_capacity(
        inner: Arc<dyn PathCalculator>,
        region: Arc<Region>,
        capacity: usize,
    ) -> Self {
        Self {
            inner,
            region,
            capacity: capacity.max(1),
            path_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn cached_len(&self) -> usize {
        self.path_cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl PathCalculator for CachedPathCalculator {
    fn get_path(&self, from: Location, to: Location) -> Result<Vec<Location>> {
        if let Ok(cache) = self.path_cache.lock() {
            if let Some(path) = cache.get(&(from, to)) {
                return Ok(path.clone());
            }
        }

        let path = self.inner.get_path(from, to)?;

        if let Ok(mut cache) = self.path_cache.lock() {
            if cache.len() >= self.capacity {
                debug!("Path cache full ({} entries), clearing", cache.len());
                cache.clear();
            }
            cache.insert((from, to), path.clone());
        }
        Ok(path)
    }

    fn path_duration(&self, from: Location, to: Location) -> Result<u64> {
        let path = self.get_path(from, to)?;
        path_duration_along(&self.region, from, &path)
    }
}

/// Sums edge durations along `path`, starting at `from`
pub fn path_duration_along(region: &Region, from: Location, path: &[Location]) -> Result<u64> {
    let mut total = 0;
    let mut last = from;
    for next in path {
        let edge = region
            .edge(last, *next)
            .ok_or(SimError::NoPath { from: last, to: *next })?;
        total += edge.duration();
        last = *next;
    }
    Ok(total)
}
