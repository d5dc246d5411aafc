//! Region graph: nodes, edges, and the builder that freezes them
//!
//! A [`Region`] is built once through a [`RegionBuilder`] and never changes
//! afterwards, so it can be shared behind an `Arc` by the path calculator,
//! the vehicle manager and the raters.

use petgraph::graphmap::UnGraphMap;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use super::error::{Result, SimError};
use super::types::{DistanceMetric, EdgeKey, Location};

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(0);

/// Identity of the region a node or edge was declared for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(u64);

impl RegionId {
    fn fresh() -> Self {
        RegionId(NEXT_REGION_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Restaurants a region can host, each with a fixed menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RestaurantPreset {
    PizzaPalace,
    BurgerBarn,
    SushiCorner,
    TacoTruck,
    CurryHouse,
}

impl RestaurantPreset {
    pub const ALL: [RestaurantPreset; 5] = [
        RestaurantPreset::PizzaPalace,
        RestaurantPreset::BurgerBarn,
        RestaurantPreset::SushiCorner,
        RestaurantPreset::TacoTruck,
        RestaurantPreset::CurryHouse,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RestaurantPreset::PizzaPalace => "Pizza Palace",
            RestaurantPreset::BurgerBarn => "Burger Barn",
            RestaurantPreset::SushiCorner => "Sushi Corner",
            RestaurantPreset::TacoTruck => "Taco Truck",
            RestaurantPreset::CurryHouse => "Curry House",
        }
    }

    pub fn available_food(&self) -> &'static [&'static str] {
        match self {
            RestaurantPreset::PizzaPalace => {
                &["Margherita", "Salami", "Funghi", "Quattro Formaggi", "Calzone"]
            }
            RestaurantPreset::BurgerBarn => {
                &["Cheeseburger", "Veggie Burger", "Fries", "Onion Rings"]
            }
            RestaurantPreset::SushiCorner => &["Maki", "Nigiri", "Sashimi", "Miso Soup"],
            RestaurantPreset::TacoTruck => &["Taco", "Burrito", "Quesadilla", "Nachos"],
            RestaurantPreset::CurryHouse => &["Chicken Curry", "Dal", "Naan", "Samosa"],
        }
    }
}

/// Variant-specific payload of a node
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Plain,
    Neighborhood,
    Restaurant { available_food: Vec<String> },
}

/// A node in a region
///
/// Equality and hashing look at name, location and connections only;
/// ordering is by location.
#[derive(Debug, Clone)]
pub struct Node {
    region: RegionId,
    name: String,
    location: Location,
    connections: BTreeSet<Location>,
    kind: NodeKind,
}

impl Node {
    pub fn new(
        region: RegionId,
        name: impl Into<String>,
        location: Location,
        connections: BTreeSet<Location>,
        kind: NodeKind,
    ) -> Self {
        Self {
            region,
            name: name.into(),
            location,
            connections,
            kind,
        }
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location(&self) -> Location {
        self.location
    }

    /// Locations of all nodes this node shares an edge with
    pub fn connections(&self) -> &BTreeSet<Location> {
        &self.connections
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn is_restaurant(&self) -> bool {
        matches!(self.kind, NodeKind::Restaurant { .. })
    }

    pub fn is_neighborhood(&self) -> bool {
        matches!(self.kind, NodeKind::Neighborhood)
    }

    /// Menu of a restaurant node, `None` for any other kind
    pub fn available_food(&self) -> Option<&[String]> {
        match &self.kind {
            NodeKind::Restaurant { available_food } => Some(available_food),
            _ => None,
        }
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.location == other.location
            && self.connections == other.connections
    }
}

impl Eq for Node {}

impl Hash for Node {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.location.hash(state);
        self.connections.hash(state);
    }
}

impl PartialOrd for Node {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Node {
    fn cmp(&self, other: &Self) -> Ordering {
        self.location
            .cmp(&other.location)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.connections.cmp(&other.connections))
    }
}

/// An undirected, weighted edge between two nodes
#[derive(Debug, Clone)]
pub struct Edge {
    region: RegionId,
    name: String,
    location_a: Location,
    location_b: Location,
    duration: u64,
}

impl Edge {
    /// Fails unless `location_a <= location_b`
    pub fn new(
        region: RegionId,
        name: impl Into<String>,
        location_a: Location,
        location_b: Location,
        duration: u64,
    ) -> Result<Self> {
        if location_a > location_b {
            return Err(SimError::InvalidEdge {
                a: location_a,
                b: location_b,
            });
        }
        Ok(Self {
            region,
            name: name.into(),
            location_a,
            location_b,
            duration,
        })
    }

    pub fn region(&self) -> RegionId {
        self.region
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn location_a(&self) -> Location {
        self.location_a
    }

    pub fn location_b(&self) -> Location {
        self.location_b
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey {
            a: self.location_a,
            b: self.location_b,
        }
    }

    /// Ticks needed to traverse this edge
    pub fn duration(&self) -> u64 {
        self.duration
    }

    pub fn connects(&self, location: Location) -> bool {
        self.location_a == location || self.location_b == location
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.location_a.hash(state);
        self.location_b.hash(state);
        self.duration.hash(state);
    }
}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.location_a
            .cmp(&other.location_a)
            .then_with(|| self.location_b.cmp(&other.location_b))
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.duration.cmp(&other.duration))
    }
}

/// Immutable graph of delivery locations
#[derive(Debug, Clone)]
pub struct Region {
    id: RegionId,
    nodes: BTreeMap<Location, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
    graph: UnGraphMap<Location, u64>,
    metric: DistanceMetric,
}

impl Region {
    pub fn builder() -> RegionBuilder {
        RegionBuilder::new()
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn node(&self, location: Location) -> Option<&Node> {
        self.nodes.get(&location)
    }

    /// Looks up the edge between two locations, in either order
    pub fn edge(&self, x: Location, y: Location) -> Option<&Edge> {
        self.edges.get(&EdgeKey::between(x, y))
    }

    pub fn edge_by_key(&self, key: EdgeKey) -> Option<&Edge> {
        self.edges.get(&key)
    }

    pub fn edge_between(&self, x: &Node, y: &Node) -> Option<&Edge> {
        self.edge(x.location(), y.location())
    }

    /// All nodes, ordered by location
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// All edges, ordered by their endpoints
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn restaurants(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.is_restaurant())
    }

    pub fn neighborhoods(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|node| node.is_neighborhood())
    }

    pub fn adjacent_nodes(&self, location: Location) -> Vec<&Node> {
        self.node(location)
            .map(|node| {
                node.connections()
                    .iter()
                    .filter_map(|other| self.node(*other))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn adjacent_edges(&self, location: Location) -> Vec<&Edge> {
        self.node(location)
            .map(|node| {
                node.connections()
                    .iter()
                    .filter_map(|other| self.edge(location, *other))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn distance_metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn distance(&self, a: Location, b: Location) -> f64 {
        self.metric.distance(a, b)
    }

    /// Adjacency graph weighted by edge duration
    pub fn graph(&self) -> &UnGraphMap<Location, u64> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        self.nodes == other.nodes && self.edges == other.edges
    }
}

/// Collects nodes and edges for a single region and validates every insert
#[derive(Debug)]
pub struct RegionBuilder {
    id: RegionId,
    metric: DistanceMetric,
    nodes: BTreeMap<Location, Node>,
    edges: BTreeMap<EdgeKey, Edge>,
}

impl Default for RegionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RegionBuilder {
    pub fn new() -> Self {
        Self {
            id: RegionId::fresh(),
            metric: DistanceMetric::default(),
            nodes: BTreeMap::new(),
            edges: BTreeMap::new(),
        }
    }

    /// Identity that nodes and edges must carry to be accepted here
    pub fn id(&self) -> RegionId {
        self.id
    }

    pub fn distance_metric(&mut self, metric: DistanceMetric) -> &mut Self {
        self.metric = metric;
        self
    }

    /// Inserts a node declared for this region
    pub fn put_node(&mut self, node: Node) -> Result<&mut Self> {
        if node.region() != self.id {
            return Err(SimError::InvalidRegion(format!(
                "node '{}' at {} belongs to another region",
                node.name(),
                node.location()
            )));
        }
        if self.nodes.contains_key(&node.location()) {
            return Err(SimError::InvalidRegion(format!(
                "duplicate node at {}",
                node.location()
            )));
        }
        self.nodes.insert(node.location(), node);
        Ok(self)
    }

    /// Inserts an edge declared for this region whose endpoints already exist
    pub fn put_edge(&mut self, edge: Edge) -> Result<&mut Self> {
        if edge.region() != self.id {
            return Err(SimError::InvalidRegion(format!(
                "edge '{}' belongs to another region",
                edge.name()
            )));
        }
        for endpoint in [edge.location_a(), edge.location_b()] {
            if !self.nodes.contains_key(&endpoint) {
                return Err(SimError::InvalidRegion(format!(
                    "edge '{}' references {endpoint}, which is not part of the region",
                    edge.name()
                )));
            }
        }
        if self.edges.contains_key(&edge.key()) {
            return Err(SimError::InvalidRegion(format!(
                "duplicate edge between {} and {}",
                edge.location_a(),
                edge.location_b()
            )));
        }
        self.edges.insert(edge.key(), edge);
        Ok(self)
    }

    pub fn add_node(&mut self, name: impl Into<String>, location: Location) -> Result<&mut Self> {
        let node = Node::new(self.id, name, location, BTreeSet::new(), NodeKind::Plain);
        self.put_node(node)
    }

    pub fn add_neighborhood(
        &mut self,
        name: impl Into<String>,
        location: Location,
    ) -> Result<&mut Self> {
        let node = Node::new(
            self.id,
            name,
            location,
            BTreeSet::new(),
            NodeKind::Neighborhood,
        );
        self.put_node(node)
    }

    /// Adds a restaurant named and stocked after `preset`
    pub fn add_restaurant(
        &mut self,
        location: Location,
        preset: RestaurantPreset,
    ) -> Result<&mut Self> {
        let available_food = preset
            .available_food()
            .iter()
            .map(|food| food.to_string())
            .collect();
        let node = Node::new(
            self.id,
            preset.name(),
            location,
            BTreeSet::new(),
            NodeKind::Restaurant { available_food },
        );
        self.put_node(node)
    }

    /// Adds an edge whose duration is the rounded-up distance between its endpoints
    pub fn add_edge(
        &mut self,
        name: impl Into<String>,
        x: Location,
        y: Location,
    ) -> Result<&mut Self> {
        let duration = self.metric.distance(x, y).ceil() as u64;
        self.add_edge_with_duration(name, x, y, duration)
    }

    /// Adds an edge between `x` and `y` in either order
    pub fn add_edge_with_duration(
        &mut self,
        name: impl Into<String>,
        x: Location,
        y: Location,
        duration: u64,
    ) -> Result<&mut Self> {
        let key = EdgeKey::between(x, y);
        let edge = Edge::new(self.id, name, key.a, key.b, duration)?;
        self.put_edge(edge)
    }

    /// Freezes the region, deriving every node's connections from the edges
    pub fn build(self) -> Result<Region> {
        let RegionBuilder {
            id,
            metric,
            mut nodes,
            edges,
        } = self;

        for node in nodes.values() {
            if let Some(missing) = node
                .connections()
                .iter()
                .find(|location| !nodes.contains_key(location))
            {
                return Err(SimError::InvalidRegion(format!(
                    "node '{}' is connected to {missing}, which is not part of the region",
                    node.name()
                )));
            }
        }

        let mut graph = UnGraphMap::new();
        for location in nodes.keys() {
            graph.add_node(*location);
        }
        for (key, edge) in &edges {
            graph.add_edge(key.a, key.b, edge.duration());
            if let Some(node) = nodes.get_mut(&key.a) {
                node.connections.insert(key.b);
            }
            if let Some(node) = nodes.get_mut(&key.b) {
                node.connections.insert(key.a);
            }
        }

        Ok(Region {
            id,
            nodes,
            edges,
            graph,
            metric,
        })
    }
}
