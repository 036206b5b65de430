//! Identity-mapped arena of nodes and ways.
//!
//! Every node and way is created at most once per external ID. Callers hold
//! [`NodeId`] / [`WayId`] handles, which stay valid for the life of the store
//! because nothing is ever removed.

use std::collections::{BTreeSet, HashMap};

use geo::{Coord, LineString};

use crate::entity::{Node, NodeId, Way, WayId, WayKind};
use crate::MapPoint;

/// Endpoints of an untagged way closer than this (in degrees) form a ring.
pub const ENDPOINT_EPSILON: f64 = 0.001;

/// Owner of every entity seen by an acquisition session.
///
/// # Examples
/// ```
/// use mapsnap_core::EntityStore;
///
/// let mut store = EntityStore::new();
/// let first = store.get_node("42");
/// let again = store.get_node("42");
/// assert_eq!(first, again);
/// assert_eq!(store.node_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    nodes: Vec<Node>,
    ways: Vec<Way>,
    node_index: HashMap<String, NodeId>,
    way_index: HashMap<String, WayId>,
}

impl EntityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the node registered under `id`, creating it on first use.
    pub fn get_node(&mut self, id: &str) -> NodeId {
        if let Some(existing) = self.node_index.get(id) {
            return *existing;
        }
        let handle = NodeId(self.nodes.len());
        self.nodes.push(Node::new(id.to_owned()));
        self.node_index.insert(id.to_owned(), handle);
        handle
    }

    /// Return the way registered under `id`, creating it on first use.
    pub fn get_way(&mut self, id: &str) -> WayId {
        if let Some(existing) = self.way_index.get(id) {
            return *existing;
        }
        let handle = WayId(self.ways.len());
        self.ways.push(Way::new(id.to_owned()));
        self.way_index.insert(id.to_owned(), handle);
        handle
    }

    /// Look up a node without creating it.
    #[must_use]
    pub fn find_node(&self, id: &str) -> Option<NodeId> {
        self.node_index.get(id).copied()
    }

    /// Look up a way without creating it.
    #[must_use]
    pub fn find_way(&self, id: &str) -> Option<WayId> {
        self.way_index.get(id).copied()
    }

    /// Borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was minted by a different store.
    #[must_use]
    #[expect(
        clippy::indexing_slicing,
        reason = "handles are only minted by this store and entities are never removed"
    )]
    pub fn node(&self, handle: NodeId) -> &Node {
        &self.nodes[handle.0]
    }

    /// Mutably borrow a node.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was minted by a different store.
    #[expect(
        clippy::indexing_slicing,
        reason = "handles are only minted by this store and entities are never removed"
    )]
    pub fn node_mut(&mut self, handle: NodeId) -> &mut Node {
        &mut self.nodes[handle.0]
    }

    /// Borrow a way.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was minted by a different store.
    #[must_use]
    #[expect(
        clippy::indexing_slicing,
        reason = "handles are only minted by this store and entities are never removed"
    )]
    pub fn way(&self, handle: WayId) -> &Way {
        &self.ways[handle.0]
    }

    /// Mutably borrow a way.
    ///
    /// # Panics
    ///
    /// Panics if `handle` was minted by a different store.
    #[expect(
        clippy::indexing_slicing,
        reason = "handles are only minted by this store and entities are never removed"
    )]
    pub fn way_mut(&mut self, handle: WayId) -> &mut Way {
        &mut self.ways[handle.0]
    }

    /// Number of registered nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of registered ways.
    #[must_use]
    pub fn way_count(&self) -> usize {
        self.ways.len()
    }

    /// Iterate over every way in creation order.
    pub fn ways(&self) -> impl Iterator<Item = (WayId, &Way)> {
        self.ways
            .iter()
            .enumerate()
            .map(|(index, way)| (WayId(index), way))
    }

    /// Iterate over every node in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(index, node)| (NodeId(index), node))
    }

    /// Locations of a way's member nodes, in order.
    pub fn way_locations(&self, handle: WayId) -> impl Iterator<Item = MapPoint> + '_ {
        self.way(handle)
            .nodes
            .iter()
            .map(|node| self.node(*node).location)
    }

    /// Returns true for ways tagged `highway` or whose endpoints are apart.
    ///
    /// A way with no member nodes is never a highway unless tagged.
    #[must_use]
    pub fn is_highway(&self, handle: WayId) -> bool {
        let way = self.way(handle);
        if way.has_highway_tag() {
            return true;
        }
        let (Some(first), Some(last)) = (way.nodes.first(), way.nodes.last()) else {
            return false;
        };
        let start = self.node(*first).location;
        let end = self.node(*last).location;
        start.distance_to(&end) > ENDPOINT_EPSILON
    }

    /// Returns true for closed rings.
    #[must_use]
    pub fn is_polygon(&self, handle: WayId) -> bool {
        !self.is_highway(handle)
    }

    /// Classify a way for rendering.
    #[must_use]
    pub fn way_kind(&self, handle: WayId) -> WayKind {
        if self.is_highway(handle) {
            WayKind::Highway
        } else {
            WayKind::Polygon
        }
    }

    /// Label anchor for a way.
    ///
    /// Highways use their middle node, or the midpoint of the two central
    /// nodes when the count is even. Polygons use the mean of all nodes.
    /// Ways without nodes have no centre.
    #[must_use]
    #[expect(
        clippy::float_arithmetic,
        clippy::cast_precision_loss,
        clippy::integer_division,
        clippy::integer_division_remainder_used,
        reason = "label anchors average coordinates over member counts far below 2^52"
    )]
    pub fn way_center(&self, handle: WayId) -> MapPoint {
        let nodes = &self.way(handle).nodes;
        if nodes.is_empty() {
            return MapPoint::NOWHERE;
        }
        if self.is_highway(handle) {
            let half = nodes.len() / 2;
            let Some(upper) = nodes.get(half).map(|node| self.node(*node).location) else {
                return MapPoint::NOWHERE;
            };
            if nodes.len() % 2 == 1 {
                return upper;
            }
            return half
                .checked_sub(1)
                .and_then(|index| nodes.get(index))
                .map_or(upper, |node| self.node(*node).location.midpoint(&upper));
        }
        let (sum_x, sum_y) = self
            .way_locations(handle)
            .fold((0.0, 0.0), |(x, y), point| (x + point.x, y + point.y));
        let count = nodes.len() as f64;
        MapPoint::new(sum_x / count, sum_y / count)
    }

    /// Located member nodes as a `geo` line string.
    #[must_use]
    pub fn way_line_string(&self, handle: WayId) -> LineString<f64> {
        self.way_locations(handle)
            .filter(|point| !point.is_nowhere())
            .map(Coord::from)
            .collect()
    }

    /// Distinct non-blank values of `key` across all ways, sorted.
    #[must_use]
    pub fn tag_values(&self, key: &str) -> Vec<&str> {
        self.ways
            .iter()
            .filter_map(|way| way.tags.get(key))
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Ways whose `key` tag equals `value`, ordered by external ID.
    #[must_use]
    pub fn ways_with_tag(&self, key: &str, value: &str) -> Vec<WayId> {
        self.sorted_ways(|way| way.tags.get(key).is_some_and(|found| found == value))
    }

    /// Ways lacking a `key` tag, ordered by external ID.
    #[must_use]
    pub fn ways_without_tag(&self, key: &str) -> Vec<WayId> {
        self.sorted_ways(|way| !way.tags.contains_key(key))
    }

    fn sorted_ways(&self, predicate: impl Fn(&Way) -> bool) -> Vec<WayId> {
        let mut matches: Vec<(&str, WayId)> = self
            .ways()
            .filter(|(_, way)| predicate(way))
            .map(|(handle, way)| (way.id(), handle))
            .collect();
        matches.sort_unstable_by(|left, right| left.0.cmp(right.0));
        matches.into_iter().map(|(_, handle)| handle).collect()
    }
}
