//! Output of one acquisition workflow.

use std::collections::HashSet;

use crate::{MapBoundingBox, WayId};

/// Bounding box plus the ordered ways collected by a workflow.
///
/// Nodes are not listed here; they are reachable through each way's node
/// list in the [`EntityStore`](crate::EntityStore) that produced the handles.
///
/// # Examples
/// ```
/// use mapsnap_core::{EntityStore, QueryResult};
///
/// let mut store = EntityStore::new();
/// let mut result = QueryResult::new();
/// let way = store.get_way("1");
/// assert!(result.push_way(way));
/// assert!(!result.push_way(way));
/// assert_eq!(result.len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryResult {
    /// Area covered by the result.
    pub bbox: MapBoundingBox,
    /// Collected ways in discovery order.
    pub ways: Vec<WayId>,
}

impl QueryResult {
    /// An empty result with an empty bounding box.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty result covering `bbox`.
    #[must_use]
    pub const fn with_bbox(bbox: MapBoundingBox) -> Self {
        Self {
            bbox,
            ways: Vec::new(),
        }
    }

    /// Number of collected ways.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ways.len()
    }

    /// Returns true when no ways were collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ways.is_empty()
    }

    /// Returns true when `way` is already listed.
    #[must_use]
    pub fn contains(&self, way: WayId) -> bool {
        self.ways.contains(&way)
    }

    /// Append `way` unless already listed. Returns whether it was added.
    ///
    /// Scans the list; bulk appends should go through
    /// [`merge_ways`](Self::merge_ways) or track membership themselves.
    pub fn push_way(&mut self, way: WayId) -> bool {
        if self.contains(way) {
            return false;
        }
        self.ways.push(way);
        true
    }

    /// Append every way from `other` not already listed, keeping the
    /// existing ways and their order untouched. Returns the number added.
    pub fn merge_ways(&mut self, other: &Self) -> usize {
        let mut listed: HashSet<WayId> = self.ways.iter().copied().collect();
        let before = self.ways.len();
        self.ways
            .extend(other.ways.iter().copied().filter(|way| listed.insert(*way)));
        self.ways.len() - before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntityStore;
    use rstest::rstest;

    #[rstest]
    fn new_result_is_empty() {
        let result = QueryResult::new();
        assert!(result.is_empty());
        assert!(result.bbox.is_empty());
    }

    #[rstest]
    fn merge_preserves_existing_order() {
        let mut store = EntityStore::new();
        let a = store.get_way("a");
        let b = store.get_way("b");
        let c = store.get_way("c");

        let mut existing = QueryResult::new();
        existing.push_way(b);
        existing.push_way(a);

        let mut incoming = QueryResult::new();
        incoming.push_way(a);
        incoming.push_way(c);

        assert_eq!(existing.merge_ways(&incoming), 1);
        assert_eq!(existing.ways, vec![b, a, c]);
    }

    #[rstest]
    fn merge_drops_duplicates_within_the_incoming_list() {
        let mut store = EntityStore::new();
        let handles: Vec<_> = (0..500).map(|n| store.get_way(&n.to_string())).collect();

        let mut existing = QueryResult::new();
        existing.ways.extend(handles.iter().step_by(2).copied());

        let mut incoming = QueryResult::new();
        incoming.ways.extend(handles.iter().rev().copied());
        incoming.ways.extend(handles.iter().copied());

        assert_eq!(existing.merge_ways(&incoming), 250);
        assert_eq!(existing.len(), 500);
        let expected: Vec<_> = handles
            .iter()
            .step_by(2)
            .chain(handles.iter().skip(1).step_by(2).rev())
            .copied()
            .collect();
        assert_eq!(existing.ways, expected);
    }
}
