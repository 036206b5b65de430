//! Applies interpreter responses to an [`EntityStore`].
//!
//! A run drains every in-flight request in completion order, applies each
//! response, then hydrates member nodes that arrived without coordinates by
//! issuing chunked ID queries. Rounds repeat until nothing is left to fetch.

use std::collections::HashSet;

use futures_util::StreamExt;
use futures_util::stream::FuturesUnordered;
use mapsnap_core::{EntityStore, QueryResult, Tags, WayId};

use crate::document::{ResponseDocument, XmlElement};
use crate::query::{ElementType, QueryDocument, id_union_query};
use crate::transport::{QuerySource, RateLimitedTransport, TransportError};

/// Upper bound on node IDs per follow-up query.
pub const NODE_REQUEST_CHUNK_SIZE: usize = 50;

/// How responses feed the [`QueryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessMode {
    /// Grow the result's bounding box from node locations; ways are not
    /// collected.
    ExpandBoundingBox,
    /// Collect every way into the result; its bounding box is left alone.
    Populate,
}

/// Counters describing one processor run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessReport {
    /// Responses with an `osm` root that were applied.
    pub documents_applied: usize,
    /// Responses discarded for lacking an `osm` root.
    pub documents_discarded: usize,
    /// Node hydration queries issued after the initial batch.
    pub follow_up_queries: usize,
    /// Way elements applied.
    pub ways_seen: usize,
    /// Node elements applied.
    pub nodes_seen: usize,
}

/// Split `ids` into consecutive chunks of at most `size` entries.
///
/// A `size` of zero is treated as one.
///
/// # Examples
/// ```
/// use mapsnap_data::processor::chunk_node_ids;
///
/// let ids: Vec<String> = (0..137).map(|i| i.to_string()).collect();
/// let sizes: Vec<usize> = chunk_node_ids(&ids, 50).iter().map(Vec::len).collect();
/// assert_eq!(sizes, vec![50, 50, 37]);
/// ```
#[must_use]
pub fn chunk_node_ids(ids: &[String], size: usize) -> Vec<Vec<String>> {
    ids.chunks(size.max(1)).map(<[String]>::to_vec).collect()
}

/// Drives one processing run. Construct through [`ResponseProcessor::run`].
#[derive(Debug)]
pub struct ResponseProcessor {
    mode: ProcessMode,
    pending: Vec<String>,
    pending_set: HashSet<String>,
    requested: HashSet<String>,
    collected: HashSet<WayId>,
    report: ProcessReport,
}

impl ResponseProcessor {
    /// Execute `initial_queries` and apply every response to `store` and
    /// `result` until no unresolved member nodes remain.
    ///
    /// Each node ID is requested at most once per run, which bounds the
    /// number of rounds even when the interpreter omits nodes.
    ///
    /// # Errors
    ///
    /// Returns the first [`TransportError`] raised by any request. Requests
    /// still in flight are dropped and their permits returned.
    pub async fn run<S: QuerySource>(
        transport: &RateLimitedTransport<S>,
        store: &mut EntityStore,
        result: &mut QueryResult,
        mode: ProcessMode,
        initial_queries: Vec<QueryDocument>,
    ) -> Result<ProcessReport, TransportError> {
        let mut processor = Self {
            mode,
            pending: Vec::new(),
            pending_set: HashSet::new(),
            requested: HashSet::new(),
            collected: result.ways.iter().copied().collect(),
            report: ProcessReport::default(),
        };
        let mut in_flight: FuturesUnordered<_> = initial_queries
            .into_iter()
            .map(|query| dispatch(transport, query))
            .collect();

        loop {
            while let Some(outcome) = in_flight.next().await {
                processor.apply_document(store, result, outcome?);
            }
            let chunks = processor.take_follow_ups(store);
            if chunks.is_empty() {
                break;
            }
            for chunk in chunks {
                processor.report.follow_up_queries += 1;
                in_flight.push(dispatch(transport, id_union_query(&chunk, ElementType::Node)));
            }
        }

        let report = processor.report;
        log::info!(
            "processed {} responses ({} discarded) with {} follow-up queries: {} ways, {} nodes",
            report.documents_applied,
            report.documents_discarded,
            report.follow_up_queries,
            report.ways_seen,
            report.nodes_seen,
        );
        Ok(report)
    }

    fn apply_document(
        &mut self,
        store: &mut EntityStore,
        result: &mut QueryResult,
        mut document: ResponseDocument,
    ) {
        if document.osm_root().is_none() {
            log::warn!("discarding response without an osm root");
            log::debug!("discarded response: {}", document.to_xml_string());
            self.report.documents_discarded += 1;
            return;
        }
        let Some(root) = document.osm_root_mut() else {
            return;
        };
        root.remove_children_named("note");
        root.remove_children_named("meta");

        for way in root.children_named("way") {
            self.apply_way(store, result, way);
        }
        for node in root.children_named("node") {
            self.apply_node(store, result, node);
        }
        self.report.documents_applied += 1;
    }

    fn apply_way(&mut self, store: &mut EntityStore, result: &mut QueryResult, element: &XmlElement) {
        let Some(way_ref) = element.attribute("id") else {
            log::warn!("skipping way element without an id");
            return;
        };
        let way = store.get_way(way_ref);
        let known: HashSet<_> = store.way(way).nodes.iter().copied().collect();

        for member in element.children_named("nd") {
            let Some(node_ref) = member.attribute("ref") else {
                log::warn!("skipping member of way {way_ref} without a ref");
                continue;
            };
            let node = store.get_node(node_ref);
            if known.contains(&node) {
                continue;
            }
            store.node_mut(node).way = Some(way);
            store.way_mut(way).nodes.push(node);

            let location = store.node(node).location;
            if location.is_nowhere() {
                self.queue(node_ref);
            } else {
                store.way_mut(way).bbox.extend(&location);
            }
        }

        apply_tags(&mut store.way_mut(way).tags, element);
        if self.mode == ProcessMode::Populate && self.collected.insert(way) {
            result.ways.push(way);
        }
        self.report.ways_seen += 1;
    }

    fn apply_node(
        &mut self,
        store: &mut EntityStore,
        result: &mut QueryResult,
        element: &XmlElement,
    ) {
        let Some(node_ref) = element.attribute("id") else {
            log::warn!("skipping node element without an id");
            return;
        };
        let node = store.get_node(node_ref);
        let mut location = store.node(node).location;
        match parse_coordinate(element, "lat") {
            Some(lat) => location.y = lat,
            None => log::warn!("unable to read latitude of node {node_ref}"),
        }
        match parse_coordinate(element, "lon") {
            Some(lon) => location.x = lon,
            None => log::warn!("unable to read longitude of node {node_ref}"),
        }
        store.node_mut(node).location = location;

        if !location.is_nowhere() {
            if self.mode == ProcessMode::ExpandBoundingBox {
                result.bbox.extend(&location);
            }
            if let Some(way) = store.node(node).way {
                store.way_mut(way).bbox.extend(&location);
            }
        }

        apply_tags(&mut store.node_mut(node).tags, element);
        self.report.nodes_seen += 1;
    }

    fn queue(&mut self, node_ref: &str) {
        if self.pending_set.insert(node_ref.to_owned()) {
            self.pending.push(node_ref.to_owned());
        }
    }

    fn take_follow_ups(&mut self, store: &EntityStore) -> Vec<Vec<String>> {
        self.pending_set.clear();
        let mut unresolved = Vec::new();
        for node_ref in std::mem::take(&mut self.pending) {
            let located = store
                .find_node(&node_ref)
                .is_some_and(|node| !store.node(node).location.is_nowhere());
            if !located && self.requested.insert(node_ref.clone()) {
                unresolved.push(node_ref);
            }
        }
        chunk_node_ids(&unresolved, NODE_REQUEST_CHUNK_SIZE)
    }
}

async fn dispatch<S: QuerySource>(
    transport: &RateLimitedTransport<S>,
    query: QueryDocument,
) -> Result<ResponseDocument, TransportError> {
    transport.execute(&query).await
}

fn parse_coordinate(element: &XmlElement, key: &str) -> Option<f64> {
    element.attribute(key)?.trim().parse().ok()
}

fn apply_tags(tags: &mut Tags, element: &XmlElement) {
    for tag in element.children_named("tag") {
        if let (Some(key), Some(value)) = (tag.attribute("k"), tag.attribute("v")) {
            tags.insert(key.to_owned(), value.to_owned());
        }
    }
}
