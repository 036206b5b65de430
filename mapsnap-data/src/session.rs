//! Acquisition workflows over a shared entity store.

use mapsnap_core::{EntityStore, MapBoundingBox, QueryResult, Tags};
use thiserror::Error;

use crate::processor::{ProcessMode, ResponseProcessor};
use crate::query::{QueryDocument, bbox_query, name_query};
use crate::transport::{QuerySource, RateLimitedTransport, TransportError};

/// Failures surfaced by [`QuerySession`] workflows.
#[derive(Debug, Error)]
pub enum QueryError {
    /// A request failed; the workflow was abandoned.
    #[error("query transport failed: {0}")]
    Transport(#[from] TransportError),
    /// The workflow was given no place names.
    #[error("no place names were supplied")]
    NoPlaces,
}

/// Owns the entity store and transport for a sequence of workflows.
///
/// Entities persist across workflows, so a way fetched by `discover` and
/// seen again by `refine` resolves to the same handle.
///
/// # Examples
/// ```
/// use mapsnap_data::session::QuerySession;
/// use mapsnap_data::transport::{StubQuerySource, block_on_for_tests};
///
/// let mut session = QuerySession::new(StubQuerySource::new());
/// let found = block_on_for_tests(session.discover(&["Nowhere"]))?;
/// assert!(found.is_none());
/// # Ok::<(), mapsnap_data::session::QueryError>(())
/// ```
#[derive(Debug)]
pub struct QuerySession<S> {
    store: EntityStore,
    transport: RateLimitedTransport<S>,
}

impl<S: QuerySource> QuerySession<S> {
    /// Start a session with an empty store and the default request budget.
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_transport(EntityStore::new(), RateLimitedTransport::new(source))
    }

    /// Resume a session around an existing store, for example one rebuilt
    /// from a save file.
    #[must_use]
    pub fn with_store(store: EntityStore, source: S) -> Self {
        Self::with_transport(store, RateLimitedTransport::new(source))
    }

    /// Assemble a session from parts.
    #[must_use]
    pub const fn with_transport(store: EntityStore, transport: RateLimitedTransport<S>) -> Self {
        Self { store, transport }
    }

    /// Borrow the entity store.
    #[must_use]
    pub const fn store(&self) -> &EntityStore {
        &self.store
    }

    /// Mutably borrow the entity store, e.g. to change way visibility.
    pub const fn store_mut(&mut self) -> &mut EntityStore {
        &mut self.store
    }

    /// Consume the session, keeping the store.
    #[must_use]
    pub fn into_store(self) -> EntityStore {
        self.store
    }

    /// Borrow the transport.
    #[must_use]
    pub const fn transport(&self) -> &RateLimitedTransport<S> {
        &self.transport
    }

    /// Find the area covered by `places`, then collect every way inside it.
    ///
    /// Returns `Ok(None)` when no place matched anything with a location.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoPlaces`] for an empty list and
    /// [`QueryError::Transport`] when any request fails.
    pub async fn discover<P: AsRef<str>>(
        &mut self,
        places: &[P],
    ) -> Result<Option<QueryResult>, QueryError> {
        let queries = place_queries(places)?;
        let mut result = QueryResult::new();

        log::info!("discovering the area covered by {} places", places.len());
        ResponseProcessor::run(
            &self.transport,
            &mut self.store,
            &mut result,
            ProcessMode::ExpandBoundingBox,
            queries,
        )
        .await?;

        if result.bbox.is_empty() {
            log::info!("no place matched; nothing to populate");
            return Ok(None);
        }

        log::info!("populating discovered area {:?}", result.bbox);
        let query = bbox_query(&result.bbox, &Tags::new());
        ResponseProcessor::run(
            &self.transport,
            &mut self.store,
            &mut result,
            ProcessMode::Populate,
            vec![query],
        )
        .await?;
        Ok(Some(result))
    }

    /// Collect every way inside `bbox`.
    ///
    /// The result covers exactly `bbox` and may hold no ways.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::Transport`] when any request fails.
    pub async fn refine(&mut self, bbox: MapBoundingBox) -> Result<QueryResult, QueryError> {
        if bbox.is_empty() {
            log::warn!("refining an empty bounding box; the interpreter will match nothing");
        }
        let mut result = QueryResult::with_bbox(bbox);
        ResponseProcessor::run(
            &self.transport,
            &mut self.store,
            &mut result,
            ProcessMode::Populate,
            vec![bbox_query(&bbox, &Tags::new())],
        )
        .await?;
        Ok(result)
    }

    /// Append the ways matching `places` to `result`.
    ///
    /// Existing ways, their order, and the bounding box are left untouched.
    /// Returns how many ways were appended.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoPlaces`] for an empty list and
    /// [`QueryError::Transport`] when any request fails. On failure `result`
    /// is unchanged.
    pub async fn add_places<P: AsRef<str>>(
        &mut self,
        result: &mut QueryResult,
        places: &[P],
    ) -> Result<usize, QueryError> {
        let queries = place_queries(places)?;
        let mut fresh = QueryResult::new();
        ResponseProcessor::run(
            &self.transport,
            &mut self.store,
            &mut fresh,
            ProcessMode::Populate,
            queries,
        )
        .await?;
        let added = result.merge_ways(&fresh);
        log::info!("added {added} ways from {} places", places.len());
        Ok(added)
    }
}

fn place_queries<P: AsRef<str>>(places: &[P]) -> Result<Vec<QueryDocument>, QueryError> {
    if places.is_empty() {
        return Err(QueryError::NoPlaces);
    }
    Ok(places.iter().map(|place| name_query(place.as_ref())).collect())
}
