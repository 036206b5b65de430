use tokio::sync::Semaphore;

use super::{QuerySource, TransportError};
use crate::document::ResponseDocument;
use crate::query::QueryDocument;

/// Requests allowed in flight at once unless configured otherwise.
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

/// Bounds concurrent requests to a [`QuerySource`] and parses the replies.
///
/// A permit is held from just before the request is sent until the body has
/// been parsed. The permit is an RAII guard, so it is returned on every exit
/// path, errors included. Requests are never retried.
#[derive(Debug)]
pub struct RateLimitedTransport<S> {
    source: S,
    permits: Semaphore,
    capacity: usize,
}

impl<S: QuerySource> RateLimitedTransport<S> {
    /// Wrap `source` with the default budget of
    /// [`DEFAULT_MAX_CONCURRENT_REQUESTS`].
    #[must_use]
    pub fn new(source: S) -> Self {
        Self::with_capacity(source, DEFAULT_MAX_CONCURRENT_REQUESTS)
    }

    /// Wrap `source` allowing `capacity` concurrent requests.
    ///
    /// A capacity of zero is raised to one so the transport can make progress.
    #[must_use]
    pub fn with_capacity(source: S, capacity: usize) -> Self {
        let capacity = capacity.clamp(1, Semaphore::MAX_PERMITS);
        Self {
            source,
            permits: Semaphore::new(capacity),
            capacity,
        }
    }

    /// Execute one query and parse the body.
    ///
    /// Suspends while every permit is taken.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Network`] when the source fails and
    /// [`TransportError::Parse`] when the body is not well-formed XML.
    pub async fn execute(&self, query: &QueryDocument) -> Result<ResponseDocument, TransportError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|err| TransportError::Network {
                endpoint: self.source.endpoint().to_owned(),
                message: err.to_string(),
            })?;
        let body = self.source.post(query).await?;
        ResponseDocument::parse(&body).map_err(|source| TransportError::Parse {
            endpoint: self.source.endpoint().to_owned(),
            source,
        })
    }

    /// Permits currently free.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Total permit budget.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Borrow the wrapped source.
    #[must_use]
    pub const fn source(&self) -> &S {
        &self.source
    }
}
