//! Deterministic test double for [`QuerySource`].
use std::cell::{Cell, RefCell};
use std::future::Future;

use async_trait::async_trait;

use super::{QuerySource, TransportError};
use crate::query::QueryDocument;

const STUB_ENDPOINT: &str = "https://interpreter.invalid/api/interpreter";

/// Stub [`QuerySource`] answering from canned bodies.
///
/// Each query is matched against the routes in insertion order; the first
/// route whose needle occurs in the query text supplies the body. Queries
/// without a matching route receive the default body, or an empty `osm`
/// document when none is set. Routes added with
/// [`with_slow_route`](Self::with_slow_route) stay in flight for extra
/// scheduler turns, so tests can choose which responses complete first.
///
/// # Examples
/// ```
/// use mapsnap_data::query::name_query;
/// use mapsnap_data::transport::{QuerySource, StubQuerySource, block_on_for_tests};
///
/// let stub = StubQuerySource::new().with_route("Example Park", "<osm/>");
/// let body = block_on_for_tests(stub.post(&name_query("Example Park")))?;
/// assert_eq!(body, "<osm/>");
/// assert_eq!(stub.queries().len(), 1);
/// # Ok::<(), mapsnap_data::transport::TransportError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct StubQuerySource {
    routes: Vec<StubRoute>,
    default_response: Option<String>,
    failure: Option<String>,
    yield_points: usize,
    queries: RefCell<Vec<String>>,
    in_flight: Cell<usize>,
    peak_in_flight: Cell<usize>,
}

#[derive(Debug, Clone)]
struct StubRoute {
    needle: String,
    body: String,
    delay: usize,
}

impl StubQuerySource {
    /// Create a stub that answers every query with an empty `osm` document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer queries containing `needle` with `body`.
    #[must_use]
    pub fn with_route(self, needle: impl Into<String>, body: impl Into<String>) -> Self {
        self.with_slow_route(needle, body, 0)
    }

    /// Answer queries containing `needle` with `body` after yielding to the
    /// scheduler `delay` extra times.
    #[must_use]
    pub fn with_slow_route(
        mut self,
        needle: impl Into<String>,
        body: impl Into<String>,
        delay: usize,
    ) -> Self {
        self.routes.push(StubRoute {
            needle: needle.into(),
            body: body.into(),
            delay,
        });
        self
    }

    /// Answer unmatched queries with `body`.
    #[must_use]
    pub fn with_default_response(mut self, body: impl Into<String>) -> Self {
        self.default_response = Some(body.into());
        self
    }

    /// Fail every query with a network error carrying `message`.
    #[must_use]
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Yield to the scheduler `count` times inside each request, keeping it
    /// in flight long enough for others to start.
    #[must_use]
    pub const fn with_yield_points(mut self, count: usize) -> Self {
        self.yield_points = count;
        self
    }

    /// Every query received, in arrival order.
    #[must_use]
    pub fn queries(&self) -> Vec<String> {
        self.queries.borrow().clone()
    }

    /// Received queries containing `needle`.
    #[must_use]
    pub fn queries_containing(&self, needle: &str) -> Vec<String> {
        self.queries
            .borrow()
            .iter()
            .filter(|query| query.contains(needle))
            .cloned()
            .collect()
    }

    /// Highest number of requests observed in flight at once.
    #[must_use]
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.get()
    }

    fn route(&self, query: &str) -> Option<&StubRoute> {
        self.routes
            .iter()
            .find(|route| query.contains(route.needle.as_str()))
    }

    fn respond(&self, query: &str) -> String {
        self.route(query)
            .map(|route| route.body.clone())
            .or_else(|| self.default_response.clone())
            .unwrap_or_else(|| "<osm/>".to_owned())
    }
}

#[async_trait(?Send)]
impl QuerySource for StubQuerySource {
    fn endpoint(&self) -> &str {
        STUB_ENDPOINT
    }

    async fn post(&self, query: &QueryDocument) -> Result<String, TransportError> {
        self.queries.borrow_mut().push(query.as_str().to_owned());
        let current = self.in_flight.get() + 1;
        self.in_flight.set(current);
        self.peak_in_flight.set(self.peak_in_flight.get().max(current));

        let delay = self.route(query.as_str()).map_or(0, |route| route.delay);
        for _ in 0..self.yield_points + delay {
            tokio::task::yield_now().await;
        }

        self.in_flight.set(self.in_flight.get() - 1);
        match &self.failure {
            Some(message) => Err(TransportError::Network {
                endpoint: STUB_ENDPOINT.to_owned(),
                message: message.clone(),
            }),
            None => Ok(self.respond(query.as_str())),
        }
    }
}

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("failed to build Tokio runtime: {err}"))
        .block_on(future)
}
