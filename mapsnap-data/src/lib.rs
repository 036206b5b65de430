//! Acquisition pipeline for the mapsnap workspace.
//!
//! Responsibilities:
//! - Build the fixed Overpass query shapes (by name, by bounding box, by ID).
//! - Execute queries under a concurrency budget and parse the XML replies.
//! - Apply replies to an [`EntityStore`](mapsnap_core::EntityStore),
//!   hydrating member nodes in chunked follow-up rounds.
//! - Sequence discovery, refinement and place addition workflows.
//! - Read and write save files.
//!
//! Boundaries:
//! - Geometry and entity rules live in `mapsnap-core`.
//! - No retries and no caching across process runs.
//!
//! Invariants:
//! - At most the configured number of requests are in flight at once.
//! - The processor is the only writer to the store during a workflow.
//! - No global mutable state.

pub mod document;
pub mod processor;
pub mod query;
pub mod save;
pub mod session;
pub mod transport;

pub use document::{DocumentError, ResponseDocument, XmlElement};
pub use processor::{
    NODE_REQUEST_CHUNK_SIZE, ProcessMode, ProcessReport, ResponseProcessor, chunk_node_ids,
};
pub use query::{ElementType, QueryDocument, bbox_query, id_union_query, name_query};
pub use save::{SaveError, SaveFile, read_save, write_save};
pub use session::{QueryError, QuerySession};
pub use transport::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_USER_AGENT, HttpQuerySource,
    HttpQuerySourceConfig, QuerySource, RateLimitedTransport, SourceBuildError, TransportError,
};
