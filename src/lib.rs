//! Facade crate for the mapsnap acquisition pipeline.
//!
//! This crate re-exports the entity model from `mapsnap-core` and the query,
//! transport and save-file APIs from `mapsnap-data`, so consumers can depend
//! on a single crate.
//!
//! ```
//! use mapsnap::{QuerySession, StubQuerySource, block_on_for_tests};
//!
//! let mut session = QuerySession::new(StubQuerySource::new());
//! let found = block_on_for_tests(session.discover(&["Nowhere"]))?;
//! assert!(found.is_none());
//! # Ok::<(), mapsnap::QueryError>(())
//! ```

#![forbid(unsafe_code)]

pub use mapsnap_core::{
    ENDPOINT_EPSILON, EntityStore, InvalidVisibility, MapBoundingBox, MapPoint, Node, NodeId,
    QueryResult, Tags, Visibility, Way, WayId, WayKind,
};

pub use mapsnap_data::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_USER_AGENT, DocumentError,
    ElementType, HttpQuerySource, HttpQuerySourceConfig, NODE_REQUEST_CHUNK_SIZE, ProcessMode,
    ProcessReport, QueryDocument, QueryError, QuerySession, QuerySource, RateLimitedTransport,
    ResponseDocument, ResponseProcessor, SaveError, SaveFile, SourceBuildError, TransportError,
    XmlElement, bbox_query, chunk_node_ids, id_union_query, name_query, read_save, write_save,
};

#[cfg(feature = "test-support")]
pub use mapsnap_data::transport::{StubQuerySource, block_on_for_tests};
