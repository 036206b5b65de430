//! Execution of query documents against a remote interpreter.
//!
//! [`QuerySource`] is the seam between the pipeline and the network.
//! [`RateLimitedTransport`] wraps any source with a permit budget and turns
//! raw bodies into [`ResponseDocument`](crate::document::ResponseDocument)s.
#![forbid(unsafe_code)]

mod error;
mod limiter;
mod source;

#[cfg(any(test, feature = "test-support"))]
mod test_support;
#[cfg(any(test, feature = "test-support"))]
pub use test_support::{StubQuerySource, block_on_for_tests};

pub use error::{SourceBuildError, TransportError};
pub use limiter::{DEFAULT_MAX_CONCURRENT_REQUESTS, RateLimitedTransport};
pub use source::{
    DEFAULT_ENDPOINT, DEFAULT_USER_AGENT, HttpQuerySource, HttpQuerySourceConfig, QuerySource,
};
