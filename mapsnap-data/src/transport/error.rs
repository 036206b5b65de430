//! Error types produced by the transport layer.

use thiserror::Error;

use crate::document::DocumentError;

/// Faults that abort the current workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// The request could not be sent or its body could not be read.
    #[error("network error contacting {endpoint}: {message}")]
    Network {
        /// Interpreter endpoint.
        endpoint: String,
        /// Description reported by the HTTP client.
        message: String,
    },
    /// The body was not well-formed XML.
    #[error("failed to parse response from {endpoint}: {source}")]
    Parse {
        /// Interpreter endpoint.
        endpoint: String,
        /// Underlying parse failure.
        #[source]
        source: DocumentError,
    },
}

/// Faults raised while constructing an [`HttpQuerySource`](super::HttpQuerySource).
#[derive(Debug, Error)]
pub enum SourceBuildError {
    /// The endpoint is not an absolute URL.
    #[error("invalid interpreter endpoint {endpoint:?}: {source}")]
    Endpoint {
        /// Rejected endpoint text.
        endpoint: String,
        /// Parser diagnostic.
        #[source]
        source: url::ParseError,
    },
    /// The HTTP client rejected its configuration.
    #[error("failed to build HTTP client: {source}")]
    HttpClient {
        /// Client builder error.
        #[source]
        source: reqwest::Error,
    },
}
