use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use super::{SourceBuildError, TransportError};
use crate::query::QueryDocument;

/// Public Overpass interpreter used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://overpass.kumi.systems/api/interpreter";
/// User agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "mapsnap/0.1";

const QUERY_MEDIA_TYPE: &str = "application/xml";

/// Something that can answer query documents with raw response bodies.
#[async_trait(?Send)]
pub trait QuerySource {
    /// Endpoint used in diagnostics.
    fn endpoint(&self) -> &str;
    /// Submit `query` and return the response body.
    async fn post(&self, query: &QueryDocument) -> Result<String, TransportError>;
}

/// Configuration for [`HttpQuerySource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpQuerySourceConfig {
    /// Interpreter URL receiving POSTed queries.
    pub endpoint: String,
    /// User agent string for requests.
    pub user_agent: String,
    /// Per-request timeout. `None` lets a request run indefinitely.
    pub timeout: Option<Duration>,
}

impl Default for HttpQuerySourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: None,
        }
    }
}

impl HttpQuerySourceConfig {
    /// Create a configuration targeting `endpoint`.
    #[must_use]
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// HTTP implementation of [`QuerySource`].
///
/// Non-success statuses are not treated as failures: the interpreter reports
/// overload and syntax problems as HTML or XML bodies, which the processor
/// logs and discards.
#[derive(Debug, Clone)]
pub struct HttpQuerySource {
    client: Client,
    endpoint: Url,
}

impl HttpQuerySource {
    /// Create a source for `endpoint` with default settings.
    ///
    /// # Errors
    ///
    /// Returns [`SourceBuildError`] if the endpoint is not a URL or the HTTP
    /// client cannot be built.
    pub fn new(endpoint: impl Into<String>) -> Result<Self, SourceBuildError> {
        Self::with_config(HttpQuerySourceConfig::new(endpoint))
    }

    /// Create a source from explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SourceBuildError`] if the endpoint is not a URL or the HTTP
    /// client cannot be built.
    pub fn with_config(config: HttpQuerySourceConfig) -> Result<Self, SourceBuildError> {
        let endpoint =
            Url::parse(&config.endpoint).map_err(|source| SourceBuildError::Endpoint {
                endpoint: config.endpoint.clone(),
                source,
            })?;
        let mut builder = Client::builder().user_agent(&config.user_agent);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|source| SourceBuildError::HttpClient { source })?;
        Ok(Self { client, endpoint })
    }

    fn network_error(&self, error: &reqwest::Error) -> TransportError {
        TransportError::Network {
            endpoint: self.endpoint.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait(?Send)]
impl QuerySource for HttpQuerySource {
    fn endpoint(&self) -> &str {
        self.endpoint.as_str()
    }

    async fn post(&self, query: &QueryDocument) -> Result<String, TransportError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, QUERY_MEDIA_TYPE)
            .body(query.as_str().to_owned())
            .send()
            .await
            .map_err(|err| self.network_error(&err))?;
        let status = response.status();
        if !status.is_success() {
            log::warn!("interpreter at {} answered with status {status}", self.endpoint);
        }
        response.text().await.map_err(|err| self.network_error(&err))
    }
}
