//! Connection options shared by every subcommand.

use std::future::Future;
use std::io;
use std::time::Duration;

use clap::Parser;
use mapsnap_data::{
    DEFAULT_ENDPOINT, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_USER_AGENT, HttpQuerySource,
    HttpQuerySourceConfig, QuerySource, QuerySession, RateLimitedTransport,
};
use mapsnap_core::EntityStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use structured_logger::Builder;
use structured_logger::json::new_writer;

use crate::{ARG_MAX_CONCURRENT, CliError};

const DEFAULT_LOG_LEVEL: &str = "info";

/// Interpreter and logging options, layered like the subcommand options.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "session")]
#[ortho_config(prefix = "MAPSNAP")]
pub(crate) struct SessionArgs {
    /// Interpreter endpoint URL.
    #[arg(long, global = true, value_name = "url")]
    #[serde(default)]
    pub(crate) endpoint: Option<String>,
    /// User agent sent with every request.
    #[arg(long, global = true, value_name = "agent")]
    #[serde(default)]
    pub(crate) user_agent: Option<String>,
    /// Maximum number of requests in flight at once.
    #[arg(long = ARG_MAX_CONCURRENT, global = true, value_name = "count")]
    #[serde(default)]
    pub(crate) max_concurrent: Option<usize>,
    /// Per-request timeout in seconds. No timeout when unset.
    #[arg(long, global = true, value_name = "seconds")]
    #[serde(default)]
    pub(crate) timeout_secs: Option<u64>,
    /// Log level for the JSON logger on stderr.
    #[arg(long, global = true, value_name = "level")]
    #[serde(default)]
    pub(crate) log_level: Option<String>,
}

impl SessionArgs {
    pub(crate) fn into_config(self) -> Result<SessionConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SessionConfig::try_from(merged)
    }
}

/// Resolved connection options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionConfig {
    pub(crate) endpoint: String,
    pub(crate) user_agent: String,
    pub(crate) max_concurrent: usize,
    pub(crate) timeout: Option<Duration>,
    pub(crate) log_level: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            max_concurrent: DEFAULT_MAX_CONCURRENT_REQUESTS,
            timeout: None,
            log_level: DEFAULT_LOG_LEVEL.to_owned(),
        }
    }
}

impl TryFrom<SessionArgs> for SessionConfig {
    type Error = CliError;

    fn try_from(args: SessionArgs) -> Result<Self, Self::Error> {
        let defaults = Self::default();
        let max_concurrent = args.max_concurrent.unwrap_or(defaults.max_concurrent);
        if max_concurrent == 0 {
            return Err(CliError::ZeroConcurrency);
        }
        Ok(Self {
            endpoint: args.endpoint.unwrap_or(defaults.endpoint),
            user_agent: args.user_agent.unwrap_or(defaults.user_agent),
            max_concurrent,
            timeout: args.timeout_secs.map(Duration::from_secs),
            log_level: args.log_level.unwrap_or(defaults.log_level),
        })
    }
}

impl SessionConfig {
    /// Wrap `source` and `store` in a session honouring the request budget.
    pub(crate) fn session<S: QuerySource>(&self, store: EntityStore, source: S) -> QuerySession<S> {
        let transport = RateLimitedTransport::with_capacity(source, self.max_concurrent);
        QuerySession::with_transport(store, transport)
    }
}

/// Builds the query source for one invocation.
pub(crate) trait SourceBuilder {
    type Source: QuerySource;

    fn build(&self, config: &SessionConfig) -> Result<Self::Source, CliError>;
}

/// Builds an [`HttpQuerySource`] from the resolved options.
pub(crate) struct HttpSourceBuilder;

impl SourceBuilder for HttpSourceBuilder {
    type Source = HttpQuerySource;

    fn build(&self, config: &SessionConfig) -> Result<Self::Source, CliError> {
        let mut http = HttpQuerySourceConfig::new(config.endpoint.clone())
            .with_user_agent(config.user_agent.clone());
        if let Some(timeout) = config.timeout {
            http = http.with_timeout(timeout);
        }
        HttpQuerySource::with_config(http).map_err(|source| CliError::BuildSource {
            endpoint: config.endpoint.clone(),
            source,
        })
    }
}

/// Install the JSON logger on stderr.
pub(crate) fn init_logging(level: &str) -> Result<(), CliError> {
    Builder::with_level(level)
        .with_target_writer("*", new_writer(io::stderr()))
        .try_init()
        .map_err(CliError::Logging)
}

/// Drive `future` on a current-thread runtime; the query sources are not `Send`.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    Ok(runtime.block_on(future))
}

#[cfg(test)]
pub(crate) fn session_config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<SessionConfig, CliError> {
    let merged = SessionArgs::merge_from_layers(layers).map_err(CliError::from)?;
    SessionConfig::try_from(merged)
}
