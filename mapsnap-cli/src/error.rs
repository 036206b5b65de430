//! Error types emitted by the mapsnap CLI.
//!
//! Keep this error type reasonably small, as many CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use mapsnap_data::{QueryError, SaveError, SourceBuildError};
use thiserror::Error;

/// Errors emitted by the mapsnap CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// The request budget must allow at least one request.
    #[error("--max-concurrent must be at least 1")]
    ZeroConcurrency,
    /// The refine bounds do not describe a box.
    #[error("bounding box is empty: west {west} east {east} south {south} north {north}")]
    EmptyBoundingBox {
        west: f64,
        east: f64,
        south: f64,
        north: f64,
    },
    /// The logger could not be installed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[source] log::SetLoggerError),
    /// The async runtime could not be built.
    #[error("failed to start the async runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// A referenced save file does not exist on disk or is not a file.
    #[error("{field} path {path:?} does not exist or is not a file")]
    MissingSaveFile {
        field: &'static str,
        path: Utf8PathBuf,
    },
    /// A referenced save path could not be inspected due to an IO error.
    #[error("failed to inspect {field} path {path:?}: {source}")]
    InspectSavePath {
        field: &'static str,
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Opening the save file failed.
    #[error("failed to open save file at {path:?}: {source}")]
    OpenSave {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The save file could not be decoded.
    #[error("failed to read save file at {path:?}: {source}")]
    ReadSave {
        path: Utf8PathBuf,
        #[source]
        source: SaveError,
    },
    /// Creating the output save file failed.
    #[error("failed to create save file at {path:?}: {source}")]
    CreateSave {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Writing the output save file failed.
    #[error("failed to write save file at {path:?}: {source}")]
    WriteSave {
        path: Utf8PathBuf,
        #[source]
        source: SaveError,
    },
    /// Constructing the HTTP query source failed.
    #[error("failed to build query source for {endpoint:?}: {source}")]
    BuildSource {
        endpoint: String,
        #[source]
        source: SourceBuildError,
    },
    /// A query workflow failed.
    #[error("query failed: {0}")]
    Query(#[from] QueryError),
    /// Discovery matched none of the given places.
    #[error("no map data found for {places:?}")]
    NotFound { places: Vec<String> },
    /// Serialising the summary failed.
    #[error("failed to serialise summary: {0}")]
    SerialiseSummary(#[source] serde_json::Error),
    /// Writing the summary failed.
    #[error("failed to write summary: {0}")]
    WriteSummary(#[source] std::io::Error),
}
