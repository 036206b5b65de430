//! `discover` command: find named places and collect the map around them.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use mapsnap_core::EntityStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::saves::{MapSummary, store_save, write_summary};
use crate::session::{SessionConfig, SourceBuilder, block_on};
use crate::{ARG_OUTPUT, ARG_PLACES, CliError, ENV_DISCOVER_OUTPUT, ENV_DISCOVER_PLACES};

/// CLI arguments for the `discover` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Look up each named place, take the bounding box around \
                 everything that matched, then fetch every way inside it. \
                 The result is written as a new save file.",
    about = "Discover the map around named places"
)]
#[ortho_config(prefix = "MAPSNAP")]
pub(crate) struct DiscoverArgs {
    /// Place names to look up.
    #[arg(value_name = "place", num_args = 1..)]
    #[serde(default)]
    pub(crate) places: Option<Vec<String>>,
    /// Path of the save file to write.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl DiscoverArgs {
    pub(crate) fn into_config(self) -> Result<DiscoverConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        DiscoverConfig::try_from(merged)
    }
}

/// Resolved `discover` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DiscoverConfig {
    pub(crate) places: Vec<String>,
    pub(crate) output: Utf8PathBuf,
}

impl TryFrom<DiscoverArgs> for DiscoverConfig {
    type Error = CliError;

    fn try_from(args: DiscoverArgs) -> Result<Self, Self::Error> {
        let places = args
            .places
            .filter(|places| !places.is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_PLACES,
                env: ENV_DISCOVER_PLACES,
            })?;
        let output = args.output.ok_or(CliError::MissingArgument {
            field: ARG_OUTPUT,
            env: ENV_DISCOVER_OUTPUT,
        })?;
        Ok(Self { places, output })
    }
}

pub(crate) fn run_discover_with<B: SourceBuilder>(
    args: DiscoverArgs,
    session: &SessionConfig,
    builder: &B,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    let summary = execute_discover(&config, session, builder)?;
    write_summary(writer, &summary)
}

pub(crate) fn execute_discover<B: SourceBuilder>(
    config: &DiscoverConfig,
    session: &SessionConfig,
    builder: &B,
) -> Result<MapSummary, CliError> {
    let source = builder.build(session)?;
    let mut query = session.session(EntityStore::new(), source);
    let result = block_on(query.discover(&config.places))??.ok_or_else(|| {
        CliError::NotFound {
            places: config.places.clone(),
        }
    })?;
    store_save(&config.output, &config.places, &result, query.store())?;
    Ok(MapSummary::describe(
        "discover",
        &config.output,
        &config.places,
        &result,
        query.store(),
    ))
}
