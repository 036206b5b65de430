//! `refine` command: replace a saved map with everything inside new bounds.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use mapsnap_core::{EntityStore, MapBoundingBox};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::saves::{MapSummary, load_save, require_save, store_save, write_summary};
use crate::session::{SessionConfig, SourceBuilder, block_on};
use crate::{
    ARG_EAST, ARG_NORTH, ARG_OUTPUT, ARG_SAVE, ARG_SOUTH, ARG_WEST, CliError, ENV_REFINE_EAST,
    ENV_REFINE_NORTH, ENV_REFINE_SAVE, ENV_REFINE_SOUTH, ENV_REFINE_WEST,
};

/// CLI arguments for the `refine` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Fetch every way inside the given bounds and replace the \
                 saved map with them. Tracked place names are kept. The \
                 input save is overwritten unless --output is given.",
    about = "Refine a saved map to new bounds"
)]
#[ortho_config(prefix = "MAPSNAP")]
pub(crate) struct RefineArgs {
    /// Save file to refine.
    #[arg(long = ARG_SAVE, value_name = "path")]
    #[serde(default)]
    pub(crate) save: Option<Utf8PathBuf>,
    /// Where to write the refined save; defaults to the input.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
    /// Western longitude.
    #[arg(long = ARG_WEST, value_name = "lon", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) west: Option<f64>,
    /// Southern latitude.
    #[arg(long = ARG_SOUTH, value_name = "lat", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) south: Option<f64>,
    /// Eastern longitude.
    #[arg(long = ARG_EAST, value_name = "lon", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) east: Option<f64>,
    /// Northern latitude.
    #[arg(long = ARG_NORTH, value_name = "lat", allow_negative_numbers = true)]
    #[serde(default)]
    pub(crate) north: Option<f64>,
}

impl RefineArgs {
    pub(crate) fn into_config(self) -> Result<RefineConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        RefineConfig::try_from(merged)
    }
}

/// Resolved `refine` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RefineConfig {
    pub(crate) save: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
    pub(crate) bbox: MapBoundingBox,
}

impl RefineConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_save(&self.save, ARG_SAVE)
    }
}

impl TryFrom<RefineArgs> for RefineConfig {
    type Error = CliError;

    fn try_from(args: RefineArgs) -> Result<Self, Self::Error> {
        let save = args.save.ok_or(CliError::MissingArgument {
            field: ARG_SAVE,
            env: ENV_REFINE_SAVE,
        })?;
        let west = args.west.ok_or(CliError::MissingArgument {
            field: ARG_WEST,
            env: ENV_REFINE_WEST,
        })?;
        let south = args.south.ok_or(CliError::MissingArgument {
            field: ARG_SOUTH,
            env: ENV_REFINE_SOUTH,
        })?;
        let east = args.east.ok_or(CliError::MissingArgument {
            field: ARG_EAST,
            env: ENV_REFINE_EAST,
        })?;
        let north = args.north.ok_or(CliError::MissingArgument {
            field: ARG_NORTH,
            env: ENV_REFINE_NORTH,
        })?;

        let ordered = west <= east && south <= north;
        if !ordered {
            return Err(CliError::EmptyBoundingBox {
                west,
                east,
                south,
                north,
            });
        }

        let output = args.output.unwrap_or_else(|| save.clone());
        Ok(Self {
            save,
            output,
            bbox: MapBoundingBox {
                x_min: west,
                y_min: south,
                x_max: east,
                y_max: north,
            },
        })
    }
}

pub(crate) fn run_refine_with<B: SourceBuilder>(
    args: RefineArgs,
    session: &SessionConfig,
    builder: &B,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let summary = execute_refine(&config, session, builder)?;
    write_summary(writer, &summary)
}

pub(crate) fn execute_refine<B: SourceBuilder>(
    config: &RefineConfig,
    session: &SessionConfig,
    builder: &B,
) -> Result<MapSummary, CliError> {
    let mut store = EntityStore::new();
    let saved = load_save(&config.save, &mut store)?;
    let source = builder.build(session)?;
    let mut query = session.session(store, source);
    let result = block_on(query.refine(config.bbox))??;
    store_save(&config.output, &saved.places, &result, query.store())?;
    Ok(MapSummary::describe(
        "refine",
        &config.output,
        &saved.places,
        &result,
        query.store(),
    ))
}
