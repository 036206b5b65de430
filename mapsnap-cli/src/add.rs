//! `add` command: append the ways of more places to a saved map.

use std::io::Write;

use camino::Utf8PathBuf;
use clap::Parser;
use mapsnap_core::EntityStore;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

use crate::saves::{MapSummary, load_save, require_save, store_save, write_summary};
use crate::session::{SessionConfig, SourceBuilder, block_on};
use crate::{ARG_OUTPUT, ARG_PLACES, ARG_SAVE, CliError, ENV_ADD_PLACES, ENV_ADD_SAVE};

/// CLI arguments for the `add` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Look up each named place and append the matching ways to \
                 a saved map. Existing ways and the bounding box are left \
                 alone. The input save is overwritten unless --output is \
                 given.",
    about = "Add places to a saved map"
)]
#[ortho_config(prefix = "MAPSNAP")]
pub(crate) struct AddArgs {
    /// Place names to add.
    #[arg(value_name = "place", num_args = 1..)]
    #[serde(default)]
    pub(crate) places: Option<Vec<String>>,
    /// Save file to extend.
    #[arg(long = ARG_SAVE, value_name = "path")]
    #[serde(default)]
    pub(crate) save: Option<Utf8PathBuf>,
    /// Where to write the extended save; defaults to the input.
    #[arg(long = ARG_OUTPUT, value_name = "path")]
    #[serde(default)]
    pub(crate) output: Option<Utf8PathBuf>,
}

impl AddArgs {
    pub(crate) fn into_config(self) -> Result<AddConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AddConfig::try_from(merged)
    }
}

/// Resolved `add` command configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AddConfig {
    pub(crate) places: Vec<String>,
    pub(crate) save: Utf8PathBuf,
    pub(crate) output: Utf8PathBuf,
}

impl AddConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        require_save(&self.save, ARG_SAVE)
    }
}

impl TryFrom<AddArgs> for AddConfig {
    type Error = CliError;

    fn try_from(args: AddArgs) -> Result<Self, Self::Error> {
        let places = args
            .places
            .filter(|places| !places.is_empty())
            .ok_or(CliError::MissingArgument {
                field: ARG_PLACES,
                env: ENV_ADD_PLACES,
            })?;
        let save = args.save.ok_or(CliError::MissingArgument {
            field: ARG_SAVE,
            env: ENV_ADD_SAVE,
        })?;
        let output = args.output.unwrap_or_else(|| save.clone());
        Ok(Self {
            places,
            save,
            output,
        })
    }
}

pub(crate) fn run_add_with<B: SourceBuilder>(
    args: AddArgs,
    session: &SessionConfig,
    builder: &B,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    let summary = execute_add(&config, session, builder)?;
    write_summary(writer, &summary)
}

pub(crate) fn execute_add<B: SourceBuilder>(
    config: &AddConfig,
    session: &SessionConfig,
    builder: &B,
) -> Result<MapSummary, CliError> {
    let mut store = EntityStore::new();
    let saved = load_save(&config.save, &mut store)?;
    let source = builder.build(session)?;
    let mut query = session.session(store, source);

    let mut result = saved.result;
    let added = block_on(query.add_places(&mut result, &config.places))??;
    let places = track_places(saved.places, &config.places);

    store_save(&config.output, &places, &result, query.store())?;
    Ok(
        MapSummary::describe("add", &config.output, &places, &result, query.store())
            .with_added(added),
    )
}

/// Append `extra` to `tracked`, skipping names already present.
pub(crate) fn track_places(mut tracked: Vec<String>, extra: &[String]) -> Vec<String> {
    for place in extra {
        if !tracked.contains(place) {
            tracked.push(place.clone());
        }
    }
    tracked
}
