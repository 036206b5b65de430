//! Command-line interface for fetching and refining mapsnap save files.
#![forbid(unsafe_code)]

use std::io::Write;

use clap::{Parser, Subcommand};

mod add;
mod discover;
mod error;
mod refine;
mod saves;
mod session;

use add::{AddArgs, run_add_with};
use discover::{DiscoverArgs, run_discover_with};
pub use error::CliError;
use refine::{RefineArgs, run_refine_with};
use session::{HttpSourceBuilder, SessionArgs, SessionConfig, SourceBuilder, init_logging};

const ARG_MAX_CONCURRENT: &str = "max-concurrent";
const ARG_OUTPUT: &str = "output";
const ARG_PLACES: &str = "places";
const ARG_SAVE: &str = "save";
const ARG_WEST: &str = "west";
const ARG_SOUTH: &str = "south";
const ARG_EAST: &str = "east";
const ARG_NORTH: &str = "north";
const ENV_DISCOVER_OUTPUT: &str = "MAPSNAP_CMDS_DISCOVER_OUTPUT";
const ENV_DISCOVER_PLACES: &str = "MAPSNAP_CMDS_DISCOVER_PLACES";
const ENV_REFINE_SAVE: &str = "MAPSNAP_CMDS_REFINE_SAVE";
const ENV_REFINE_WEST: &str = "MAPSNAP_CMDS_REFINE_WEST";
const ENV_REFINE_SOUTH: &str = "MAPSNAP_CMDS_REFINE_SOUTH";
const ENV_REFINE_EAST: &str = "MAPSNAP_CMDS_REFINE_EAST";
const ENV_REFINE_NORTH: &str = "MAPSNAP_CMDS_REFINE_NORTH";
const ENV_ADD_SAVE: &str = "MAPSNAP_CMDS_ADD_SAVE";
const ENV_ADD_PLACES: &str = "MAPSNAP_CMDS_ADD_PLACES";

/// Run the mapsnap CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when arguments or configuration are invalid, a query
/// fails, or a save file cannot be read or written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    let session = cli.session.into_config()?;
    init_logging(&session.log_level)?;
    let mut stdout = std::io::stdout().lock();
    dispatch(cli.command, &session, &HttpSourceBuilder, &mut stdout)
}

fn dispatch<B: SourceBuilder>(
    command: Command,
    session: &SessionConfig,
    builder: &B,
    writer: &mut dyn Write,
) -> Result<(), CliError> {
    match command {
        Command::Discover(args) => run_discover_with(args, session, builder, writer),
        Command::Refine(args) => run_refine_with(args, session, builder, writer),
        Command::Add(args) => run_add_with(args, session, builder, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "mapsnap",
    about = "Fetch map data for named places from an Overpass interpreter",
    version
)]
struct Cli {
    #[command(flatten)]
    session: SessionArgs,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Find places by name and collect the map around them.
    Discover(DiscoverArgs),
    /// Replace a saved map with everything inside new bounds.
    Refine(RefineArgs),
    /// Append the ways of more places to a saved map.
    Add(AddArgs),
}

#[cfg(test)]
mod tests;
