//! Save-file plumbing and the JSON summary printed after each command.

use std::collections::BTreeSet;
use std::io::{BufReader, BufWriter, Write};

use camino::{Utf8Path, Utf8PathBuf};
use mapsnap_core::{EntityStore, MapBoundingBox, QueryResult, WayKind};
use mapsnap_data::{SaveFile, read_save, write_save};
use serde::{Deserialize, Serialize};

use crate::CliError;

/// Fail unless `path` names an existing save file.
pub(crate) fn require_save(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
    match mapsnap_fs::save_exists(path) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CliError::MissingSaveFile {
            field,
            path: path.to_path_buf(),
        }),
        Err(source) => Err(CliError::InspectSavePath {
            field,
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Load the save at `path` into `store`.
pub(crate) fn load_save(path: &Utf8Path, store: &mut EntityStore) -> Result<SaveFile, CliError> {
    let file = mapsnap_fs::open_save(path).map_err(|source| CliError::OpenSave {
        path: path.to_path_buf(),
        source,
    })?;
    let save = read_save(BufReader::new(file), store).map_err(|source| CliError::ReadSave {
        path: path.to_path_buf(),
        source,
    })?;
    log::info!(
        "loaded {} ways and {} places from {path}",
        save.result.len(),
        save.places.len()
    );
    Ok(save)
}

/// Write `places` and `result` to `path`, replacing any previous save.
pub(crate) fn store_save(
    path: &Utf8Path,
    places: &[String],
    result: &QueryResult,
    store: &EntityStore,
) -> Result<(), CliError> {
    let file = mapsnap_fs::create_save(path).map_err(|source| CliError::CreateSave {
        path: path.to_path_buf(),
        source,
    })?;
    write_save(BufWriter::new(file), places, result, store).map_err(|source| {
        CliError::WriteSave {
            path: path.to_path_buf(),
            source,
        }
    })?;
    log::info!("wrote {} ways to {path}", result.len());
    Ok(())
}

/// Machine-readable outcome of one command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct MapSummary {
    pub(crate) command: String,
    pub(crate) save: Utf8PathBuf,
    pub(crate) places: Vec<String>,
    pub(crate) bbox: MapBoundingBox,
    pub(crate) ways: usize,
    pub(crate) highways: usize,
    pub(crate) polygons: usize,
    pub(crate) nodes: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) added: Option<usize>,
}

impl MapSummary {
    pub(crate) fn describe(
        command: &str,
        save: &Utf8Path,
        places: &[String],
        result: &QueryResult,
        store: &EntityStore,
    ) -> Self {
        let highways = result
            .ways
            .iter()
            .filter(|way| store.way_kind(**way) == WayKind::Highway)
            .count();
        let nodes: BTreeSet<_> = result
            .ways
            .iter()
            .flat_map(|way| store.way(*way).nodes.iter().copied())
            .collect();
        Self {
            command: command.to_owned(),
            save: save.to_path_buf(),
            places: places.to_vec(),
            bbox: result.bbox,
            ways: result.len(),
            highways,
            polygons: result.len() - highways,
            nodes: nodes.len(),
            added: None,
        }
    }

    #[must_use]
    pub(crate) fn with_added(mut self, added: usize) -> Self {
        self.added = Some(added);
        self
    }
}

pub(crate) fn write_summary(writer: &mut dyn Write, summary: &MapSummary) -> Result<(), CliError> {
    let payload = serde_json::to_string_pretty(summary).map_err(CliError::SerialiseSummary)?;
    writer
        .write_all(payload.as_bytes())
        .map_err(CliError::WriteSummary)?;
    writer.write_all(b"\n").map_err(CliError::WriteSummary)?;
    Ok(())
}
