//! Canned interpreter responses and a stub source builder.

use super::*;
use camino::Utf8PathBuf;
use mapsnap_data::transport::StubQuerySource;
use tempfile::TempDir;

pub(super) const PARK: &str = r#"<osm>
  <way id="100"><nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="name" v="Example Park"/><tag k="leisure" v="park"/></way>
  <node id="1" lat="1" lon="-1"/><node id="2" lat="1" lon="1"/>
  <node id="3" lat="-1" lon="1"/><node id="4" lat="-1" lon="-1"/>
</osm>"#;

pub(super) const AREA: &str = r#"<osm>
  <way id="100"><nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
    <tag k="name" v="Example Park"/><tag k="leisure" v="park"/></way>
  <way id="200"><nd ref="5"/><nd ref="6"/><tag k="highway" v="footway"/></way>
  <node id="1" lat="1" lon="-1"/><node id="2" lat="1" lon="1"/>
  <node id="3" lat="-1" lon="1"/><node id="4" lat="-1" lon="-1"/>
  <node id="5" lat="0" lon="-0.5"/><node id="6" lat="0" lon="0.5"/>
</osm>"#;

pub(super) const POND: &str = r#"<osm>
  <way id="300"><nd ref="7"/><nd ref="8"/><nd ref="9"/><nd ref="7"/>
    <tag k="name" v="Duck Pond"/></way>
  <node id="7" lat="5" lon="5"/><node id="8" lat="5" lon="6"/><node id="9" lat="6" lon="6"/>
</osm>"#;

/// Interpreter that knows Example Park, its surroundings and Duck Pond.
pub(super) fn interpreter() -> StubQuerySource {
    StubQuerySource::new()
        .with_route("Example Park", PARK)
        .with_route("Duck Pond", POND)
        .with_route("bbox-query", AREA)
}

/// Hands out clones of one stub so tests can inspect what it received.
#[derive(Debug, Clone)]
pub(super) struct StubSourceBuilder {
    pub(super) source: StubQuerySource,
}

impl StubSourceBuilder {
    pub(super) fn new(source: StubQuerySource) -> Self {
        Self { source }
    }
}

impl SourceBuilder for StubSourceBuilder {
    type Source = StubQuerySource;

    fn build(&self, _config: &SessionConfig) -> Result<Self::Source, CliError> {
        Ok(self.source.clone())
    }
}

/// A temporary directory addressed through a UTF-8 path.
pub(super) struct SaveDir {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl SaveDir {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }
}

impl std::fmt::Debug for SaveDir {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveDir").field("root", &self.root).finish()
    }
}
