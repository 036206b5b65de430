//! Behavioural tests for [`QuerySession::discover`] and the save format.
//!
//! Scenarios run against [`StubQuerySource`], so no interpreter is needed.

use mapsnap_core::{EntityStore, MapBoundingBox, MapPoint, QueryResult};
use mapsnap_data::transport::{StubQuerySource, block_on_for_tests};
use mapsnap_data::{QueryError, QuerySession, SaveFile, read_save, write_save};
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;
use std::fs::File;
use tempfile::TempDir;

const PARK_BY_NAME: &str = r#"<osm version="0.6">
  <note>The data included in this document is from www.openstreetmap.org.</note>
  <meta osm_base="2024-05-01T00:00:00Z"/>
  <way id="100">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/>
    <tag k="name" v="Example Park"/><tag k="leisure" v="park"/>
  </way>
  <node id="1" lat="1" lon="-1"/>
  <node id="2" lat="1" lon="1"/>
  <node id="3" lat="-1" lon="1"/>
  <node id="4" lat="-1" lon="-1"/>
</osm>"#;

const PARK_SURROUNDINGS: &str = r#"<osm version="0.6">
  <way id="100">
    <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/>
    <tag k="name" v="Example Park"/><tag k="leisure" v="park"/>
  </way>
  <way id="200">
    <nd ref="5"/><nd ref="6"/>
    <tag k="highway" v="footway"/>
  </way>
  <node id="5" lat="0" lon="-0.5"/>
</osm>"#;

const NODE_SIX: &str = r#"<osm version="0.6"><node id="6" lat="0.25" lon="0.5"/></osm>"#;

const ERROR_PAGE: &str = "<html><body><p>Too many requests</p></body></html>";

#[derive(Debug, Default)]
struct DiscoveryContext {
    source: RefCell<Option<StubQuerySource>>,
    store: RefCell<EntityStore>,
    outcome: RefCell<Option<Result<Option<QueryResult>, QueryError>>>,
    reloaded: RefCell<Option<(SaveFile, EntityStore)>>,
}

impl DiscoveryContext {
    fn discovered(&self) -> QueryResult {
        self.outcome
            .borrow()
            .as_ref()
            .expect("discovery was attempted")
            .as_ref()
            .expect("discovery succeeded")
            .clone()
            .expect("a result was found")
    }

    fn discover(&self, places: &[&str]) {
        let source = self
            .source
            .borrow_mut()
            .take()
            .expect("interpreter configured");
        let mut session = QuerySession::new(source);
        let outcome = block_on_for_tests(session.discover(places));
        *self.store.borrow_mut() = session.into_store();
        *self.outcome.borrow_mut() = Some(outcome);
    }
}

#[fixture]
fn discovery() -> DiscoveryContext {
    DiscoveryContext::default()
}

// --- Given steps ---

#[given("an interpreter that knows \"Example Park\"")]
fn park_interpreter(#[from(discovery)] ctx: &DiscoveryContext) {
    let stub = StubQuerySource::new()
        .with_route("Example Park", PARK_BY_NAME)
        .with_route("bbox-query", PARK_SURROUNDINGS)
        .with_route(r#"ref="6""#, NODE_SIX);
    *ctx.source.borrow_mut() = Some(stub);
}

#[given("the interpreter answers \"Busy Square\" with an error page")]
fn busy_route(#[from(discovery)] ctx: &DiscoveryContext) {
    let stub = ctx
        .source
        .borrow_mut()
        .take()
        .expect("interpreter configured");
    *ctx.source.borrow_mut() = Some(stub.with_route("Busy Square", ERROR_PAGE));
}

#[given("an unreachable interpreter")]
fn unreachable_interpreter(#[from(discovery)] ctx: &DiscoveryContext) {
    *ctx.source.borrow_mut() = Some(StubQuerySource::new().failing("connection refused"));
}

// --- When steps ---

#[when("I discover \"Example Park\"")]
fn discover_park(#[from(discovery)] ctx: &DiscoveryContext) {
    ctx.discover(&["Example Park"]);
}

#[when("I discover \"Atlantis\"")]
fn discover_atlantis(#[from(discovery)] ctx: &DiscoveryContext) {
    ctx.discover(&["Atlantis"]);
}

#[when("I discover \"Example Park\" and \"Busy Square\"")]
fn discover_park_and_square(#[from(discovery)] ctx: &DiscoveryContext) {
    ctx.discover(&["Example Park", "Busy Square"]);
}

#[when("I save the map and load it into a fresh store")]
fn save_and_reload(#[from(discovery)] ctx: &DiscoveryContext) {
    let result = ctx.discovered();
    let dir = TempDir::new().expect("temporary directory");
    let path = dir.path().join("example-park.xml");
    let file = File::create(&path).expect("create save file");
    write_save(file, &["Example Park"], &result, &ctx.store.borrow()).expect("write save");

    let mut fresh = EntityStore::new();
    let file = File::open(&path).expect("open save file");
    let save = read_save(file, &mut fresh).expect("read save");
    *ctx.reloaded.borrow_mut() = Some((save, fresh));
}

// --- Then steps ---

#[then("the bounding box spans -1 to 1 on both axes")]
fn bbox_spans_unit_square(#[from(discovery)] ctx: &DiscoveryContext) {
    let expected = MapBoundingBox::from_corners(MapPoint::new(-1.0, -1.0), MapPoint::new(1.0, 1.0));
    assert_eq!(ctx.discovered().bbox, expected);
}

#[then("the result holds 2 ways")]
fn two_ways(#[from(discovery)] ctx: &DiscoveryContext) {
    assert_eq!(ctx.discovered().len(), 2);
}

#[then("no result is returned")]
fn nothing_found(#[from(discovery)] ctx: &DiscoveryContext) {
    let outcome = ctx.outcome.borrow();
    assert!(
        matches!(&*outcome, Some(Ok(None))),
        "expected no result, got {outcome:?}"
    );
}

#[then("a transport error is reported")]
fn transport_error(#[from(discovery)] ctx: &DiscoveryContext) {
    let outcome = ctx.outcome.borrow();
    assert!(
        matches!(&*outcome, Some(Err(QueryError::Transport(_)))),
        "expected a transport error, got {outcome:?}"
    );
}

#[then("the loaded map matches the discovered map")]
fn loaded_matches(#[from(discovery)] ctx: &DiscoveryContext) {
    let original = ctx.discovered();
    let store = ctx.store.borrow();
    let reloaded = ctx.reloaded.borrow();
    let (save, fresh) = reloaded.as_ref().expect("map was reloaded");

    assert_eq!(save.places, vec!["Example Park".to_owned()]);
    assert_eq!(save.result.bbox, original.bbox);
    let ids = |store: &EntityStore, result: &QueryResult| -> Vec<String> {
        result
            .ways
            .iter()
            .map(|way| store.way(*way).id().to_owned())
            .collect()
    };
    assert_eq!(ids(fresh, &save.result), ids(&*store, &original));

    let six = fresh.find_node("6").expect("node 6 restored");
    assert_eq!(fresh.node(six).location, MapPoint::new(0.5, 0.25));
}

// --- Scenario registrations ---

macro_rules! register_scenario {
    ($fn_name:ident, $title:literal) => {
        #[scenario(path = "tests/features/discovery.feature", name = $title)]
        fn $fn_name(discovery: DiscoveryContext) {
            let _ = discovery;
        }
    };
}

register_scenario!(
    discovering_a_park,
    "discovering a park populates its surroundings"
);
register_scenario!(
    discovering_an_unknown_place,
    "discovering an unknown place finds nothing"
);
register_scenario!(
    skipping_error_pages,
    "error pages from the interpreter are skipped"
);
register_scenario!(
    aborting_on_network_failure,
    "a network failure aborts discovery"
);
register_scenario!(
    saving_and_reloading,
    "a discovered map survives a save and reload"
);
