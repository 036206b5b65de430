//! Focused unit tests covering CLI configuration resolution.

use super::*;
use crate::add::{AddConfig, track_places};
use crate::discover::DiscoverConfig;
use crate::refine::RefineConfig;
use crate::session::session_config_from_layers_for_test;
use camino::Utf8PathBuf;
use mapsnap_data::{DEFAULT_ENDPOINT, DEFAULT_MAX_CONCURRENT_REQUESTS, DEFAULT_USER_AGENT};
use rstest::rstest;
use std::time::Duration;

fn refine_args() -> RefineArgs {
    RefineArgs {
        save: Some(Utf8PathBuf::from("park.xml")),
        output: None,
        west: Some(-2.0),
        south: Some(-1.0),
        east: Some(2.0),
        north: Some(1.0),
    }
}

#[rstest]
#[case(None, Some(Utf8PathBuf::from("out.xml")), ARG_PLACES, ENV_DISCOVER_PLACES)]
#[case(Some(Vec::new()), Some(Utf8PathBuf::from("out.xml")), ARG_PLACES, ENV_DISCOVER_PLACES)]
#[case(Some(vec!["Example Park".to_owned()]), None, ARG_OUTPUT, ENV_DISCOVER_OUTPUT)]
fn discover_without_required_fields_errors(
    #[case] places: Option<Vec<String>>,
    #[case] output: Option<Utf8PathBuf>,
    #[case] field: &'static str,
    #[case] env_var: &'static str,
) {
    let args = DiscoverArgs { places, output };
    let err = DiscoverConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
#[case::save(ARG_SAVE, ENV_REFINE_SAVE)]
#[case::west(ARG_WEST, ENV_REFINE_WEST)]
#[case::south(ARG_SOUTH, ENV_REFINE_SOUTH)]
#[case::east(ARG_EAST, ENV_REFINE_EAST)]
#[case::north(ARG_NORTH, ENV_REFINE_NORTH)]
fn refine_without_required_fields_errors(#[case] field: &'static str, #[case] env_var: &'static str) {
    let mut args = refine_args();
    match field {
        ARG_SAVE => args.save = None,
        ARG_WEST => args.west = None,
        ARG_SOUTH => args.south = None,
        ARG_EAST => args.east = None,
        _ => args.north = None,
    }
    let err = RefineConfig::try_from(args).expect_err("missing field should error");
    match err {
        CliError::MissingArgument {
            field: missing,
            env,
        } => {
            assert_eq!(missing, field);
            assert_eq!(env, env_var);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn refine_builds_the_box_and_defaults_output_to_input() {
    let config = RefineConfig::try_from(refine_args()).expect("config should build");
    assert_eq!(config.output, config.save);
    assert_eq!(config.bbox.x_min, -2.0);
    assert_eq!(config.bbox.y_min, -1.0);
    assert_eq!(config.bbox.x_max, 2.0);
    assert_eq!(config.bbox.y_max, 1.0);
}

#[rstest]
#[case::west_of_east(3.0, -1.0, 2.0, 1.0)]
#[case::south_of_north(-2.0, 2.0, 2.0, 1.0)]
#[case::not_a_number(f64::NAN, -1.0, 2.0, 1.0)]
fn refine_rejects_inverted_bounds(
    #[case] west: f64,
    #[case] south: f64,
    #[case] east: f64,
    #[case] north: f64,
) {
    let args = RefineArgs {
        west: Some(west),
        south: Some(south),
        east: Some(east),
        north: Some(north),
        ..refine_args()
    };
    let err = RefineConfig::try_from(args).expect_err("inverted bounds should error");
    assert!(
        matches!(err, CliError::EmptyBoundingBox { .. }),
        "unexpected error {err:?}"
    );
}

#[rstest]
fn add_requires_places_and_save() {
    let err = AddConfig::try_from(AddArgs {
        places: None,
        save: Some(Utf8PathBuf::from("park.xml")),
        output: None,
    })
    .expect_err("missing places should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_PLACES);
            assert_eq!(env, ENV_ADD_PLACES);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }

    let err = AddConfig::try_from(AddArgs {
        places: Some(vec!["Duck Pond".to_owned()]),
        save: None,
        output: None,
    })
    .expect_err("missing save should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_SAVE);
            assert_eq!(env, ENV_ADD_SAVE);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn add_defaults_output_to_input() {
    let config = AddConfig::try_from(AddArgs {
        places: Some(vec!["Duck Pond".to_owned()]),
        save: Some(Utf8PathBuf::from("park.xml")),
        output: None,
    })
    .expect("config should build");
    assert_eq!(config.output, Utf8PathBuf::from("park.xml"));
}

#[rstest]
fn tracked_places_keep_order_without_duplicates() {
    let tracked = track_places(
        vec!["Example Park".to_owned()],
        &["Duck Pond".to_owned(), "Example Park".to_owned()],
    );
    assert_eq!(tracked, vec!["Example Park", "Duck Pond"]);
}

#[rstest]
fn session_defaults_match_the_data_crate() {
    let config = SessionConfig::try_from(SessionArgs::default()).expect("defaults build");
    assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
    assert_eq!(config.max_concurrent, DEFAULT_MAX_CONCURRENT_REQUESTS);
    assert_eq!(config.timeout, None);
    assert_eq!(config.log_level, "info");
}

#[rstest]
fn session_rejects_a_zero_request_budget() {
    let args = SessionArgs {
        max_concurrent: Some(0),
        ..SessionArgs::default()
    };
    let err = SessionConfig::try_from(args).expect_err("zero budget should error");
    assert!(matches!(err, CliError::ZeroConcurrency), "unexpected error {err:?}");
}

#[rstest]
fn session_layers_honour_precedence() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "endpoint": "https://from-file.invalid/api/interpreter",
            "max_concurrent": 2,
            "timeout_secs": 30,
        }),
        None,
    );
    composer.push_environment(json!({
        "endpoint": "https://from-env.invalid/api/interpreter",
        "log_level": "debug",
    }));
    composer.push_cli(json!({ "max_concurrent": 4 }));

    let config =
        session_config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.endpoint, "https://from-env.invalid/api/interpreter");
    assert_eq!(config.max_concurrent, 4);
    assert_eq!(config.timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.log_level, "debug");
}

#[rstest]
fn session_layers_map_configuration_errors() {
    use ortho_config::MergeComposer;
    use serde_json::json;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "max_concurrent": "many" }));

    let err = session_config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn sessions_honour_the_request_budget() {
    let config = SessionConfig {
        max_concurrent: 3,
        ..SessionConfig::default()
    };
    let session = config.session(
        mapsnap_core::EntityStore::new(),
        mapsnap_data::transport::StubQuerySource::new(),
    );
    assert_eq!(session.transport().capacity(), 3);
}
