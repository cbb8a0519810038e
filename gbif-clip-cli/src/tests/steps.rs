//! Behaviour-driven step definitions driving the fetch CLI scenarios.

use super::helpers::{
    LayerFiles, LayerOverrides, feature_count, four_occurrence_server, merge_layers,
};
use super::*;
use gbif_clip_core::CancelFlag;
use gbif_clip_data::test_support::CannedServer;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use std::cell::RefCell;

/// Aggregates fetch CLI scenario state so each step only needs a single world
/// argument.
#[derive(Debug)]
struct FetchWorld {
    layer_files: LayerFiles,
    server: RefCell<Option<CannedServer>>,
    cli_args: RefCell<Vec<String>>,
    cli_result: RefCell<Option<Result<FetchCommandConfig, CliError>>>,
    run_result: RefCell<Option<Result<String, CliError>>>,
    config_layer: RefCell<Option<LayerOverrides>>,
    env_layer: RefCell<Option<LayerOverrides>>,
}

impl FetchWorld {
    fn new() -> Self {
        Self {
            layer_files: LayerFiles::new(),
            server: RefCell::new(None),
            cli_args: RefCell::new(Vec::new()),
            cli_result: RefCell::new(None),
            run_result: RefCell::new(None),
            config_layer: RefCell::new(None),
            env_layer: RefCell::new(None),
        }
    }

    fn parse_fetch_args(&self) -> Result<FetchArgs, CliError> {
        let mut invocation = vec!["gbif-clip".to_owned(), "fetch".to_owned()];
        invocation.extend(self.cli_args.borrow().iter().cloned());
        let cli = Cli::try_parse_from(invocation).map_err(CliError::ArgumentParsing)?;
        let Command::Fetch(args) = cli.command;
        Ok(args)
    }

    fn config(&self) -> std::cell::Ref<'_, FetchCommandConfig> {
        std::cell::Ref::map(self.cli_result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect("expected success")
        })
    }
}

#[fixture]
fn world() -> FetchWorld {
    FetchWorld::new()
}

#[given("layer files exist on disk")]
fn layers_exist(#[from(world)] world: &FetchWorld) {
    let files = &world.layer_files;
    assert!(files.region().exists(), "expected the extent layer on disk");
    assert!(files.west().exists(), "expected the overlay layer on disk");
}

#[given("I pass the layer paths with CLI flags")]
fn cli_provides_paths(#[from(world)] world: &FetchWorld) {
    let files = &world.layer_files;
    world.cli_args.borrow_mut().extend([
        format!("--{ARG_EXTENT}"),
        files.region().to_string(),
        format!("--{ARG_OVERLAY}"),
        files.west().to_string(),
    ]);
}

#[given("I pass only the extent flag")]
fn cli_only_extent(#[from(world)] world: &FetchWorld) {
    let files = &world.layer_files;
    world
        .cli_args
        .borrow_mut()
        .extend([format!("--{ARG_EXTENT}"), files.region().to_string()]);
}

#[given("the layer paths are provided via a config file")]
fn provided_via_config(#[from(world)] world: &FetchWorld) {
    let files = &world.layer_files;
    *world.config_layer.borrow_mut() = Some(LayerOverrides {
        extent: Some(files.config_region().to_path_buf()),
        overlay: Some(files.config_west().to_path_buf()),
    });
}

#[given("the overlay path is overridden via environment variables")]
fn overlay_overridden_by_env(#[from(world)] world: &FetchWorld) {
    *world.env_layer.borrow_mut() = Some(LayerOverrides {
        overlay: Some(world.layer_files.env_west().to_path_buf()),
        ..LayerOverrides::default()
    });
}

#[given("a search endpoint serving four occurrences")]
fn search_endpoint(#[from(world)] world: &FetchWorld) {
    let server = four_occurrence_server();
    world.cli_args.borrow_mut().extend([
        format!("--{ARG_BASE_URL}"),
        server.base_url().to_owned(),
        format!("--{ARG_OUTPUT_DIR}"),
        world.layer_files.output_dir().to_string(),
        format!("--{ARG_TIMEOUT_SECS}"),
        "5".to_owned(),
    ]);
    world.server.replace(Some(server));
}

#[when("I configure the fetch command")]
fn configure_fetch(#[from(world)] world: &FetchWorld) {
    let file_layer = world.config_layer.borrow().clone();
    let env_layer = world.env_layer.borrow().clone();
    let outcome = world.parse_fetch_args().and_then(|args| {
        if file_layer.is_some() || env_layer.is_some() {
            merge_layers(args, file_layer, env_layer)
        } else {
            resolve_fetch_config(args)
        }
    });
    world.cli_result.replace(Some(outcome));
}

#[when("I run the fetch command")]
fn run_fetch_command(#[from(world)] world: &FetchWorld) {
    let outcome = world.parse_fetch_args().and_then(|args| {
        let mut stdout = Vec::new();
        run_fetch_with(args, &CancelFlag::default(), &mut stdout)?;
        Ok(String::from_utf8(stdout).expect("stdout utf-8"))
    });
    world.run_result.replace(Some(outcome));
}

#[then("the fetch plan uses the CLI-provided layer paths")]
fn plan_uses_cli_paths(#[from(world)] world: &FetchWorld) {
    let config = world.config();
    assert_eq!(config.extent, world.layer_files.region());
    assert_eq!(config.overlay, world.layer_files.west());
}

#[then("the CLI reports that the overlay flag is missing")]
fn reports_missing_overlay(#[from(world)] world: &FetchWorld) {
    let borrowed = world.cli_result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_OVERLAY),
        other => panic!("unexpected error {other:?}"),
    }
}

#[then("CLI and environment layers override configuration defaults")]
fn precedence_holds(#[from(world)] world: &FetchWorld) {
    let config = world.config();
    assert_eq!(config.extent, world.layer_files.region());
    assert_eq!(config.overlay, world.layer_files.env_west());
}

#[then("two occurrences are written to the clip layer")]
fn clip_layer_written(#[from(world)] world: &FetchWorld) {
    let borrowed = world.run_result.borrow();
    let printed = borrowed
        .as_ref()
        .expect("run recorded")
        .as_ref()
        .expect("expected success");
    assert!(printed.starts_with("2 of 4 GBIF occurrences fall inside the overlay"));
    let layer = world
        .layer_files
        .output_dir()
        .join("GBIF Occurrences-0")
        .join("resultwest.geojson");
    assert_eq!(feature_count(&layer), 2);
}

macro_rules! register_fetch_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/fetch_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: FetchWorld) {
            let _ = world;
        }
    };
}

register_fetch_scenario!(cli_flag_selection, "selecting layer paths via CLI flags");
register_fetch_scenario!(rejecting_missing_overlay, "rejecting a missing overlay");
register_fetch_scenario!(
    layering_cli_config_env,
    "layering CLI, config file, and environment values"
);
register_fetch_scenario!(
    fetching_and_clipping,
    "fetching and clipping against a search endpoint"
);
