//! Test helpers for composing layer files and layered overrides.

use super::*;
use camino::{Utf8Path, Utf8PathBuf};
use gbif_clip_data::test_support::{
    CannedResponse, CannedServer, occurrence_json, page_body, probe_body,
};
use std::fs;
use tempfile::TempDir;

/// GeoJSON polygon covering the given rectangle.
pub(super) fn rectangle_geojson(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> String {
    format!(
        r#"{{"type":"Feature","properties":{{}},"geometry":{{"type":"Polygon","coordinates":[[[{min_x},{min_y}],[{max_x},{min_y}],[{max_x},{max_y}],[{min_x},{max_y}],[{min_x},{min_y}]]]}}}}"#
    )
}

/// Temporary directory holding the extent and overlay layers.
///
/// `region.geojson` spans 10..20 in both axes and `west.geojson` its western
/// half. Alternative copies exist for configuration-layer tests.
#[derive(Debug)]
pub(super) struct LayerFiles {
    _dir: TempDir,
    root: Utf8PathBuf,
    region: Utf8PathBuf,
    west: Utf8PathBuf,
    config_region: Utf8PathBuf,
    config_west: Utf8PathBuf,
    env_west: Utf8PathBuf,
}

impl LayerFiles {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp dir");
        let region_json = rectangle_geojson(10.0, 10.0, 20.0, 20.0);
        let west_json = rectangle_geojson(10.0, 10.0, 15.0, 20.0);
        let write = |name: &str, contents: &str| {
            let path = root.join(name);
            fs::write(&path, contents).expect("write layer file");
            path
        };
        let region = write("region.geojson", &region_json);
        let west = write("west.geojson", &west_json);
        let config_region = write("config-region.geojson", &region_json);
        let config_west = write("config-west.geojson", &west_json);
        let env_west = write("env-west.geojson", &west_json);
        Self {
            _dir: dir,
            root,
            region,
            west,
            config_region,
            config_west,
            env_west,
        }
    }

    pub(super) fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub(super) fn region(&self) -> &Utf8Path {
        &self.region
    }

    pub(super) fn west(&self) -> &Utf8Path {
        &self.west
    }

    pub(super) fn config_region(&self) -> &Utf8Path {
        &self.config_region
    }

    pub(super) fn config_west(&self) -> &Utf8Path {
        &self.config_west
    }

    pub(super) fn env_west(&self) -> &Utf8Path {
        &self.env_west
    }

    /// Output root inside the temporary directory.
    pub(super) fn output_dir(&self) -> Utf8PathBuf {
        self.root.join("out")
    }

    /// Validated configuration for `region` and `west` against `base_url`.
    pub(super) fn config(&self, base_url: &str) -> FetchCommandConfig {
        FetchCommandConfig {
            extent: self.region.clone(),
            overlay: self.west.clone(),
            output_dir: self.output_dir(),
            base_url: base_url.to_owned(),
            max_records: gbif_clip_core::MAX_RECORDS,
            timeout: Some(std::time::Duration::from_secs(5)),
            register_fetch_layer: false,
        }
    }
}

/// Search endpoint answering one probe and one page of four occurrences,
/// two inside the western half of the region and two outside it.
pub(super) fn four_occurrence_server() -> CannedServer {
    let records = [(1, 12.0), (2, 14.0), (3, 16.0), (4, 18.0)]
        .into_iter()
        .map(|(id, longitude)| occurrence_json(id, longitude, 15.0))
        .collect();
    CannedServer::start(vec![
        CannedResponse::json(&probe_body(4)),
        CannedResponse::json(&page_body(records)),
    ])
    .expect("server")
}

/// Number of features in a written GeoJSON layer.
pub(super) fn feature_count(path: &Utf8Path) -> usize {
    let text = fs::read_to_string(path).expect("layer file");
    match text.parse::<geojson::GeoJson>().expect("valid GeoJSON") {
        geojson::GeoJson::FeatureCollection(collection) => collection.features.len(),
        other => panic!("expected a feature collection, found {other:?}"),
    }
}

#[derive(Debug, Clone, Default)]
pub(super) struct LayerOverrides {
    pub(super) extent: Option<Utf8PathBuf>,
    pub(super) overlay: Option<Utf8PathBuf>,
}

/// Resolve `cli_args` as if `file_layer` and `env_layer` sat beneath them.
pub(super) fn merge_layers(
    mut cli_args: FetchArgs,
    file_layer: Option<LayerOverrides>,
    env_layer: Option<LayerOverrides>,
) -> Result<FetchCommandConfig, CliError> {
    merge_field(
        &mut cli_args.extent,
        extract_field(&env_layer, |layer| &layer.extent),
        extract_field(&file_layer, |layer| &layer.extent),
    );
    merge_field(
        &mut cli_args.overlay,
        extract_field(&env_layer, |layer| &layer.overlay),
        extract_field(&file_layer, |layer| &layer.overlay),
    );
    let config = FetchCommandConfig::try_from(cli_args)?;
    config.validate_sources()?;
    Ok(config)
}

fn merge_field<T: Clone>(target: &mut Option<T>, env_value: Option<T>, file_value: Option<T>) {
    if target.is_none()
        && let Some(value) = env_value.or(file_value)
    {
        *target = Some(value);
    }
}

fn extract_field<T: Clone>(
    layer: &Option<LayerOverrides>,
    accessor: fn(&LayerOverrides) -> &Option<T>,
) -> Option<T> {
    layer.as_ref().and_then(|entry| accessor(entry).clone())
}
