//! GeoJSON polygon layers and file-backed layer selection.
//!
//! Any GeoJSON object is accepted. Polygon and multipolygon geometries are
//! collected, including those nested in geometry collections; every other
//! geometry is ignored.

use camino::Utf8Path;
use gbif_clip_core::{LayerKind, LayerSelectionPort, PolygonLayer};
use geo::{MultiPolygon, Polygon};
use geojson::{GeoJson, Geometry, Value};
use log::debug;

use crate::CliError;
use crate::fs::read_utf8;

/// Read `path` as a polygon layer named after the file stem.
pub(crate) fn read_polygon_layer(path: &Utf8Path) -> Result<PolygonLayer, CliError> {
    let text = read_utf8(path).map_err(|source| CliError::ReadLayer {
        path: path.to_path_buf(),
        source,
    })?;
    let parse_error = |source: geojson::Error| CliError::ParseLayer {
        path: path.to_path_buf(),
        source: Box::new(source),
    };
    let document = text.parse::<GeoJson>().map_err(parse_error)?;
    let polygons = collect_polygons(document).map_err(parse_error)?;
    let name = path.file_stem().unwrap_or(path.as_str());
    debug!("read {} polygons from {path}", polygons.0.len());
    Ok(PolygonLayer::new(name, polygons))
}

fn collect_polygons(document: GeoJson) -> Result<MultiPolygon<f64>, geojson::Error> {
    let geometries: Vec<Geometry> = match document {
        GeoJson::Geometry(geometry) => vec![geometry],
        GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .collect(),
    };
    let mut polygons = Vec::new();
    for geometry in geometries {
        push_polygons(geometry.value, &mut polygons)?;
    }
    Ok(MultiPolygon::new(polygons))
}

fn push_polygons(value: Value, polygons: &mut Vec<Polygon<f64>>) -> Result<(), geojson::Error> {
    match value {
        polygon @ Value::Polygon(_) => polygons.push(Polygon::try_from(polygon)?),
        multi @ Value::MultiPolygon(_) => polygons.extend(MultiPolygon::<f64>::try_from(multi)?.0),
        Value::GeometryCollection(members) => {
            for member in members {
                push_polygons(member.value, polygons)?;
            }
        }
        _ => debug!("ignoring non-polygon geometry"),
    }
    Ok(())
}

/// Selection port answering with layers read ahead of the run.
///
/// Each layer is handed out once.
#[derive(Debug, Default)]
pub(crate) struct FileSelection {
    extent: Option<PolygonLayer>,
    overlay: Option<PolygonLayer>,
}

impl FileSelection {
    /// Read both layers from disk.
    pub(crate) fn read(extent: &Utf8Path, overlay: &Utf8Path) -> Result<Self, CliError> {
        Ok(Self {
            extent: Some(read_polygon_layer(extent)?),
            overlay: Some(read_polygon_layer(overlay)?),
        })
    }
}

impl LayerSelectionPort for FileSelection {
    fn choose(&mut self, kind: LayerKind) -> Option<PolygonLayer> {
        match kind {
            LayerKind::Extent => self.extent.take(),
            LayerKind::Overlay => self.overlay.take(),
        }
    }
}
