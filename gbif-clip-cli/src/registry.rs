//! Directory-backed [`LayerRegistry`].
//!
//! Each group is a directory under the output root and each layer a GeoJSON
//! `FeatureCollection` of points named `<layer>.geojson`. Attributes are
//! written as string properties in schema order.

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8::Dir;
use gbif_clip_core::{
    GroupHandle, LayerRegistry, OccurrenceCollection, RegistryError, unique_group_name,
};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value};
use log::info;

use crate::CliError;
use crate::fs::create_and_open_dir;

/// Registry writing layers beneath an output directory.
#[derive(Debug)]
pub(crate) struct DirectoryLayerRegistry {
    root: Utf8PathBuf,
    dir: Dir,
    written: Vec<Utf8PathBuf>,
}

impl DirectoryLayerRegistry {
    /// Open `root`, creating it when missing.
    pub(crate) fn open(root: &Utf8Path) -> Result<Self, CliError> {
        let dir = create_and_open_dir(root).map_err(|source| CliError::OpenOutputDirectory {
            path: root.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root: root.to_path_buf(),
            dir,
            written: Vec::new(),
        })
    }

    /// Files written so far, in registration order.
    pub(crate) fn written(&self) -> &[Utf8PathBuf] {
        &self.written
    }
}

impl LayerRegistry for DirectoryLayerRegistry {
    fn create_unique_group(&mut self, prefix: &str) -> Result<GroupHandle, RegistryError> {
        let name = unique_group_name(prefix, |candidate| self.dir.exists(candidate));
        self.dir
            .create_dir(&name)
            .map_err(|source| RegistryError::CreateGroup {
                prefix: prefix.to_owned(),
                source: Box::new(source),
            })?;
        info!("created layer group {}", self.root.join(&name));
        Ok(GroupHandle::new(name))
    }

    fn register_layer(
        &mut self,
        group: &GroupHandle,
        layer: &OccurrenceCollection,
    ) -> Result<(), RegistryError> {
        let failure = |source: std::io::Error| RegistryError::RegisterLayer {
            group: group.name().to_owned(),
            layer: layer.name().to_owned(),
            source: Box::new(source),
        };
        let file_name = layer_file_name(layer.name());
        let group_dir = self.dir.open_dir(group.name()).map_err(failure)?;
        group_dir
            .write(&file_name, feature_collection(layer).to_string())
            .map_err(failure)?;
        self.written
            .push(self.root.join(group.name()).join(file_name));
        Ok(())
    }
}

/// File name for a layer, with path separators replaced.
fn layer_file_name(layer: &str) -> String {
    format!("{}.geojson", layer.replace(['/', '\\'], "_"))
}

fn feature_collection(layer: &OccurrenceCollection) -> FeatureCollection {
    let features = layer
        .iter()
        .map(|feature| {
            let properties: JsonObject = feature
                .attributes
                .fields()
                .map(|(field, value)| (field.to_owned(), JsonValue::from(value)))
                .collect();
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![
                    feature.geometry.x(),
                    feature.geometry.y(),
                ]))),
                id: None,
                properties: Some(properties),
                foreign_members: None,
            }
        })
        .collect();
    let mut members = JsonObject::new();
    members.insert("name".to_owned(), JsonValue::from(layer.name()));
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: Some(members),
    }
}
