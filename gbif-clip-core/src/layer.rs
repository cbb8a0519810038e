//! Host-facing layer capabilities.
//!
//! The pipeline never talks to a concrete map host. It asks a
//! [`LayerSelectionPort`] for its two polygon inputs and hands its results
//! to a [`LayerRegistry`], which owns naming and storage.

use std::{error::Error as StdError, fmt};

use geo::MultiPolygon;
use thiserror::Error;

use crate::{ExtentError, OccurrenceCollection, SpatialExtent};

/// Default prefix for result groups.
pub const DEFAULT_GROUP_PREFIX: &str = "GBIF Occurrences";

/// A named layer of polygons.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonLayer {
    /// Display name of the layer.
    pub name: String,
    /// Polygons in WGS84 degrees.
    pub polygons: MultiPolygon<f64>,
}

impl PolygonLayer {
    /// Construct a layer.
    #[must_use]
    pub fn new(name: impl Into<String>, polygons: MultiPolygon<f64>) -> Self {
        Self {
            name: name.into(),
            polygons,
        }
    }

    /// Bounding extent of the layer's polygons.
    ///
    /// # Errors
    /// Fails as [`SpatialExtent::from_polygons`] does.
    pub fn extent(&self) -> Result<SpatialExtent, ExtentError> {
        SpatialExtent::from_polygons(&self.polygons)
    }
}

/// Which input the pipeline is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Polygon whose bounding box defines the remote query.
    Extent,
    /// Polygon layer the fetched points are clipped against.
    Overlay,
}

impl fmt::Display for LayerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extent => f.write_str("extent polygon"),
            Self::Overlay => f.write_str("overlay layer"),
        }
    }
}

/// Supplies the pipeline's input layers.
pub trait LayerSelectionPort {
    /// Return the chosen layer, or `None` when nothing was selected.
    fn choose(&mut self, kind: LayerKind) -> Option<PolygonLayer>;
}

/// Opaque handle to a group created by a [`LayerRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupHandle {
    name: String,
}

impl GroupHandle {
    /// Wrap a registry-assigned group name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    /// Unique group name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for GroupHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Errors reported by a [`LayerRegistry`].
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A group could not be created.
    #[error("failed to create layer group with prefix {prefix:?}: {source}")]
    CreateGroup {
        /// Requested prefix.
        prefix: String,
        /// Host-specific cause.
        source: Box<dyn StdError + Send + Sync>,
    },
    /// A layer could not be added to its group.
    #[error("failed to register layer {layer:?} in group {group:?}: {source}")]
    RegisterLayer {
        /// Target group name.
        group: String,
        /// Layer name.
        layer: String,
        /// Host-specific cause.
        source: Box<dyn StdError + Send + Sync>,
    },
}

/// Destination for pipeline result layers.
///
/// A registry lives for one pipeline run; the host tears it down.
pub trait LayerRegistry {
    /// Create a group whose name starts with `prefix` and collides with no
    /// existing group.
    fn create_unique_group(&mut self, prefix: &str) -> Result<GroupHandle, RegistryError>;

    /// Add `layer` to `group`.
    fn register_layer(
        &mut self,
        group: &GroupHandle,
        layer: &OccurrenceCollection,
    ) -> Result<(), RegistryError>;
}

/// First `"{prefix}-{n}"`, counting from zero, for which `exists` is false.
///
/// # Examples
/// ```
/// use gbif_clip_core::unique_group_name;
///
/// let taken = ["GBIF Occurrences-0", "GBIF Occurrences-1"];
/// let name = unique_group_name("GBIF Occurrences", |n| taken.contains(&n));
/// assert_eq!(name, "GBIF Occurrences-2");
/// ```
pub fn unique_group_name(prefix: &str, mut exists: impl FnMut(&str) -> bool) -> String {
    (0_u64..)
        .map(|counter| format!("{prefix}-{counter}"))
        .find(|candidate| !exists(candidate))
        .unwrap_or_else(|| format!("{prefix}-{}", u64::MAX))
}
