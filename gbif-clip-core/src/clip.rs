//! Spatial clipping of occurrence collections against an overlay layer.
//!
//! The geometric work sits behind [`GeometryClipper`], so hosts with their
//! own geometry engine can plug it in. [`GeoClipper`] is the default,
//! built on `geo` containment predicates.
//!
//! [`ClipStage`] runs the clipper, registers the result and then sweeps the
//! result once to drive a progress bar to completion. Cancelling the sweep
//! stops the progress bar only; the registered result stays valid.

use std::iter;

use geo::{Intersects, LineString};
use log::info;
use thiserror::Error;

use crate::{
    CLIP_LABEL, GroupHandle, LayerRegistry, OccurrenceCollection, PolygonLayer, ProgressPort,
    RegistryError,
};

/// Errors raised while clipping.
#[derive(Debug, Error)]
pub enum ClipError {
    /// The overlay layer contains geometry the clipper cannot use.
    #[error("overlay layer {layer:?} has invalid geometry: {reason}")]
    InvalidGeometry {
        /// Overlay layer name.
        layer: String,
        /// What is wrong with it.
        reason: String,
    },
    /// The clip operation failed for another reason.
    #[error("clip operation failed: {message}")]
    Failed {
        /// Failure description.
        message: String,
    },
    /// The clip result could not be registered.
    #[error(transparent)]
    Register(#[from] RegistryError),
}

/// Polygon clip operation for point collections.
pub trait GeometryClipper {
    /// Return a new collection named `output_name` holding the features of
    /// `input` that fall inside `overlay`, in input order.
    fn clip(
        &self,
        input: &OccurrenceCollection,
        overlay: &PolygonLayer,
        output_name: &str,
    ) -> Result<OccurrenceCollection, ClipError>;
}

/// [`GeometryClipper`] using `geo` predicates.
///
/// A point is kept when it intersects any overlay polygon. Points on a
/// polygon boundary count as inside.
///
/// # Examples
/// ```
/// use gbif_clip_core::{GeoClipper, GeometryClipper, OccurrenceCollection};
/// use gbif_clip_core::test_support::rectangle_layer;
///
/// let overlay = rectangle_layer("park", 0.0, 0.0, 1.0, 1.0);
/// let empty = OccurrenceCollection::new("occurrences");
/// let result = GeoClipper.clip(&empty, &overlay, "resultpark")?;
/// assert!(result.is_empty());
/// assert_eq!(result.name(), "resultpark");
/// # Ok::<(), gbif_clip_core::ClipError>(())
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct GeoClipper;

impl GeometryClipper for GeoClipper {
    fn clip(
        &self,
        input: &OccurrenceCollection,
        overlay: &PolygonLayer,
        output_name: &str,
    ) -> Result<OccurrenceCollection, ClipError> {
        validate_overlay(overlay)?;
        let features = input
            .iter()
            .filter(|feature| {
                overlay
                    .polygons
                    .iter()
                    .any(|polygon| polygon.intersects(&feature.geometry))
            })
            .cloned()
            .collect();
        Ok(OccurrenceCollection::with_features(output_name, features))
    }
}

fn validate_overlay(overlay: &PolygonLayer) -> Result<(), ClipError> {
    let invalid = |reason: String| ClipError::InvalidGeometry {
        layer: overlay.name.clone(),
        reason,
    };
    for (index, polygon) in overlay.polygons.iter().enumerate() {
        for ring in iter::once(polygon.exterior()).chain(polygon.interiors()) {
            if !ring_is_finite(ring) {
                return Err(invalid(format!(
                    "polygon {index} has non-finite coordinates"
                )));
            }
            if ring.0.len() < 4 {
                return Err(invalid(format!(
                    "polygon {index} has a ring with fewer than four positions"
                )));
            }
        }
    }
    Ok(())
}

fn ring_is_finite(ring: &LineString<f64>) -> bool {
    ring.coords().all(|c| c.x.is_finite() && c.y.is_finite())
}

/// Name given to the clip result for an overlay layer.
#[must_use]
pub fn clip_layer_name(overlay_name: &str) -> String {
    format!("result{overlay_name}")
}

/// How far the post-clip progress sweep got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    /// Every feature was visited.
    Completed,
    /// The user stopped the sweep after `visited` features.
    Cancelled {
        /// Features visited before the cancellation was observed.
        visited: usize,
    },
}

/// Registered clip result plus the fate of its progress sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipReport {
    /// The clipped collection, already registered.
    pub result: OccurrenceCollection,
    /// Progress sweep status.
    pub sweep: SweepStatus,
}

/// Clip, register and sweep.
#[derive(Debug, Default, Clone)]
pub struct ClipStage<C> {
    clipper: C,
}

impl<C: GeometryClipper> ClipStage<C> {
    /// Stage using `clipper` for the geometry work.
    pub const fn new(clipper: C) -> Self {
        Self { clipper }
    }

    /// Clip `collection` against `overlay` and register the result in
    /// `group`.
    ///
    /// A clip or registration failure leaves nothing registered by this
    /// call. Cancelling through `progress` only cuts the sweep short.
    ///
    /// # Errors
    /// Fails as [`clip`](Self::clip) or [`publish`](Self::publish).
    pub fn run(
        &self,
        collection: &OccurrenceCollection,
        overlay: &PolygonLayer,
        registry: &mut dyn LayerRegistry,
        group: &GroupHandle,
        progress: &mut dyn ProgressPort,
    ) -> Result<ClipReport, ClipError> {
        let result = self.clip(collection, overlay)?;
        Self::publish(result, &overlay.name, registry, group, progress)
    }

    /// Clip `collection` against `overlay` into a layer named after the
    /// overlay. Registers nothing.
    ///
    /// # Errors
    /// Returns [`ClipError::InvalidGeometry`] for an unusable overlay.
    pub fn clip(
        &self,
        collection: &OccurrenceCollection,
        overlay: &PolygonLayer,
    ) -> Result<OccurrenceCollection, ClipError> {
        self.clipper.clip(collection, overlay, &clip_layer_name(&overlay.name))
    }

    /// Register a clipped `result` in `group`, then run the progress sweep.
    ///
    /// # Errors
    /// Returns [`ClipError::Register`] when the registry refuses the layer.
    pub fn publish(
        result: OccurrenceCollection,
        overlay_name: &str,
        registry: &mut dyn LayerRegistry,
        group: &GroupHandle,
        progress: &mut dyn ProgressPort,
    ) -> Result<ClipReport, ClipError> {
        registry.register_layer(group, &result)?;
        info!(
            "{} GBIF occurrences within polygon layer {overlay_name} have been added to the map.",
            result.len(),
        );
        let sweep = sweep(&result, progress);
        Ok(ClipReport { result, sweep })
    }
}

fn sweep(result: &OccurrenceCollection, progress: &mut dyn ProgressPort) -> SweepStatus {
    let total = u64::try_from(result.len()).unwrap_or(u64::MAX);
    progress.report(0, total, CLIP_LABEL);
    let mut visited: usize = 0;
    for _feature in result {
        progress.process_events();
        if progress.is_cancelled() {
            info!("clip sweep cancelled after {visited} of {total} features; result kept");
            return SweepStatus::Cancelled { visited };
        }
        visited += 1;
        progress.report(u64::try_from(visited).unwrap_or(u64::MAX), total, CLIP_LABEL);
    }
    SweepStatus::Completed
}
