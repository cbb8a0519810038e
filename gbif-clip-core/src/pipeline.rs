//! End-to-end fetch-and-clip orchestration.
//!
//! A run selects its two input layers, fetches every occurrence inside the
//! extent layer's bounding box, clips the fetched points, then creates a
//! uniquely named result group and registers the clipped collection in it.
//! Nothing is registered until both the fetch and the clip have succeeded,
//! so a cancelled fetch or a failed stage leaves the registry untouched.

use log::info;
use thiserror::Error;

use crate::{
    ClipError, ClipStage, DEFAULT_GROUP_PREFIX, ExtentError, FetchConfig, FetchError, GeoClipper,
    GeometryClipper, GroupHandle, LayerKind, LayerRegistry, LayerSelectionPort, OccurrenceSource,
    Outcome, PagedFetcher, PolygonLayer, ProgressPort, RegistryError, SweepStatus,
};

/// Run-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Paging parameters.
    pub fetch: FetchConfig,
    /// Also register the unclipped fetch result in the group.
    pub register_fetch_layer: bool,
    /// Prefix for the unique result group name.
    pub group_prefix: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            fetch: FetchConfig::default(),
            register_fetch_layer: false,
            group_prefix: DEFAULT_GROUP_PREFIX.to_owned(),
        }
    }
}

/// The two polygon inputs of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineInputs {
    /// Layer whose bounding box is queried.
    pub extent: PolygonLayer,
    /// Layer the fetched points are clipped against.
    pub overlay: PolygonLayer,
}

impl PipelineInputs {
    /// Ask `selection` for the extent layer, then the overlay layer.
    ///
    /// # Errors
    /// Returns [`PipelineError::NoInputSelected`] for the first input the
    /// port declines to provide.
    pub fn select(selection: &mut dyn LayerSelectionPort) -> Result<Self, PipelineError> {
        let extent = selection
            .choose(LayerKind::Extent)
            .ok_or(PipelineError::NoInputSelected {
                kind: LayerKind::Extent,
            })?;
        let overlay = selection
            .choose(LayerKind::Overlay)
            .ok_or(PipelineError::NoInputSelected {
                kind: LayerKind::Overlay,
            })?;
        Ok(Self { extent, overlay })
    }
}

/// Independent progress channels for the fetch and clip phases.
pub struct ProgressChannels<'a> {
    /// Receives fetch progress.
    pub fetch: &'a mut dyn ProgressPort,
    /// Receives clip sweep progress.
    pub clip: &'a mut dyn ProgressPort,
}

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    /// Group holding the registered layers.
    pub group: GroupHandle,
    /// Records materialised by the fetch.
    pub fetched: usize,
    /// Features kept by the clip.
    pub clipped: usize,
    /// Name of the registered clip layer.
    pub clip_layer: String,
    /// Fate of the clip progress sweep.
    pub sweep: SweepStatus,
}

impl PipelineReport {
    /// Whether the run produced no clipped features.
    ///
    /// An empty result is a normal outcome, reported for information only.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.clipped == 0
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum PipelineOutcome {
    /// Both stages ran; the clip layer is registered.
    Completed(PipelineReport),
    /// The user cancelled the fetch. Nothing was registered.
    FetchCancelled,
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The selection port did not supply a required input.
    #[error("no {kind} selected")]
    NoInputSelected {
        /// Which input was missing.
        kind: LayerKind,
    },
    /// The extent layer has no usable bounding box.
    #[error("cannot derive a query extent from layer {layer:?}")]
    Extent {
        /// Extent layer name.
        layer: String,
        /// Underlying failure.
        #[source]
        source: ExtentError,
    },
    /// The remote fetch failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The registry refused the group or a layer.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Clipping or registering the clip result failed.
    #[error(transparent)]
    Clip(#[from] ClipError),
}

/// Name given to the fetch result for an extent layer, under the group
/// `prefix`.
#[must_use]
pub fn fetch_layer_name(prefix: &str, extent_layer: &str) -> String {
    format!("{prefix}-{extent_layer}")
}

/// Fetch, register and clip in one call.
///
/// # Examples
/// ```
/// use gbif_clip_core::{
///     NoProgress, OccurrencePipeline, PipelineConfig, PipelineInputs, PipelineOutcome,
///     ProgressChannels, SpatialExtent,
/// };
/// use gbif_clip_core::test_support::{
///     InMemoryLayerRegistry, StubOccurrenceSource, rectangle_layer, uniform_page,
/// };
///
/// let extent = SpatialExtent::new(10.0, 10.0, 20.0, 20.0)?;
/// let source = StubOccurrenceSource::new(4, vec![uniform_page(0, 4, &extent)]);
/// let pipeline = OccurrencePipeline::new(&source, PipelineConfig::default());
/// let inputs = PipelineInputs {
///     extent: rectangle_layer("region", 10.0, 10.0, 20.0, 20.0),
///     overlay: rectangle_layer("west", 10.0, 10.0, 15.0, 20.0),
/// };
/// let mut registry = InMemoryLayerRegistry::default();
/// let (mut fetch, mut clip) = (NoProgress, NoProgress);
///
/// let outcome = pipeline.run(
///     &inputs,
///     &mut registry,
///     ProgressChannels { fetch: &mut fetch, clip: &mut clip },
/// )?;
/// let PipelineOutcome::Completed(report) = outcome else {
///     panic!("nothing cancelled the run");
/// };
/// assert_eq!((report.fetched, report.clipped), (4, 2));
/// assert_eq!(report.group.name(), "GBIF Occurrences-0");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct OccurrencePipeline<S, C = GeoClipper> {
    fetcher: PagedFetcher<S>,
    clip: ClipStage<C>,
    register_fetch_layer: bool,
    group_prefix: String,
}

impl<S: OccurrenceSource> OccurrencePipeline<S> {
    /// Pipeline clipping with [`GeoClipper`].
    pub fn new(source: S, config: PipelineConfig) -> Self {
        Self::with_parts(source, GeoClipper, config)
    }
}

impl<S: OccurrenceSource, C: GeometryClipper> OccurrencePipeline<S, C> {
    /// Pipeline with an explicit clipper.
    pub fn with_parts(source: S, clipper: C, config: PipelineConfig) -> Self {
        Self {
            fetcher: PagedFetcher::with_config(source, config.fetch),
            clip: ClipStage::new(clipper),
            register_fetch_layer: config.register_fetch_layer,
            group_prefix: config.group_prefix,
        }
    }

    /// Select inputs through `selection`, then [`run`](Self::run).
    ///
    /// # Errors
    /// Fails with [`PipelineError::NoInputSelected`] before any network
    /// activity when an input is missing, otherwise as [`run`](Self::run).
    pub fn run_with_selection(
        &self,
        selection: &mut dyn LayerSelectionPort,
        registry: &mut dyn LayerRegistry,
        progress: ProgressChannels<'_>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let inputs = PipelineInputs::select(selection)?;
        self.run(&inputs, registry, progress)
    }

    /// Execute one run over `inputs`.
    ///
    /// # Errors
    /// Returns the first extent, fetch, clip or registry failure. The group
    /// is only created once the clip has succeeded.
    pub fn run(
        &self,
        inputs: &PipelineInputs,
        registry: &mut dyn LayerRegistry,
        progress: ProgressChannels<'_>,
    ) -> Result<PipelineOutcome, PipelineError> {
        let extent = inputs
            .extent
            .extent()
            .map_err(|source| PipelineError::Extent {
                layer: inputs.extent.name.clone(),
                source,
            })?;
        info!(
            "querying GBIF occurrences inside the bounds of {:?}",
            inputs.extent.name
        );

        let layer_name = fetch_layer_name(&self.group_prefix, &inputs.extent.name);
        let Outcome::Completed(collection) =
            self.fetcher.fetch(extent, &layer_name, progress.fetch)?
        else {
            info!("fetch cancelled; nothing registered");
            return Ok(PipelineOutcome::FetchCancelled);
        };

        let clipped = self.clip.clip(&collection, &inputs.overlay)?;
        let group = registry.create_unique_group(&self.group_prefix)?;
        if self.register_fetch_layer {
            registry.register_layer(&group, &collection)?;
        }
        let clip = ClipStage::<C>::publish(
            clipped,
            &inputs.overlay.name,
            registry,
            &group,
            progress.clip,
        )?;

        Ok(PipelineOutcome::Completed(PipelineReport {
            fetched: collection.len(),
            clipped: clip.result.len(),
            clip_layer: clip.result.name().to_owned(),
            sweep: clip.sweep,
            group,
        }))
    }
}
