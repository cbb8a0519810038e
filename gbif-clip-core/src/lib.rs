//! Core of the GBIF occurrence fetch-and-clip pipeline.
//!
//! The crate turns a polygon region into a bounding-box query, pages through
//! the remote occurrence search, materialises every located record as a
//! point feature and clips the result against an overlay polygon layer.
//!
//! Everything outside that flow is reached through capability traits:
//!
//! - [`OccurrenceSource`] issues the count probe and page requests;
//! - [`ProgressPort`] receives progress and answers cancellation polls;
//! - [`LayerSelectionPort`] supplies the extent and overlay layers;
//! - [`LayerRegistry`] names groups and stores result layers;
//! - [`GeometryClipper`] performs the polygon clip.
//!
//! Execution is single-threaded and cooperative. Stages yield through
//! [`ProgressPort::process_events`] after each unit of work and observe
//! cancellation only at those points.

#![forbid(unsafe_code)]

mod clip;
mod extent;
mod fetch;
mod layer;
mod occurrence;
mod pipeline;
mod progress;
mod source;

#[doc(hidden)]
pub mod test_support;

pub use clip::{
    ClipError, ClipReport, ClipStage, GeoClipper, GeometryClipper, SweepStatus, clip_layer_name,
};
pub use extent::{ExtentError, SpatialExtent};
pub use fetch::{
    FeatureMaterializer, FetchConfig, MAX_RECORDS, OccurrenceStream, PAGE_SIZE, PagedFetcher,
};
pub use layer::{
    DEFAULT_GROUP_PREFIX, GroupHandle, LayerKind, LayerRegistry, LayerSelectionPort,
    PolygonLayer, RegistryError, unique_group_name,
};
pub use occurrence::{
    FIELD_NAMES, OccurrenceAttributes, OccurrenceCollection, OccurrenceFeature, OccurrenceRecord,
    RawOccurrence, UNKNOWN_VALUE,
};
pub use pipeline::{
    OccurrencePipeline, PipelineConfig, PipelineError, PipelineInputs, PipelineOutcome,
    PipelineReport, ProgressChannels, fetch_layer_name,
};
pub use progress::{CLIP_LABEL, CancelFlag, FETCH_LABEL, NoProgress, Outcome, ProgressPort};
pub use source::{FetchError, OccurrencePage, OccurrenceSource};
