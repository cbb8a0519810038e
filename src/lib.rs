//! Facade crate for the GBIF occurrence fetch-and-clip pipeline.
//!
//! This crate re-exports the core pipeline types and, behind the `http`
//! feature, the GBIF search API client.

#![forbid(unsafe_code)]

pub use gbif_clip_core::{
    ClipError, ClipReport, ClipStage, ExtentError, FetchConfig, FetchError, GeoClipper,
    GeometryClipper, GroupHandle, LayerKind, LayerRegistry, LayerSelectionPort,
    OccurrenceAttributes, OccurrenceCollection, OccurrenceFeature, OccurrencePage,
    OccurrencePipeline, OccurrenceRecord, OccurrenceSource, Outcome, PagedFetcher,
    PipelineConfig, PipelineError, PipelineInputs, PipelineOutcome, PipelineReport,
    PolygonLayer, ProgressChannels, ProgressPort, RegistryError, SpatialExtent, SweepStatus,
};

#[cfg(feature = "http")]
pub use gbif_clip_data::{HttpOccurrenceSource, HttpOccurrenceSourceConfig, ProviderBuildError};
