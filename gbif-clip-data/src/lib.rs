//! Data access for the GBIF occurrence pipeline.
//!
//! Responsibilities:
//! - Build occurrence search queries for a bounding box.
//! - Decode search responses into core occurrence pages.
//! - Provide the HTTP adapter behind [`gbif_clip_core::OccurrenceSource`].
//!
//! Boundaries:
//! - Do not encode pipeline rules (paging, capping and clipping live in
//!   `gbif-clip-core`).
//! - No retries or caching; every failure surfaces to the caller.

#![forbid(unsafe_code)]

pub mod search;

pub use search::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpOccurrenceSource, HttpOccurrenceSourceConfig,
    ProviderBuildError, QueryBuilder,
};
#[doc(hidden)]
pub use search::test_support;
