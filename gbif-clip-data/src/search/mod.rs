//! Remote occurrence search against the GBIF API.
//!
//! This module provides [`HttpOccurrenceSource`], an implementation of
//! [`gbif_clip_core::OccurrenceSource`] that issues the count probe and page
//! requests built by [`QueryBuilder`] and decodes [`SearchResponse`] bodies.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use gbif_clip_core::{NoProgress, PagedFetcher, SpatialExtent};
//! use gbif_clip_data::search::{HttpOccurrenceSource, HttpOccurrenceSourceConfig};
//!
//! let config = HttpOccurrenceSourceConfig::default()
//!     .with_timeout(Duration::from_secs(60))
//!     .with_user_agent("my-app/1.0");
//! let source = HttpOccurrenceSource::with_config(config)?;
//!
//! let extent = SpatialExtent::new(11.0, 48.0, 11.5, 48.3)?;
//! let outcome = PagedFetcher::new(source).fetch(extent, "Munich", &mut NoProgress)?;
//! # let _ = outcome;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod query;
mod response;
mod source;

#[doc(hidden)]
pub mod test_support;

pub use query::{QueryBuilder, polygon_wkt};
pub use response::{GbifOccurrence, SearchResponse};
pub use source::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, HttpOccurrenceSource, HttpOccurrenceSourceConfig,
    ProviderBuildError,
};
