//! Remote occurrence sources.
//!
//! The [`OccurrenceSource`] trait abstracts the paginated search service.
//! It is synchronous so the pipeline stays single-threaded; network-backed
//! implementations block until each request completes.

mod error;

pub use error::FetchError;

use crate::{RawOccurrence, SpatialExtent};

/// One page of remote results.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OccurrencePage {
    /// Raw entries in service order. `None` when the response carried no
    /// `results` key at all.
    pub results: Option<Vec<RawOccurrence>>,
}

impl OccurrencePage {
    /// Page holding `results`.
    #[must_use]
    pub const fn new(results: Vec<RawOccurrence>) -> Self {
        Self {
            results: Some(results),
        }
    }

    /// Number of raw entries, counting those without coordinates.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.as_ref().map_or(0, Vec::len)
    }

    /// Whether the page is missing its results or they are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Paginated occurrence search restricted to an extent.
///
/// # Examples
///
/// ```rust
/// use gbif_clip_core::{
///     FetchError, OccurrencePage, OccurrenceSource, RawOccurrence, SpatialExtent,
/// };
///
/// struct Single;
///
/// impl OccurrenceSource for Single {
///     fn count(&self, _extent: &SpatialExtent) -> Result<u64, FetchError> {
///         Ok(1)
///     }
///
///     fn page(
///         &self,
///         _extent: &SpatialExtent,
///         offset: u64,
///         _limit: u64,
///     ) -> Result<OccurrencePage, FetchError> {
///         let results = if offset == 0 {
///             vec![RawOccurrence {
///                 latitude: Some(1.0),
///                 longitude: Some(2.0),
///                 ..RawOccurrence::default()
///             }]
///         } else {
///             Vec::new()
///         };
///         Ok(OccurrencePage::new(results))
///     }
/// }
///
/// let extent = SpatialExtent::new(0.0, 0.0, 5.0, 5.0).expect("extent");
/// assert_eq!(Single.count(&extent)?, 1);
/// assert_eq!(Single.page(&extent, 0, 300)?.len(), 1);
/// # Ok::<(), FetchError>(())
/// ```
pub trait OccurrenceSource {
    /// Total number of records the service reports for `extent`.
    ///
    /// Implementations issue a zero-limit probe and return its count,
    /// mapping a missing or negative count to zero.
    fn count(&self, extent: &SpatialExtent) -> Result<u64, FetchError>;

    /// Fetch up to `limit` records for `extent` starting at `offset`.
    fn page(
        &self,
        extent: &SpatialExtent,
        offset: u64,
        limit: u64,
    ) -> Result<OccurrencePage, FetchError>;
}

impl<S: OccurrenceSource + ?Sized> OccurrenceSource for &S {
    fn count(&self, extent: &SpatialExtent) -> Result<u64, FetchError> {
        (**self).count(extent)
    }

    fn page(
        &self,
        extent: &SpatialExtent,
        offset: u64,
        limit: u64,
    ) -> Result<OccurrencePage, FetchError> {
        (**self).page(extent, offset, limit)
    }
}
