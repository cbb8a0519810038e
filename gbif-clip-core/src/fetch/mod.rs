//! Paged retrieval of occurrence records.
//!
//! [`PagedFetcher`] issues a count probe, then walks the remote result set
//! one page at a time through a lazy [`OccurrenceStream`]. Paging obeys
//! three rules:
//!
//! - the probe count is clamped to [`FetchConfig::max_records`], and no more
//!   than that many records are ever emitted;
//! - the offset advances by exactly one page size between requests;
//! - paging stops at the first empty or short page, or once the requested
//!   window covers the clamped count.
//!
//! [`PagedFetcher::fetch`] drains the stream through a
//! [`FeatureMaterializer`], reporting progress after every record.

mod materialize;

pub use materialize::FeatureMaterializer;

use std::vec;

use log::{debug, info, warn};

use crate::{
    FetchError, OccurrenceCollection, OccurrenceRecord, OccurrenceSource, Outcome, ProgressPort,
    RawOccurrence, SpatialExtent,
};

/// Records requested per page.
pub const PAGE_SIZE: u64 = 300;

/// Safety cap on the probe count. Bounds memory use and request count.
pub const MAX_RECORDS: u64 = 100_000;

/// Paging parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Records requested per page.
    pub page_size: u64,
    /// Upper bound applied to the probe count.
    pub max_records: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            max_records: MAX_RECORDS,
        }
    }
}

impl FetchConfig {
    /// Override the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Override the safety cap.
    #[must_use]
    pub const fn with_max_records(mut self, max_records: u64) -> Self {
        self.max_records = max_records;
        self
    }

    /// Clamp a probe count to `[0, max_records]`.
    #[must_use]
    pub fn clamp_estimate(&self, count: u64) -> u64 {
        count.min(self.max_records)
    }
}

/// Sequential pager over an [`OccurrenceSource`].
///
/// # Examples
///
/// ```
/// use gbif_clip_core::{NoProgress, Outcome, PagedFetcher, SpatialExtent};
/// use gbif_clip_core::test_support::{StubOccurrenceSource, uniform_page};
///
/// let extent = SpatialExtent::new(10.0, 10.0, 20.0, 20.0).expect("extent");
/// let source = StubOccurrenceSource::new(
///     450,
///     vec![uniform_page(0, 300, &extent), uniform_page(300, 150, &extent)],
/// );
/// let fetcher = PagedFetcher::new(&source);
///
/// let outcome = fetcher.fetch(extent, "occurrences", &mut NoProgress)?;
/// let Outcome::Completed(collection) = outcome else {
///     panic!("nothing cancelled the fetch");
/// };
/// assert_eq!(collection.len(), 450);
/// assert_eq!(source.requested_offsets(), vec![0, 300]);
/// # Ok::<(), gbif_clip_core::FetchError>(())
/// ```
#[derive(Debug, Clone)]
pub struct PagedFetcher<S> {
    source: S,
    config: FetchConfig,
}

impl<S: OccurrenceSource> PagedFetcher<S> {
    /// Pager with the default page size and safety cap.
    pub fn new(source: S) -> Self {
        Self::with_config(source, FetchConfig::default())
    }

    /// Pager with explicit paging parameters.
    pub const fn with_config(source: S, config: FetchConfig) -> Self {
        Self { source, config }
    }

    /// Paging parameters in use.
    pub const fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Issue the count probe and clamp its result to the safety cap.
    ///
    /// # Errors
    /// Propagates the probe failure.
    pub fn total_estimate(&self, extent: &SpatialExtent) -> Result<u64, FetchError> {
        let count = self.source.count(extent)?;
        let estimate = self.config.clamp_estimate(count);
        if estimate < count {
            warn!(
                "remote reports {count} occurrences; capping fetch at {}",
                self.config.max_records
            );
        }
        Ok(estimate)
    }

    /// Probe the count and return a lazy record stream for `extent`.
    ///
    /// No page is requested until the stream is first polled.
    pub fn stream(&self, extent: SpatialExtent) -> Result<OccurrenceStream<'_, S>, FetchError> {
        let total_estimate = self.total_estimate(&extent)?;
        Ok(OccurrenceStream::new(
            &self.source,
            extent,
            self.config.page_size,
            total_estimate,
        ))
    }

    /// Fetch every record in `extent` into a collection named `layer_name`.
    ///
    /// Returns [`Outcome::Cancelled`] when `progress` requests cancellation
    /// before the probe or after any emitted record; the partial collection
    /// is dropped. A degenerate extent completes with an empty collection
    /// without touching the network.
    ///
    /// # Errors
    /// Any request failure aborts the fetch.
    pub fn fetch(
        &self,
        extent: SpatialExtent,
        layer_name: &str,
        progress: &mut dyn ProgressPort,
    ) -> Result<Outcome<OccurrenceCollection>, FetchError> {
        progress.process_events();
        if progress.is_cancelled() {
            return Ok(Outcome::Cancelled);
        }
        if extent.is_degenerate() {
            info!("extent {extent:?} has no area; skipping the query");
            return FeatureMaterializer::new(layer_name).materialize(
                std::iter::empty(),
                0,
                progress,
            );
        }
        let stream = self.stream(extent)?;
        let total = stream.total_estimate();
        FeatureMaterializer::new(layer_name).materialize(stream, total, progress)
    }
}

/// Lazy, page-at-a-time sequence of validated records.
///
/// Raw entries lacking a coordinate are skipped silently. The stream ends
/// after the last page, after `total_estimate` records, or after the first
/// error, which it yields once.
#[derive(Debug)]
pub struct OccurrenceStream<'a, S: ?Sized> {
    source: &'a S,
    extent: SpatialExtent,
    page_size: u64,
    total_estimate: u64,
    offset: u64,
    buffer: vec::IntoIter<RawOccurrence>,
    more_pages: bool,
    emitted: u64,
    skipped: u64,
    requests: u64,
}

impl<'a, S: OccurrenceSource + ?Sized> OccurrenceStream<'a, S> {
    /// Stream over `source` for a previously probed `total_estimate`.
    pub fn new(source: &'a S, extent: SpatialExtent, page_size: u64, total_estimate: u64) -> Self {
        Self {
            source,
            extent,
            page_size,
            total_estimate,
            offset: 0,
            buffer: Vec::new().into_iter(),
            more_pages: total_estimate > 0 && page_size > 0,
            emitted: 0,
            skipped: 0,
            requests: 0,
        }
    }

    /// Clamped probe count this stream is bounded by.
    #[must_use]
    pub const fn total_estimate(&self) -> u64 {
        self.total_estimate
    }

    /// Records yielded so far.
    #[must_use]
    pub const fn emitted(&self) -> u64 {
        self.emitted
    }

    /// Raw entries dropped for missing coordinates.
    #[must_use]
    pub const fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Page requests issued so far.
    #[must_use]
    pub const fn requests(&self) -> u64 {
        self.requests
    }

    fn request_page(&mut self) -> Result<(), FetchError> {
        self.requests += 1;
        let page = self
            .source
            .page(&self.extent, self.offset, self.page_size)
            .inspect_err(|_| self.stop())?;
        let results = page.results.unwrap_or_default();
        let received = u64::try_from(results.len()).unwrap_or(u64::MAX);
        debug!(
            "page at offset {} returned {received} of {} requested records",
            self.offset, self.page_size
        );

        if received < self.page_size {
            self.more_pages = false;
        } else {
            self.offset = self.offset.saturating_add(self.page_size);
            self.more_pages = self.offset < self.total_estimate;
        }
        self.buffer = results.into_iter();
        Ok(())
    }

    fn stop(&mut self) {
        self.more_pages = false;
        self.buffer = Vec::new().into_iter();
    }
}

impl<S: OccurrenceSource + ?Sized> Iterator for OccurrenceStream<'_, S> {
    type Item = Result<OccurrenceRecord, FetchError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.emitted >= self.total_estimate {
                self.stop();
                return None;
            }
            if let Some(raw) = self.buffer.next() {
                match raw.into_record() {
                    Some(record) => {
                        self.emitted += 1;
                        return Some(Ok(record));
                    }
                    None => {
                        self.skipped += 1;
                        debug!("skipping occurrence without coordinates");
                        continue;
                    }
                }
            }
            if !self.more_pages {
                return None;
            }
            if let Err(err) = self.request_page() {
                return Some(Err(err));
            }
        }
    }
}

impl<S: OccurrenceSource + ?Sized> std::iter::FusedIterator for OccurrenceStream<'_, S> {}
