//! Occurrence search URLs for a bounding box.
//!
//! The extent is sent as a closed WKT rectangle in longitude/latitude order:
//! `POLYGON((minX minY,maxX minY,maxX maxY,minX maxY,minX minY))`. Query
//! parameters are form-encoded by [`url::Url::query_pairs_mut`].

use gbif_clip_core::{PAGE_SIZE, SpatialExtent};
use url::Url;

/// Builds the count probe and page URLs for one extent.
///
/// # Examples
/// ```
/// use gbif_clip_core::SpatialExtent;
/// use gbif_clip_data::QueryBuilder;
/// use url::Url;
///
/// let base = Url::parse("https://api.gbif.org/v1/occurrence/search")?;
/// let extent = SpatialExtent::new(10.0, 10.0, 20.0, 20.0)?;
/// let query = QueryBuilder::new(&base, &extent);
///
/// assert_eq!(query.geometry(), "POLYGON((10 10,20 10,20 20,10 20,10 10))");
/// assert!(query.count_probe().as_str().ends_with("&limit=0"));
/// assert!(query.page(300).as_str().ends_with("&limit=300&offset=300"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    base: Url,
    geometry: String,
    limit: u64,
}

impl QueryBuilder {
    /// Queries against `base` for `extent`, paging by [`PAGE_SIZE`].
    #[must_use]
    pub fn new(base: &Url, extent: &SpatialExtent) -> Self {
        Self {
            base: base.clone(),
            geometry: polygon_wkt(extent),
            limit: PAGE_SIZE,
        }
    }

    /// Override the page limit.
    #[must_use]
    pub const fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// WKT rectangle sent as the `geometry` parameter.
    #[must_use]
    pub fn geometry(&self) -> &str {
        &self.geometry
    }

    /// Zero-limit request used to read the total `count`.
    #[must_use]
    pub fn count_probe(&self) -> Url {
        let mut url = self.with_geometry();
        url.query_pairs_mut().append_pair("limit", "0");
        url
    }

    /// Request for the page starting at `offset`.
    #[must_use]
    pub fn page(&self, offset: u64) -> Url {
        let mut url = self.with_geometry();
        url.query_pairs_mut()
            .append_pair("limit", &self.limit.to_string())
            .append_pair("offset", &offset.to_string());
        url
    }

    fn with_geometry(&self) -> Url {
        let mut url = self.base.clone();
        url.query_pairs_mut().append_pair("geometry", &self.geometry);
        url
    }
}

/// Closed WKT rectangle for `extent`, counter-clockwise from the south-west
/// corner.
#[must_use]
pub fn polygon_wkt(extent: &SpatialExtent) -> String {
    let corners: Vec<String> = extent
        .ring()
        .iter()
        .map(|corner| format!("{} {}", corner.x, corner.y))
        .collect();
    format!("POLYGON(({}))", corners.join(","))
}
