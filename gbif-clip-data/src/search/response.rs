//! GBIF occurrence search response types.
//!
//! Only the fields the pipeline consumes are modelled. The service returns
//! some attributes (`gbifID`, `individualCount`) as numbers, so attribute
//! values are kept as raw JSON and rendered to strings on conversion.
//!
//! See: <https://techdocs.gbif.org/en/openapi/v1/occurrence#/Searching%20occurrences>

use gbif_clip_core::{OccurrencePage, RawOccurrence};
use serde::Deserialize;
use serde_json::Value;

/// One page of `/occurrence/search` results.
#[derive(Debug, Default, Deserialize)]
pub struct SearchResponse {
    /// Total number of matching records, when reported.
    #[serde(default)]
    pub count: Option<i64>,
    /// Records on this page. Absent from some error and probe responses.
    #[serde(default)]
    pub results: Option<Vec<GbifOccurrence>>,
}

impl SearchResponse {
    /// Total record count, treating a missing or negative value as zero.
    #[must_use]
    pub fn total_count(&self) -> u64 {
        self.count
            .and_then(|count| u64::try_from(count).ok())
            .unwrap_or(0)
    }

    /// Convert the results into a core page.
    #[must_use]
    pub fn into_page(self) -> OccurrencePage {
        OccurrencePage {
            results: self
                .results
                .map(|results| results.into_iter().map(RawOccurrence::from).collect()),
        }
    }
}

/// A single occurrence record as returned by the search API.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GbifOccurrence {
    /// WGS84 latitude.
    #[serde(default)]
    pub decimal_latitude: Option<f64>,
    /// WGS84 longitude.
    #[serde(default)]
    pub decimal_longitude: Option<f64>,
    /// Record key.
    #[serde(default, rename = "gbifID")]
    pub gbif_id: Option<Value>,
    /// Species name.
    #[serde(default)]
    pub species: Option<Value>,
    /// Country name.
    #[serde(default)]
    pub country: Option<Value>,
    /// Event date.
    #[serde(default)]
    pub event_date: Option<Value>,
    /// Catalogue number.
    #[serde(default)]
    pub catalog_number: Option<Value>,
    /// Identifier of the record.
    #[serde(default)]
    pub identified_by: Option<Value>,
    /// Individual count.
    #[serde(default)]
    pub individual_count: Option<Value>,
}

impl From<GbifOccurrence> for RawOccurrence {
    fn from(value: GbifOccurrence) -> Self {
        Self {
            latitude: value.decimal_latitude,
            longitude: value.decimal_longitude,
            gbif_id: value.gbif_id.and_then(render),
            species: value.species.and_then(render),
            country: value.country.and_then(render),
            event_date: value.event_date.and_then(render),
            catalog_number: value.catalog_number.and_then(render),
            identified_by: value.identified_by.and_then(render),
            individual_count: value.individual_count.and_then(render),
        }
    }
}

/// Render a JSON attribute as text; `null` counts as absent.
fn render(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(other.to_string()),
    }
}
