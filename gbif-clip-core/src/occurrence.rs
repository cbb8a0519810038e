//! Occurrence records and the point collections they materialise into.
//!
//! A [`RawOccurrence`] mirrors one entry of a remote result page with every
//! field optional. Only raw entries carrying both coordinates become an
//! [`OccurrenceRecord`]; string attributes that are absent fall back to
//! [`UNKNOWN_VALUE`].

use geo::Point;

/// Placeholder stored for attributes the remote record did not supply.
pub const UNKNOWN_VALUE: &str = "Unknown";

/// Attribute schema shared by every occurrence collection, in column order.
pub const FIELD_NAMES: [&str; 7] = [
    "gbifID",
    "species",
    "country",
    "eventDate",
    "catalogNumber",
    "identifiedBy",
    "individualCount",
];

/// One remote occurrence entry before validation.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RawOccurrence {
    /// WGS84 latitude, if present.
    pub latitude: Option<f64>,
    /// WGS84 longitude, if present.
    pub longitude: Option<f64>,
    /// Remote record identifier.
    pub gbif_id: Option<String>,
    /// Species name.
    pub species: Option<String>,
    /// Country the occurrence was recorded in.
    pub country: Option<String>,
    /// Event date as reported by the publisher.
    pub event_date: Option<String>,
    /// Catalogue number of the specimen or observation.
    pub catalog_number: Option<String>,
    /// Person who identified the occurrence.
    pub identified_by: Option<String>,
    /// Number of individuals observed.
    pub individual_count: Option<String>,
}

impl RawOccurrence {
    /// Validate the entry, returning `None` when a coordinate is missing or
    /// not finite.
    ///
    /// # Examples
    /// ```
    /// use gbif_clip_core::{RawOccurrence, UNKNOWN_VALUE};
    ///
    /// let raw = RawOccurrence {
    ///     latitude: Some(51.5),
    ///     longitude: Some(-0.1),
    ///     species: Some("Turdus merula".into()),
    ///     ..RawOccurrence::default()
    /// };
    /// let record = raw.into_record().expect("coordinates present");
    /// assert_eq!(record.attributes.species, "Turdus merula");
    /// assert_eq!(record.attributes.country, UNKNOWN_VALUE);
    ///
    /// assert!(RawOccurrence::default().into_record().is_none());
    /// ```
    #[must_use]
    pub fn into_record(self) -> Option<OccurrenceRecord> {
        let latitude = self.latitude.filter(|v| v.is_finite())?;
        let longitude = self.longitude.filter(|v| v.is_finite())?;
        Some(OccurrenceRecord {
            longitude,
            latitude,
            attributes: OccurrenceAttributes {
                gbif_id: or_unknown(self.gbif_id),
                species: or_unknown(self.species),
                country: or_unknown(self.country),
                event_date: or_unknown(self.event_date),
                catalog_number: or_unknown(self.catalog_number),
                identified_by: or_unknown(self.identified_by),
                individual_count: or_unknown(self.individual_count),
            },
        })
    }
}

fn or_unknown(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNKNOWN_VALUE.to_owned())
}

/// The seven string attributes stored with every occurrence feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccurrenceAttributes {
    /// Remote record identifier.
    pub gbif_id: String,
    /// Species name.
    pub species: String,
    /// Country of the occurrence.
    pub country: String,
    /// Event date.
    pub event_date: String,
    /// Catalogue number.
    pub catalog_number: String,
    /// Identifier of record.
    pub identified_by: String,
    /// Individual count.
    pub individual_count: String,
}

impl OccurrenceAttributes {
    /// Attribute values in [`FIELD_NAMES`] order.
    #[must_use]
    pub fn values(&self) -> [&str; 7] {
        [
            self.gbif_id.as_str(),
            self.species.as_str(),
            self.country.as_str(),
            self.event_date.as_str(),
            self.catalog_number.as_str(),
            self.identified_by.as_str(),
            self.individual_count.as_str(),
        ]
    }

    /// `(field name, value)` pairs in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        FIELD_NAMES.into_iter().zip(self.values())
    }
}

/// A validated occurrence with a guaranteed coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceRecord {
    /// WGS84 longitude.
    pub longitude: f64,
    /// WGS84 latitude.
    pub latitude: f64,
    /// String attributes.
    pub attributes: OccurrenceAttributes,
}

impl OccurrenceRecord {
    /// Point geometry with `x = longitude`, `y = latitude`.
    #[must_use]
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// A stored point feature: geometry plus attribute row.
#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceFeature {
    /// Point location of the occurrence.
    pub geometry: Point<f64>,
    /// Attribute row.
    pub attributes: OccurrenceAttributes,
}

impl From<OccurrenceRecord> for OccurrenceFeature {
    fn from(record: OccurrenceRecord) -> Self {
        Self {
            geometry: record.point(),
            attributes: record.attributes,
        }
    }
}

/// Ordered, named collection of occurrence point features.
///
/// Features are appended in arrival order by the materialiser and the
/// collection is read-only to everyone else.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OccurrenceCollection {
    name: String,
    features: Vec<OccurrenceFeature>,
}

impl OccurrenceCollection {
    /// Create an empty collection.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_features(name, Vec::new())
    }

    /// Create a collection holding `features` in the given order.
    #[must_use]
    pub fn with_features(name: impl Into<String>, features: Vec<OccurrenceFeature>) -> Self {
        Self {
            name: name.into(),
            features,
        }
    }

    /// Layer name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Whether the collection holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Features in arrival order.
    #[must_use]
    pub fn features(&self) -> &[OccurrenceFeature] {
        &self.features
    }

    /// Iterate over features in arrival order.
    pub fn iter(&self) -> std::slice::Iter<'_, OccurrenceFeature> {
        self.features.iter()
    }

    pub(crate) fn push(&mut self, feature: OccurrenceFeature) {
        self.features.push(feature);
    }
}

impl<'a> IntoIterator for &'a OccurrenceCollection {
    type Item = &'a OccurrenceFeature;
    type IntoIter = std::slice::Iter<'a, OccurrenceFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn complete_raw() -> RawOccurrence {
        RawOccurrence {
            latitude: Some(12.5),
            longitude: Some(15.25),
            gbif_id: Some("1234".into()),
            species: Some("Panthera leo".into()),
            country: Some("KE".into()),
            event_date: Some("2021-03-04".into()),
            catalog_number: Some("CAT-1".into()),
            identified_by: Some("A. Observer".into()),
            individual_count: Some("2".into()),
        }
    }

    #[rstest]
    fn complete_entry_keeps_every_attribute(complete_raw: RawOccurrence) {
        let record = complete_raw.into_record().expect("valid record");
        assert_eq!(
            record.attributes.values(),
            [
                "1234",
                "Panthera leo",
                "KE",
                "2021-03-04",
                "CAT-1",
                "A. Observer",
                "2"
            ]
        );
        assert_eq!(record.point(), Point::new(15.25, 12.5));
    }

    #[rstest]
    #[case(None, Some(1.0))]
    #[case(Some(1.0), None)]
    #[case(None, None)]
    #[case(Some(f64::NAN), Some(1.0))]
    fn entries_without_both_coordinates_are_dropped(
        complete_raw: RawOccurrence,
        #[case] latitude: Option<f64>,
        #[case] longitude: Option<f64>,
    ) {
        let raw = RawOccurrence {
            latitude,
            longitude,
            ..complete_raw
        };
        assert!(raw.into_record().is_none());
    }

    #[rstest]
    fn missing_strings_default_to_unknown() {
        let raw = RawOccurrence {
            latitude: Some(0.0),
            longitude: Some(0.0),
            ..RawOccurrence::default()
        };
        let record = raw.into_record().expect("valid record");
        assert!(record.attributes.values().iter().all(|v| *v == UNKNOWN_VALUE));
    }

    #[rstest]
    fn fields_follow_schema_order(complete_raw: RawOccurrence) {
        let record = complete_raw.into_record().expect("valid record");
        let names: Vec<_> = record.attributes.fields().map(|(name, _)| name).collect();
        assert_eq!(names, FIELD_NAMES);
    }

    #[rstest]
    fn collection_preserves_order(complete_raw: RawOccurrence) {
        let mut collection = OccurrenceCollection::new("occurrences");
        for id in ["a", "b", "c"] {
            let raw = RawOccurrence {
                gbif_id: Some(id.into()),
                ..complete_raw.clone()
            };
            let record = raw.into_record().expect("valid record");
            collection.push(record.into());
        }
        let ids: Vec<_> = collection
            .iter()
            .map(|f| f.attributes.gbif_id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
        assert_eq!(collection.name(), "occurrences");
    }
}
