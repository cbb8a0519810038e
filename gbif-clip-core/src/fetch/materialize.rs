//! Conversion of validated records into stored point features.

use log::info;

use crate::{
    FETCH_LABEL, FetchError, OccurrenceCollection, OccurrenceRecord, Outcome, ProgressPort,
};

/// Appends one point feature per record to a fresh collection.
///
/// Materialisation and fetch progress are the same step: after each record
/// is stored the materialiser reports `(stored, total)`, yields to the host
/// and polls for cancellation.
#[derive(Debug)]
pub struct FeatureMaterializer {
    collection: OccurrenceCollection,
}

impl FeatureMaterializer {
    /// Materialiser writing into an empty collection named `name`.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            collection: OccurrenceCollection::new(name),
        }
    }

    /// Drain `records` into the collection in arrival order.
    ///
    /// Cancellation discards everything stored so far. The first error from
    /// `records` aborts materialisation and is returned unchanged.
    pub fn materialize<I>(
        mut self,
        records: I,
        total: u64,
        progress: &mut dyn ProgressPort,
    ) -> Result<Outcome<OccurrenceCollection>, FetchError>
    where
        I: IntoIterator<Item = Result<OccurrenceRecord, FetchError>>,
    {
        progress.report(0, total, FETCH_LABEL);
        if Self::cancelled(progress) {
            info!("fetch cancelled before the first page");
            return Ok(Outcome::Cancelled);
        }

        let mut stored: u64 = 0;
        for record in records {
            self.collection.push(record?.into());
            stored += 1;
            progress.report(stored, total, FETCH_LABEL);
            if Self::cancelled(progress) {
                info!("fetch cancelled after {stored} records; partial collection discarded");
                return Ok(Outcome::Cancelled);
            }
        }

        info!(
            "materialised {stored} occurrences into {:?}",
            self.collection.name()
        );
        Ok(Outcome::Completed(self.collection))
    }

    fn cancelled(progress: &mut dyn ProgressPort) -> bool {
        progress.process_events();
        progress.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingProgress, raw_occurrence};
    use rstest::rstest;

    fn records(count: u64) -> Vec<Result<OccurrenceRecord, FetchError>> {
        (0..count)
            .filter_map(|id| raw_occurrence(id, 1.0, 2.0).into_record())
            .map(Ok)
            .collect()
    }

    #[rstest]
    fn stores_every_record_in_order() {
        let mut progress = RecordingProgress::default();
        let outcome = FeatureMaterializer::new("layer")
            .materialize(records(3), 3, &mut progress)
            .expect("no fetch error");
        let collection = outcome.completed().expect("not cancelled");
        let ids: Vec<_> = collection
            .iter()
            .map(|f| f.attributes.gbif_id.as_str())
            .collect();
        assert_eq!(ids, ["0", "1", "2"]);
        let currents: Vec<_> = progress.reports().iter().map(|r| r.current).collect();
        assert_eq!(currents, [0, 1, 2, 3]);
        assert_eq!(progress.events(), 4);
    }

    #[rstest]
    fn errors_abort_materialisation() {
        let mut input = records(2);
        input.insert(
            1,
            Err(FetchError::Network {
                url: "http://example.com".into(),
                message: "reset".into(),
            }),
        );
        let err = FeatureMaterializer::new("layer")
            .materialize(input, 3, &mut RecordingProgress::default())
            .expect_err("network failure");
        assert!(matches!(err, FetchError::Network { .. }));
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(4)]
    fn cancellation_discards_partial_collection(#[case] after: u64) {
        let mut progress = RecordingProgress::cancelling_at(after);
        let outcome = FeatureMaterializer::new("layer")
            .materialize(records(5), 5, &mut progress)
            .expect("no fetch error");
        assert!(outcome.is_cancelled());
        assert_eq!(progress.last().map(|r| r.current), Some(after));
    }
}
