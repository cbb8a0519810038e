//! Deterministic test doubles for the pipeline's capability traits.
//!
//! None of these types touch the network or a real map host.

use std::cell::RefCell;

use geo::{LineString, MultiPolygon, Polygon};

use crate::{
    FetchError, GroupHandle, LayerKind, LayerRegistry, LayerSelectionPort, OccurrenceCollection,
    OccurrencePage, OccurrenceSource, PolygonLayer, ProgressPort, RawOccurrence, RegistryError,
    SpatialExtent, unique_group_name,
};

/// Scripted [`OccurrenceSource`].
///
/// Pages are served in request order regardless of the offset asked for;
/// requests past the script receive an empty page. Every page request is
/// recorded so tests can assert on pagination.
#[derive(Debug)]
pub struct StubOccurrenceSource {
    count: Result<u64, FetchError>,
    pages: Vec<Result<OccurrencePage, FetchError>>,
    probes: RefCell<usize>,
    requests: RefCell<Vec<PageRequest>>,
}

/// A recorded page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Requested offset.
    pub offset: u64,
    /// Requested limit.
    pub limit: u64,
}

impl StubOccurrenceSource {
    /// Source reporting `count` from the probe and serving `pages` in order.
    #[must_use]
    pub fn new(count: u64, pages: Vec<OccurrencePage>) -> Self {
        Self {
            count: Ok(count),
            pages: pages.into_iter().map(Ok).collect(),
            probes: RefCell::new(0),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Source whose count probe fails with `error`.
    #[must_use]
    pub fn with_probe_error(error: FetchError) -> Self {
        Self {
            count: Err(error),
            ..Self::new(0, Vec::new())
        }
    }

    /// Replace the `index`-th scripted page with `error`, extending the
    /// script with empty pages if needed.
    #[must_use]
    pub fn with_page_error(mut self, index: usize, error: FetchError) -> Self {
        while self.pages.len() <= index {
            self.pages.push(Ok(OccurrencePage::new(Vec::new())));
        }
        if let Some(slot) = self.pages.get_mut(index) {
            *slot = Err(error);
        }
        self
    }

    /// Offsets of every page request, in order.
    #[must_use]
    pub fn requested_offsets(&self) -> Vec<u64> {
        self.requests.borrow().iter().map(|r| r.offset).collect()
    }

    /// Every page request, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.borrow().clone()
    }

    /// Number of count probes issued.
    #[must_use]
    pub fn probes(&self) -> usize {
        *self.probes.borrow()
    }
}

impl OccurrenceSource for StubOccurrenceSource {
    fn count(&self, _extent: &SpatialExtent) -> Result<u64, FetchError> {
        *self.probes.borrow_mut() += 1;
        self.count.clone()
    }

    fn page(
        &self,
        _extent: &SpatialExtent,
        offset: u64,
        limit: u64,
    ) -> Result<OccurrencePage, FetchError> {
        let mut requests = self.requests.borrow_mut();
        let index = requests.len();
        requests.push(PageRequest { offset, limit });
        self.pages
            .get(index)
            .cloned()
            .unwrap_or_else(|| Ok(OccurrencePage::new(Vec::new())))
    }
}

/// Raw entry with every attribute present; `gbif_id` is `id`.
#[must_use]
pub fn raw_occurrence(id: u64, longitude: f64, latitude: f64) -> RawOccurrence {
    RawOccurrence {
        latitude: Some(latitude),
        longitude: Some(longitude),
        gbif_id: Some(id.to_string()),
        species: Some(format!("Species {id}")),
        country: Some("DE".to_owned()),
        event_date: Some("2020-06-01".to_owned()),
        catalog_number: Some(format!("CAT-{id}")),
        identified_by: Some("Tester".to_owned()),
        individual_count: Some("1".to_owned()),
    }
}

/// Page of `len` entries spread across the interior of `extent`.
///
/// Entry `i` gets id `first_id + i`. Longitudes step evenly from west to
/// east, so with an even `len` exactly half the points lie west of the
/// extent's midpoint.
#[must_use]
pub fn uniform_page(first_id: u64, len: u64, extent: &SpatialExtent) -> OccurrencePage {
    OccurrencePage::new(
        (0..len)
            .map(|i| {
                let (x, y) = spread(i, len, extent);
                raw_occurrence(first_id + i, x, y)
            })
            .collect(),
    )
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "fixture coordinates are interpolated across the extent"
)]
fn spread(i: u64, len: u64, extent: &SpatialExtent) -> (f64, f64) {
    let step = (i as f64 + 0.5) / len as f64;
    let lane = ((i * 7) % len) as f64;
    let tilt = (lane + 0.5) / len as f64;
    (
        extent.min_x() + step * (extent.max_x() - extent.min_x()),
        extent.min_y() + tilt * (extent.max_y() - extent.min_y()),
    )
}

/// Layer holding one axis-aligned rectangle.
#[must_use]
pub fn rectangle_layer(name: &str, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> PolygonLayer {
    let polygon = Polygon::new(
        LineString::from(vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ]),
        Vec::new(),
    );
    PolygonLayer::new(name, MultiPolygon::new(vec![polygon]))
}

/// A single progress update captured by [`RecordingProgress`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressReport {
    /// Units complete.
    pub current: u64,
    /// Units in total.
    pub max: u64,
    /// Stage label.
    pub label: String,
}

/// [`ProgressPort`] that records every update and can cancel on cue.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    reports: Vec<ProgressReport>,
    cancel_at: Option<u64>,
    cancelled: bool,
    events: usize,
}

impl RecordingProgress {
    /// Port that starts cancelling once a report with `current >= at` arrives.
    #[must_use]
    pub fn cancelling_at(at: u64) -> Self {
        Self {
            cancel_at: Some(at),
            ..Self::default()
        }
    }

    /// Port that is cancelled before any work starts.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            ..Self::default()
        }
    }

    /// Every update received.
    #[must_use]
    pub fn reports(&self) -> &[ProgressReport] {
        &self.reports
    }

    /// Most recent update.
    #[must_use]
    pub fn last(&self) -> Option<&ProgressReport> {
        self.reports.last()
    }

    /// Number of suspension points passed.
    #[must_use]
    pub const fn events(&self) -> usize {
        self.events
    }
}

impl ProgressPort for RecordingProgress {
    fn report(&mut self, current: u64, max: u64, label: &str) {
        self.reports.push(ProgressReport {
            current,
            max,
            label: label.to_owned(),
        });
        if self.cancel_at.is_some_and(|at| current >= at) {
            self.cancelled = true;
        }
    }

    fn process_events(&mut self) {
        self.events += 1;
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// [`LayerRegistry`] keeping groups and copies of their layers in memory.
#[derive(Debug, Default)]
pub struct InMemoryLayerRegistry {
    groups: Vec<(GroupHandle, Vec<OccurrenceCollection>)>,
    reject_layers: bool,
}

impl InMemoryLayerRegistry {
    /// Registry that already contains an empty group called `name`.
    #[must_use]
    pub fn with_existing_group(name: &str) -> Self {
        Self {
            groups: vec![(GroupHandle::new(name), Vec::new())],
            reject_layers: false,
        }
    }

    /// Registry that creates groups but refuses every layer.
    #[must_use]
    pub fn rejecting_layers() -> Self {
        Self {
            reject_layers: true,
            ..Self::default()
        }
    }

    /// Group names in creation order.
    #[must_use]
    pub fn group_names(&self) -> Vec<&str> {
        self.groups.iter().map(|(group, _)| group.name()).collect()
    }

    /// Layers registered in the group called `name`.
    #[must_use]
    pub fn layers(&self, name: &str) -> Option<&[OccurrenceCollection]> {
        self.groups
            .iter()
            .find(|(group, _)| group.name() == name)
            .map(|(_, layers)| layers.as_slice())
    }

    /// Total number of registered layers across all groups.
    #[must_use]
    pub fn layer_count(&self) -> usize {
        self.groups.iter().map(|(_, layers)| layers.len()).sum()
    }
}

impl LayerRegistry for InMemoryLayerRegistry {
    fn create_unique_group(&mut self, prefix: &str) -> Result<GroupHandle, RegistryError> {
        let name = unique_group_name(prefix, |candidate| {
            self.groups.iter().any(|(group, _)| group.name() == candidate)
        });
        let handle = GroupHandle::new(name);
        self.groups.push((handle.clone(), Vec::new()));
        Ok(handle)
    }

    fn register_layer(
        &mut self,
        group: &GroupHandle,
        layer: &OccurrenceCollection,
    ) -> Result<(), RegistryError> {
        let failure = |message: &str| RegistryError::RegisterLayer {
            group: group.name().to_owned(),
            layer: layer.name().to_owned(),
            source: message.into(),
        };
        if self.reject_layers {
            return Err(failure("registry rejects layers"));
        }
        let (_, layers) = self
            .groups
            .iter_mut()
            .find(|(existing, _)| existing == group)
            .ok_or_else(|| failure("unknown group"))?;
        layers.push(layer.clone());
        Ok(())
    }
}

/// [`LayerSelectionPort`] returning preset layers and recording requests.
#[derive(Debug, Default)]
pub struct FixedSelection {
    extent: Option<PolygonLayer>,
    overlay: Option<PolygonLayer>,
    requested: Vec<LayerKind>,
}

impl FixedSelection {
    /// Selection answering with `extent` and `overlay`.
    #[must_use]
    pub const fn new(extent: Option<PolygonLayer>, overlay: Option<PolygonLayer>) -> Self {
        Self {
            extent,
            overlay,
            requested: Vec::new(),
        }
    }

    /// Kinds requested so far.
    #[must_use]
    pub fn requested(&self) -> &[LayerKind] {
        &self.requested
    }
}

impl LayerSelectionPort for FixedSelection {
    fn choose(&mut self, kind: LayerKind) -> Option<PolygonLayer> {
        self.requested.push(kind);
        match kind {
            LayerKind::Extent => self.extent.clone(),
            LayerKind::Overlay => self.overlay.clone(),
        }
    }
}
