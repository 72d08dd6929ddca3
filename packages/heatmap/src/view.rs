//! State for one mounted heat-map.
//!
//! [`HeatmapView`] ties the pieces together: it loads records from an
//! [`IncidentSource`], waits for the map surface to report ready, runs an
//! enrichment pass, and pushes markers and the info panel to the surface.
//!
//! A pass starts when the map becomes ready or when a new record
//! collection arrives. Each pass takes a generation number; its result is
//! only applied if no newer pass has started and the view is still
//! mounted. Until then the previous plotted set stays on screen, so
//! consumers never see a mix of two passes. A failed load invalidates any
//! running pass and clears the map.
//!
//! The state sits behind a `Mutex` that is only held between awaits.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::FixedOffset;
use safestreet_incident_models::{IncidentRecord, PlottedIncident};
use safestreet_source::IncidentSource;

use crate::enricher::{EnrichmentReport, IncidentEnricher};
use crate::progress::{ProgressCallback, null_progress};
use crate::selection::{InfoPanel, SelectionController};
use crate::surface::{MapSurface, Marker, MarkerEvent, MarkerStyle, ReadySignal};

/// Message shown when incidents cannot be loaded.
pub const LOAD_ERROR_MESSAGE: &str =
    "Unable to load incidents right now. Please reload the page to try again.";

/// What the user sees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    /// Incidents are being fetched.
    Loading,
    /// The fetch failed; normal rendering is halted until a reload.
    Failed {
        /// User-facing message.
        message: String,
    },
    /// Records are loaded; the map shows whatever has been plotted.
    Ready,
}

/// How a pass (or an attempt to start one) ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotOutcome {
    /// A pass ran and its result is now on screen.
    Applied(EnrichmentReport),
    /// Nothing to do: map not ready, no records, or the load failed.
    Skipped,
    /// The result arrived after a newer pass started or the view was
    /// unmounted, and was thrown away.
    Discarded,
}

/// A point-in-time copy of the view.
#[derive(Debug, Clone)]
pub struct ViewSnapshot {
    pub status: ViewStatus,
    pub map_ready: bool,
    pub record_count: usize,
    pub plotted: Arc<Vec<PlottedIncident>>,
    pub selected: Option<PlottedIncident>,
    pub hovered: Option<String>,
}

struct ViewState<S> {
    status: ViewStatus,
    records: Arc<Vec<IncidentRecord>>,
    map_ready: bool,
    plotted: Arc<Vec<PlottedIncident>>,
    selection: SelectionController,
    hovered: Option<String>,
    load_generation: u64,
    plot_generation: u64,
    mounted: bool,
    surface: S,
}

impl<S: MapSurface> ViewState<S> {
    fn contains(&self, incident_id: &str) -> bool {
        self.plotted.iter().any(|p| p.id() == incident_id)
    }

    /// Points the selection at the incident with the same id in the
    /// current plotted set, or clears it if that incident is gone.
    fn refresh_selection(&mut self) {
        let Some(selected_id) = self.selection.current().map(|p| p.id().to_string()) else {
            return;
        };
        match self.plotted.iter().find(|p| p.id() == selected_id).cloned() {
            Some(fresh) => self.selection.select(fresh),
            None => self.selection.clear(),
        }
    }

    fn render(&mut self, offset: FixedOffset) {
        let selected = self.selection.current().map(PlottedIncident::id);
        let hovered = self.hovered.as_deref();

        let markers: Vec<Marker> = self
            .plotted
            .iter()
            .map(|p| {
                let is_hovered = hovered == Some(p.id());
                let is_selected = selected == Some(p.id());
                Marker {
                    incident_id: p.record.id.clone(),
                    incident_type: p.record.incident_type.clone(),
                    coordinate: p.coordinate,
                    color: p.display_color.clone(),
                    address: p.address_string.clone(),
                    hovered: is_hovered,
                    selected: is_selected,
                    style: MarkerStyle::for_state(is_hovered, is_selected),
                }
            })
            .collect();
        let panel = self.selection.info_panel(offset);

        self.surface.render_markers(&markers);
        self.surface.render_info_panel(panel.as_ref());
    }
}

/// One mounted heat-map. Cheap to clone; clones share state.
pub struct HeatmapView<S> {
    state: Arc<Mutex<ViewState<S>>>,
    enricher: Arc<IncidentEnricher>,
    progress: Arc<dyn ProgressCallback>,
    display_offset: FixedOffset,
}

impl<S> Clone for HeatmapView<S> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
            enricher: self.enricher.clone(),
            progress: self.progress.clone(),
            display_offset: self.display_offset,
        }
    }
}

impl<S: MapSurface> HeatmapView<S> {
    #[must_use]
    pub fn new(enricher: Arc<IncidentEnricher>, surface: S, display_offset: FixedOffset) -> Self {
        Self {
            state: Arc::new(Mutex::new(ViewState {
                status: ViewStatus::Loading,
                records: Arc::new(Vec::new()),
                map_ready: false,
                plotted: Arc::new(Vec::new()),
                selection: SelectionController::new(),
                hovered: None,
                load_generation: 0,
                plot_generation: 0,
                mounted: true,
                surface,
            })),
            enricher,
            progress: null_progress(),
            display_offset,
        }
    }

    /// Reports enrichment progress to `progress`.
    #[must_use]
    pub fn with_progress(mut self, progress: Arc<dyn ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    fn lock(&self) -> MutexGuard<'_, ViewState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches records and, if the map is ready, plots them.
    ///
    /// A failed fetch moves the view to [`ViewStatus::Failed`]; it is not
    /// retried.
    pub async fn load(&self, source: &dyn IncidentSource) -> PlotOutcome {
        let token = {
            let mut state = self.lock();
            if !state.mounted {
                return PlotOutcome::Discarded;
            }
            state.load_generation += 1;
            state.status = ViewStatus::Loading;
            state.load_generation
        };

        log::info!("Loading incidents from {}", source.describe());
        let result = source.fetch().await;

        {
            let mut state = self.lock();
            if !state.mounted || state.load_generation != token {
                log::debug!("Discarding stale incident load {token}");
                return PlotOutcome::Discarded;
            }
            match result {
                Ok(records) => {
                    state.records = Arc::new(records);
                    state.status = ViewStatus::Ready;
                }
                Err(e) => {
                    log::error!("Failed to load incidents from {}: {e}", source.describe());
                    state.status = ViewStatus::Failed {
                        message: LOAD_ERROR_MESSAGE.to_string(),
                    };
                    state.plot_generation += 1;
                    state.records = Arc::new(Vec::new());
                    state.plotted = Arc::new(Vec::new());
                    state.selection.clear();
                    state.hovered = None;
                    state.render(self.display_offset);
                    return PlotOutcome::Skipped;
                }
            }
        }

        self.plot().await
    }

    /// Records that the map is interactive. The first call starts a pass;
    /// later calls do nothing.
    pub async fn mark_map_ready(&self) -> PlotOutcome {
        let newly_ready = {
            let mut state = self.lock();
            if !state.mounted {
                return PlotOutcome::Discarded;
            }
            !std::mem::replace(&mut state.map_ready, true)
        };

        if newly_ready {
            log::debug!("Map surface ready");
            self.plot().await
        } else {
            PlotOutcome::Skipped
        }
    }

    /// Waits for `signal`, then behaves like [`Self::mark_map_ready`].
    pub async fn wait_for_map(&self, mut signal: ReadySignal) -> PlotOutcome {
        if signal.wait().await {
            self.mark_map_ready().await
        } else {
            log::warn!("Map surface went away before becoming ready");
            PlotOutcome::Skipped
        }
    }

    /// Runs a full enrichment pass over the current records.
    pub async fn plot(&self) -> PlotOutcome {
        let (token, records, ready) = {
            let mut state = self.lock();
            if !state.mounted {
                return PlotOutcome::Discarded;
            }
            if state.status != ViewStatus::Ready
                || !IncidentEnricher::should_run(&state.records, state.map_ready)
            {
                return PlotOutcome::Skipped;
            }
            state.plot_generation += 1;
            (state.plot_generation, state.records.clone(), state.map_ready)
        };

        let Some(enrichment) = self
            .enricher
            .enrich(&records, ready, self.progress.as_ref())
            .await
        else {
            return PlotOutcome::Skipped;
        };

        let mut state = self.lock();
        if !state.mounted
            || state.plot_generation != token
            || state.status != ViewStatus::Ready
        {
            log::debug!("Discarding stale enrichment pass {token}");
            return PlotOutcome::Discarded;
        }

        state.plotted = Arc::new(enrichment.plotted);
        state.refresh_selection();
        if state
            .hovered
            .as_deref()
            .is_some_and(|id| !state.contains(id))
        {
            state.hovered = None;
        }
        state.render(self.display_offset);

        PlotOutcome::Applied(enrichment.report)
    }

    /// Starts over as if the page had been reloaded: selection, hover and
    /// plotted incidents are cleared, in-flight passes are abandoned, and
    /// records are fetched again.
    pub async fn reload(&self, source: &dyn IncidentSource) -> PlotOutcome {
        {
            let mut state = self.lock();
            if !state.mounted {
                return PlotOutcome::Discarded;
            }
            state.plot_generation += 1;
            state.selection.clear();
            state.hovered = None;
            state.records = Arc::new(Vec::new());
            state.plotted = Arc::new(Vec::new());
            state.render(self.display_offset);
        }

        self.load(source).await
    }

    /// Detaches the view. Anything still in flight finishes without
    /// effect.
    pub fn unmount(&self) {
        let mut state = self.lock();
        state.mounted = false;
        state.load_generation += 1;
        state.plot_generation += 1;
    }

    /// Applies a user interaction. Returns `true` if anything changed.
    ///
    /// Clicks and hovers naming an incident that is not in the current
    /// plotted set are ignored.
    pub fn handle_event(&self, event: MarkerEvent) -> bool {
        let mut state = self.lock();
        if !state.mounted {
            return false;
        }

        let changed = match event {
            MarkerEvent::Click { incident_id } => {
                let found = state
                    .plotted
                    .iter()
                    .find(|p| p.id() == incident_id)
                    .cloned();
                if let Some(incident) = found {
                    state.selection.select(incident);
                    true
                } else {
                    log::debug!("Ignoring click on unknown incident {incident_id}");
                    false
                }
            }
            MarkerEvent::HoverStart { incident_id } => {
                if state.contains(&incident_id) {
                    state.hovered = Some(incident_id);
                    true
                } else {
                    false
                }
            }
            MarkerEvent::HoverEnd => state.hovered.take().is_some(),
            MarkerEvent::ClosePanel => {
                let was_visible = state.selection.is_panel_visible();
                state.selection.clear();
                was_visible
            }
        };

        if changed {
            state.render(self.display_offset);
        }
        changed
    }

    #[must_use]
    pub fn status(&self) -> ViewStatus {
        self.lock().status.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> ViewSnapshot {
        let state = self.lock();
        ViewSnapshot {
            status: state.status.clone(),
            map_ready: state.map_ready,
            record_count: state.records.len(),
            plotted: state.plotted.clone(),
            selected: state.selection.current().cloned(),
            hovered: state.hovered.clone(),
        }
    }

    /// Info panel for the current selection.
    #[must_use]
    pub fn info_panel(&self) -> Option<InfoPanel> {
        self.lock().selection.info_panel(self.display_offset)
    }

    /// Runs `f` against the surface.
    pub fn with_surface<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock().surface)
    }

    #[must_use]
    pub fn enricher(&self) -> &IncidentEnricher {
        &self.enricher
    }
}
