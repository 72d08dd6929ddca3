//! Boundary to the widget that draws the map.
//!
//! The pipeline never draws anything itself. It hands a [`MapSurface`] the
//! full list of [`Marker`]s and the current [`InfoPanel`] after every state
//! change, and receives user interaction back as [`MarkerEvent`]s. Marker
//! appearance is derived from state ([`MarkerStyle::for_state`]) on every
//! render rather than patched onto already-rendered output.
//!
//! [`GeoJsonSurface`] is the concrete surface used by the HTTP server: it
//! keeps the last render as a GeoJSON `FeatureCollection` for a browser map
//! client to draw.

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value, feature::Id};
use safestreet_incident_models::{Coordinate, MarkerColor};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::selection::InfoPanel;

/// Visual emphasis of a marker, derived from hover/selection state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerStyle {
    pub scale: f64,
    pub z_index: i32,
    pub stroke_weight: u8,
    pub opacity: f64,
}

impl MarkerStyle {
    /// Style for a marker in the given state. Selection outranks hover.
    #[must_use]
    pub const fn for_state(hovered: bool, selected: bool) -> Self {
        match (hovered, selected) {
            (_, true) => Self {
                scale: 1.5,
                z_index: 3,
                stroke_weight: 3,
                opacity: 1.0,
            },
            (true, false) => Self {
                scale: 1.25,
                z_index: 2,
                stroke_weight: 2,
                opacity: 1.0,
            },
            (false, false) => Self {
                scale: 1.0,
                z_index: 1,
                stroke_weight: 1,
                opacity: 0.85,
            },
        }
    }
}

/// One marker to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    pub incident_id: String,
    pub incident_type: String,
    pub coordinate: Coordinate,
    pub color: MarkerColor,
    pub address: String,
    pub hovered: bool,
    pub selected: bool,
    pub style: MarkerStyle,
}

/// User interaction reported by a surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MarkerEvent {
    /// A marker was clicked.
    Click {
        #[serde(rename = "incidentId")]
        incident_id: String,
    },
    /// The pointer entered a marker.
    HoverStart {
        #[serde(rename = "incidentId")]
        incident_id: String,
    },
    /// The pointer left the hovered marker.
    HoverEnd,
    /// The info panel's close control was used.
    ClosePanel,
}

/// Something that can draw markers and an info panel.
pub trait MapSurface: Send {
    /// Replaces every marker on the map.
    fn render_markers(&mut self, markers: &[Marker]);

    /// Shows `panel`, or hides the panel when `None`.
    fn render_info_panel(&mut self, panel: Option<&InfoPanel>);
}

/// Creates a readiness pair. The notifier side belongs to the surface; the
/// signal side is observed by whoever waits for the map to be interactive.
#[must_use]
pub fn readiness() -> (ReadyNotifier, ReadySignal) {
    let (tx, rx) = watch::channel(false);
    (ReadyNotifier(tx), ReadySignal(rx))
}

/// Fires the readiness signal. Firing more than once has no further effect.
#[derive(Debug)]
pub struct ReadyNotifier(watch::Sender<bool>);

impl ReadyNotifier {
    pub fn fire(&self) {
        self.0.send_if_modified(|ready| !std::mem::replace(ready, true));
    }
}

/// Observes whether the map has become interactive.
#[derive(Debug, Clone)]
pub struct ReadySignal(watch::Receiver<bool>);

impl ReadySignal {
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.0.borrow()
    }

    /// Waits until the signal fires. Returns `false` if the notifier was
    /// dropped without ever firing.
    pub async fn wait(&mut self) -> bool {
        self.0.wait_for(|ready| *ready).await.is_ok()
    }
}

/// A surface that records the last render as GeoJSON.
#[derive(Debug, Clone, Default)]
pub struct GeoJsonSurface {
    markers: Vec<Marker>,
    info_panel: Option<InfoPanel>,
    renders: u64,
}

impl GeoJsonSurface {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    #[must_use]
    pub const fn info_panel(&self) -> Option<&InfoPanel> {
        self.info_panel.as_ref()
    }

    /// Number of marker renders so far.
    #[must_use]
    pub const fn render_count(&self) -> u64 {
        self.renders
    }

    /// The current markers as a `FeatureCollection` of points.
    #[must_use]
    pub fn feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.markers.iter().map(marker_feature).collect(),
            foreign_members: None,
        }
    }
}

impl MapSurface for GeoJsonSurface {
    fn render_markers(&mut self, markers: &[Marker]) {
        self.markers = markers.to_vec();
        self.renders += 1;
    }

    fn render_info_panel(&mut self, panel: Option<&InfoPanel>) {
        self.info_panel = panel.cloned();
    }
}

fn marker_feature(marker: &Marker) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("incidentType".into(), marker.incident_type.clone().into());
    properties.insert("color".into(), marker.color.to_string().into());
    properties.insert("address".into(), marker.address.clone().into());
    properties.insert("hovered".into(), marker.hovered.into());
    properties.insert("selected".into(), marker.selected.into());
    properties.insert(
        "style".into(),
        serde_json::to_value(marker.style).unwrap_or_default(),
    );

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            marker.coordinate.longitude,
            marker.coordinate.latitude,
        ]))),
        id: Some(Id::String(marker.incident_id.clone())),
        properties: Some(properties),
        foreign_members: None,
    }
}
