#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Incident heat-map pipeline.
//!
//! Wires the pieces between "the backend returned some incidents" and
//! "the map shows colored markers and an info panel":
//!
//! - [`marker`] maps incident types to marker colors.
//! - [`enricher`] geocodes records one after another and keeps the ones
//!   that resolved.
//! - [`selection`] holds the single incident currently being inspected.
//! - [`surface`] is the boundary to whatever widget actually draws the map.
//! - [`view`] owns all of the above for one mounted map and guards against
//!   results that arrive after they stopped being wanted.
//! - [`map_config`] and [`config`] describe how the map is embedded and how
//!   the pipeline is tuned.

pub mod config;
pub mod enricher;
pub mod map_config;
pub mod marker;
pub mod progress;
pub mod selection;
pub mod surface;
pub mod view;

pub use config::{ConfigError, HeatmapConfig};
pub use enricher::{Enrichment, EnrichmentReport, IncidentEnricher};
pub use marker::MarkerRegistry;
pub use selection::{InfoPanel, SelectionController};
pub use surface::{GeoJsonSurface, MapSurface, Marker, MarkerEvent, MarkerStyle};
pub use view::{HeatmapView, PlotOutcome, ViewSnapshot, ViewStatus};
