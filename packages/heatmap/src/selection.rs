//! Single-slot selection state and the info panel it drives.

use chrono::FixedOffset;
use safestreet_incident_models::{Coordinate, MarkerColor, PlottedIncident};
use serde::{Deserialize, Serialize};

/// Holds the incident currently being inspected, if any.
///
/// No queue and no history: selecting replaces, clearing empties.
#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    current: Option<PlottedIncident>,
}

impl SelectionController {
    #[must_use]
    pub const fn new() -> Self {
        Self { current: None }
    }

    /// Makes `incident` the current selection, replacing any prior one.
    pub fn select(&mut self, incident: PlottedIncident) {
        self.current = Some(incident);
    }

    /// Drops the current selection.
    pub fn clear(&mut self) {
        self.current = None;
    }

    #[must_use]
    pub const fn current(&self) -> Option<&PlottedIncident> {
        self.current.as_ref()
    }

    /// The info panel is shown exactly when something is selected.
    #[must_use]
    pub const fn is_panel_visible(&self) -> bool {
        self.current.is_some()
    }

    /// Builds the info panel for the current selection.
    #[must_use]
    pub fn info_panel(&self, offset: FixedOffset) -> Option<InfoPanel> {
        self.current.as_ref().map(|i| InfoPanel::new(i, offset))
    }
}

/// What the info panel shows for a selected incident.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoPanel {
    pub incident_id: String,
    /// Incident type, used as the panel heading.
    pub title: String,
    pub date: String,
    pub time: String,
    pub vehicle_type: String,
    /// Omitted when the incident has no description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub address: String,
    pub color: MarkerColor,
    /// Where the panel is pinned on the map.
    pub anchor: Coordinate,
}

impl InfoPanel {
    #[must_use]
    pub fn new(incident: &PlottedIncident, offset: FixedOffset) -> Self {
        let record = &incident.record;
        Self {
            incident_id: record.id.clone(),
            title: record.incident_type.clone(),
            date: record.display_date(offset),
            time: record.display_time(offset),
            vehicle_type: record.vehicle_type.clone(),
            description: record.description_text().map(String::from),
            address: incident.address_string.clone(),
            color: incident.display_color.clone(),
            anchor: incident.coordinate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enricher::tests::record;

    fn plotted(id: &str) -> PlottedIncident {
        PlottedIncident {
            record: record(id, "Collision", "Main St", "Sydney"),
            coordinate: Coordinate::new(-33.86, 151.2),
            display_color: "#E53935".parse().unwrap(),
            address_string: "Main St, Sydney, Australia".to_string(),
        }
    }

    #[test]
    fn select_replaces_then_clear_empties() {
        let mut selection = SelectionController::new();
        assert!(!selection.is_panel_visible());

        selection.select(plotted("a"));
        selection.select(plotted("b"));
        assert_eq!(selection.current().map(PlottedIncident::id), Some("b"));
        assert!(selection.is_panel_visible());

        selection.clear();
        assert!(selection.current().is_none());
        assert!(!selection.is_panel_visible());
    }

    #[test]
    fn info_panel_formats_record() {
        let mut selection = SelectionController::new();
        let mut incident = plotted("a");
        incident.record.description = Some("Rear-ended at lights".to_string());
        selection.select(incident);

        let panel = selection
            .info_panel(FixedOffset::east_opt(11 * 3600).unwrap())
            .unwrap();
        assert_eq!(panel.title, "Collision");
        assert_eq!(panel.date, "09/03/2024");
        assert_eq!(panel.time, "3:05 pm");
        assert_eq!(panel.description.as_deref(), Some("Rear-ended at lights"));
        assert_eq!(panel.anchor, Coordinate::new(-33.86, 151.2));
    }

    #[test]
    fn info_panel_omits_missing_description() {
        let panel = InfoPanel::new(&plotted("a"), FixedOffset::east_opt(0).unwrap());
        let json = serde_json::to_value(&panel).unwrap();
        assert!(json.get("description").is_none());
        assert_eq!(json["incidentId"], "a");
    }

    #[test]
    fn no_selection_no_panel() {
        assert!(
            SelectionController::new()
                .info_panel(FixedOffset::east_opt(0).unwrap())
                .is_none()
        );
    }
}
