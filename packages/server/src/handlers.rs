//! HTTP handler functions for the heat-map API.

use actix_web::{HttpResponse, web};
use safestreet_heatmap::map_config::MapConfig;
use safestreet_heatmap::{GeoJsonSurface, MarkerEvent, PlotOutcome, ViewStatus};
use safestreet_incident_models::PlottedIncident;
use safestreet_server_models::{
    ApiError, ApiHealth, ApiIncidents, ApiLegend, ApiLegendEntry, ApiPlotOutcome, ApiPlotResult,
    ApiViewState, MapConfigParams,
};

use crate::AppState;

/// Width assumed when the client does not send one.
const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/map/config`
///
/// Returns the embedding configuration for the client's viewport width.
pub async fn map_config(
    state: web::Data<AppState>,
    params: web::Query<MapConfigParams>,
) -> HttpResponse {
    let width = params.width.unwrap_or(DEFAULT_VIEWPORT_WIDTH);
    HttpResponse::Ok().json(MapConfig::for_viewport(state.maps_api_key.clone(), width))
}

/// `POST /api/map/ready`
///
/// The client's map is interactive. The first call starts plotting.
pub async fn map_ready(state: web::Data<AppState>) -> HttpResponse {
    let outcome = state.view.mark_map_ready().await;
    HttpResponse::Ok().json(plot_result(outcome))
}

/// `GET /api/markers/legend`
pub async fn legend(state: web::Data<AppState>) -> HttpResponse {
    let entries = state
        .registry
        .legend()
        .iter()
        .map(|e| ApiLegendEntry {
            incident_type: e.incident_type.clone(),
            color: e.color.to_string(),
        })
        .collect();

    HttpResponse::Ok().json(ApiLegend {
        entries,
        fallback: state.registry.fallback().to_string(),
    })
}

/// `GET /api/incidents`
///
/// Returns the view state and the currently plotted markers.
pub async fn incidents(state: web::Data<AppState>) -> HttpResponse {
    let snapshot = state.view.snapshot();
    let markers = state.view.with_surface(GeoJsonSurface::feature_collection);

    let (view_state, message) = match snapshot.status {
        ViewStatus::Loading => (ApiViewState::Loading, None),
        ViewStatus::Failed { message } => (ApiViewState::Failed, Some(message)),
        ViewStatus::Ready => (ApiViewState::Ready, None),
    };

    HttpResponse::Ok().json(ApiIncidents {
        state: view_state,
        message,
        map_ready: snapshot.map_ready,
        record_count: snapshot.record_count,
        plotted_count: snapshot.plotted.len(),
        selected_id: snapshot
            .selected
            .as_ref()
            .map(|p| PlottedIncident::id(p).to_string()),
        hovered_id: snapshot.hovered,
        markers,
    })
}

/// `GET /api/selection`
///
/// Returns the info panel for the selected incident, or `null`.
pub async fn selection(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(state.view.info_panel())
}

/// `POST /api/selection/{id}`
pub async fn select(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let incident_id = path.into_inner();
    state.view.handle_event(MarkerEvent::Click {
        incident_id: incident_id.clone(),
    });

    match state.view.info_panel() {
        Some(panel) if panel.incident_id == incident_id => HttpResponse::Ok().json(panel),
        _ => not_plotted(&incident_id),
    }
}

/// `DELETE /api/selection`
pub async fn clear_selection(state: web::Data<AppState>) -> HttpResponse {
    state.view.handle_event(MarkerEvent::ClosePanel);
    HttpResponse::NoContent().finish()
}

/// `PUT /api/hover/{id}`
pub async fn hover_start(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    let incident_id = path.into_inner();
    state.view.handle_event(MarkerEvent::HoverStart {
        incident_id: incident_id.clone(),
    });

    if state.view.snapshot().hovered.as_deref() == Some(incident_id.as_str()) {
        HttpResponse::NoContent().finish()
    } else {
        not_plotted(&incident_id)
    }
}

/// `DELETE /api/hover`
pub async fn hover_end(state: web::Data<AppState>) -> HttpResponse {
    state.view.handle_event(MarkerEvent::HoverEnd);
    HttpResponse::NoContent().finish()
}

/// `POST /api/reload`
///
/// Throws away selection, hover and plotted markers and fetches the
/// incidents again.
pub async fn reload(state: web::Data<AppState>) -> HttpResponse {
    let outcome = state.view.reload(state.source.as_ref()).await;
    HttpResponse::Ok().json(plot_result(outcome))
}

fn not_plotted(incident_id: &str) -> HttpResponse {
    HttpResponse::NotFound().json(ApiError::new(format!(
        "Incident '{incident_id}' is not on the map"
    )))
}

fn plot_result(outcome: PlotOutcome) -> ApiPlotResult {
    match outcome {
        PlotOutcome::Applied(report) => ApiPlotResult {
            outcome: ApiPlotOutcome::Applied,
            attempted: report.attempted,
            plotted: report.plotted,
            dropped: report.dropped,
        },
        PlotOutcome::Skipped => ApiPlotResult {
            outcome: ApiPlotOutcome::Skipped,
            attempted: 0,
            plotted: 0,
            dropped: 0,
        },
        PlotOutcome::Discarded => ApiPlotResult {
            outcome: ApiPlotOutcome::Discarded,
            attempted: 0,
            plotted: 0,
            dropped: 0,
        },
    }
}
