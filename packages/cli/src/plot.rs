//! The `plot` command: one fetch, one enrichment pass, `GeoJSON` out.
//!
//! Drives the same [`HeatmapView`] the server uses, with the map reported
//! ready up front so the pass starts as soon as records arrive.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use safestreet_cli_utils::{IndicatifProgress, MultiProgress};
use safestreet_geocoder::{build_http_client, service_registry};
use safestreet_heatmap::{
    GeoJsonSurface, HeatmapConfig, HeatmapView, MarkerRegistry, PlotOutcome, ViewStatus,
};
use safestreet_source::IncidentSource;
use safestreet_source::file::FileIncidentSource;
use safestreet_source::http::HttpIncidentSource;

/// Where to read incidents from.
pub enum Target {
    Url(String),
    File(PathBuf),
}

#[derive(Debug, thiserror::Error)]
pub enum PlotError {
    #[error("No incident source: pass --url or --file, or set SAFESTREET_INCIDENTS_URL")]
    NoSource,

    #[error("No geocoding service is available")]
    NoGeocoder,

    #[error("Failed to load incidents from {0}")]
    LoadFailed(String),
}

/// Runs the command.
///
/// # Errors
///
/// Returns an error if no geocoder can be built, the incidents cannot be
/// loaded, or the output cannot be written.
pub async fn run(
    multi: &MultiProgress,
    config: &HeatmapConfig,
    target: Target,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = build_http_client(config.http_timeout)?;
    let geocoder = service_registry::select_geocoder(&client).ok_or(PlotError::NoGeocoder)?;
    let enricher = config.enricher(geocoder, Arc::new(MarkerRegistry::default()));

    let source: Box<dyn IncidentSource> = match target {
        Target::Url(url) => Box::new(HttpIncidentSource::new(client, url)),
        Target::File(path) => Box::new(FileIncidentSource::new(path)),
    };

    let view = HeatmapView::new(
        Arc::new(enricher),
        GeoJsonSurface::new(),
        config.display_offset,
    )
    .with_progress(IndicatifProgress::lookups_bar(multi, "Waiting for incidents"));

    view.mark_map_ready().await;
    let outcome = view.load(source.as_ref()).await;

    if matches!(view.status(), ViewStatus::Failed { .. }) {
        return Err(PlotError::LoadFailed(source.describe()).into());
    }
    match outcome {
        PlotOutcome::Applied(report) => log::info!(
            "Plotted {} of {} incidents ({} dropped)",
            report.plotted,
            report.attempted,
            report.dropped
        ),
        _ => log::warn!("No incidents to plot"),
    }

    let collection = view.with_surface(GeoJsonSurface::feature_collection);
    let json = serde_json::to_string_pretty(&collection)?;

    match output {
        Some(path) => {
            tokio::fs::write(path, json).await?;
            log::info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
