#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the incident heat-map.
//!
//! Owns one [`HeatmapView`] backed by a [`GeoJsonSurface`]. A browser map
//! client reads markers and the info panel from it and reports map
//! readiness, clicks and hovers back through the REST API.

mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{App, HttpServer, middleware, web};
use safestreet_geocoder::{GeocodeError, build_http_client, service_registry};
use safestreet_heatmap::{
    ConfigError, GeoJsonSurface, HeatmapConfig, HeatmapView, MarkerRegistry, PlotOutcome,
};
use safestreet_source::IncidentSource;
use safestreet_source::http::HttpIncidentSource;

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to build HTTP client: {0}")]
    Client(#[from] GeocodeError),

    #[error("SAFESTREET_INCIDENTS_URL is not set")]
    MissingIncidentsUrl,

    #[error("No geocoding service is available")]
    NoGeocoder,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Shared application state.
pub struct AppState {
    /// The one heat-map this server exposes.
    pub view: HeatmapView<GeoJsonSurface>,
    /// Where incidents are (re)loaded from.
    pub source: Arc<dyn IncidentSource>,
    /// Marker colors, for the legend.
    pub registry: Arc<MarkerRegistry>,
    /// Key handed to the browser for embedding the map.
    pub maps_api_key: Option<String>,
}

impl AppState {
    /// Builds the view and incident source described by `config`.
    ///
    /// # Errors
    ///
    /// * [`ServerError::MissingIncidentsUrl`] if no backend URL is configured
    /// * [`ServerError::NoGeocoder`] if no geocoding service can be built
    /// * [`ServerError::Client`] if the HTTP client cannot be created
    pub fn from_config(config: &HeatmapConfig) -> Result<Self, ServerError> {
        let url = config
            .incidents_url
            .clone()
            .ok_or(ServerError::MissingIncidentsUrl)?;

        let client = build_http_client(config.http_timeout)?;
        let geocoder =
            service_registry::select_geocoder(&client).ok_or(ServerError::NoGeocoder)?;
        let registry = Arc::new(MarkerRegistry::default());
        let enricher = config.enricher(geocoder, registry.clone());

        Ok(Self {
            view: HeatmapView::new(
                Arc::new(enricher),
                GeoJsonSurface::new(),
                config.display_offset,
            ),
            source: Arc::new(HttpIncidentSource::new(client, url)),
            registry,
            maps_api_key: config.maps_api_key.clone(),
        })
    }
}

/// Registers the `/api` routes.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/map/config", web::get().to(handlers::map_config))
            .route("/map/ready", web::post().to(handlers::map_ready))
            .route("/markers/legend", web::get().to(handlers::legend))
            .route("/incidents", web::get().to(handlers::incidents))
            .route("/selection", web::get().to(handlers::selection))
            .route("/selection", web::delete().to(handlers::clear_selection))
            .route("/selection/{id}", web::post().to(handlers::select))
            .route("/hover", web::delete().to(handlers::hover_end))
            .route("/hover/{id}", web::put().to(handlers::hover_start))
            .route("/reload", web::post().to(handlers::reload)),
    );
}

/// Initializes logging and starts the server.
///
/// This is a regular async function; the caller provides the runtime
/// (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// See [`serve`].
#[allow(clippy::future_not_send)]
pub async fn run_server() -> Result<(), ServerError> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    serve().await
}

/// Starts the server with an already-initialized logger.
///
/// Reads [`HeatmapConfig`] from the environment, kicks off the initial
/// incident load in the background, and serves until shut down.
///
/// # Errors
///
/// Returns [`ServerError`] if configuration is invalid or the HTTP
/// server fails to bind.
#[allow(clippy::future_not_send)]
pub async fn serve() -> Result<(), ServerError> {
    let config = HeatmapConfig::from_env()?;
    let state = web::Data::new(AppState::from_config(&config)?);

    {
        let state = state.clone();
        actix_rt::spawn(async move {
            match state.view.load(state.source.as_ref()).await {
                PlotOutcome::Applied(report) => log::info!("Initial plot: {report:?}"),
                outcome => log::debug!("Initial load finished: {outcome:?}"),
            }
        });
    }

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8080);

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        App::new()
            .wrap(Cors::permissive())
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await?;

    Ok(())
}
