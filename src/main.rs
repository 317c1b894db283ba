//! MamaMaps core
//!
//! Headless session service for the crowdsourced checkpoint map: live report
//! feed, capture-and-publish, route overlay and place resolution, driven by a
//! thin UI shell over JSON.

mod api;
mod config;
mod db;
mod errors;
mod map;
mod models;
mod search;
mod services;
mod session;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use map::{MapServices, MapView, ViewSettings};
use search::Gazetteer;
use services::{
    AuthProvider, DirectionsService, FirebaseAuth, GoogleDirections, GooglePlaces, LocalAuth,
    PlaceAutocomplete, SqliteReportStore, StaticLocation, StraightLineDirections,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub view: Arc<MapView>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MamaMaps core");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Report collection: {}", config.reports_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    let view = build_view(&config).await?;
    view.mount().await?;

    let app = create_router(AppState { view: view.clone() });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    view.unmount().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

/// Wire the configured adapters into an unmounted map view.
///
/// Without a maps key, directions and places run locally. Without a
/// Firebase api key, sign-in runs locally.
pub async fn build_view(config: &Config) -> Result<Arc<MapView>, errors::AppError> {
    let http = reqwest::Client::new();

    // Report store
    let pool = db::init_database(&config.db_path).await?;
    let store = SqliteReportStore::open(Repository::new(pool), config.reports_path.as_str()).await?;
    if config.seed_demo_reports {
        store.seed_demo_reports().await?;
    }

    let auth: Arc<dyn AuthProvider> = match &config.firebase.api_key {
        Some(api_key) => {
            tracing::info!(
                "Using Firebase auth for project {}",
                config.firebase.project_id.as_deref().unwrap_or("<unknown>")
            );
            Arc::new(FirebaseAuth::new(http.clone(), api_key.as_str()))
        }
        None => {
            tracing::warn!("No Firebase api key configured (MAMA_FIREBASE_CONFIG), using local sign-in");
            Arc::new(LocalAuth)
        }
    };

    let (directions, places): (Arc<dyn DirectionsService>, Arc<dyn PlaceAutocomplete>) =
        match &config.maps_api_key {
            Some(key) => (
                Arc::new(GoogleDirections::new(http.clone(), key.as_str())),
                Arc::new(GooglePlaces::new(http, key.as_str())),
            ),
            None => {
                tracing::warn!("No maps key configured (MAMA_MAPS_API_KEY), using local directions and gazetteer");
                let gazetteer = Gazetteer::open(&config.index_path)?;
                let entries = match &config.gazetteer_path {
                    Some(path) => Gazetteer::load_file(path)?,
                    None => search::default_entries(),
                };
                gazetteer.load(&entries).await?;
                (Arc::new(StraightLineDirections), Arc::new(gazetteer))
            }
        };

    if config.device_location.is_none() {
        tracing::info!("No device location configured (MAMA_DEVICE_LOCATION), location access will be denied");
    }

    let services = MapServices {
        store: Arc::new(store),
        auth,
        location: Arc::new(StaticLocation::new(config.device_location)),
        directions,
        places,
    };

    Ok(MapView::new(services, ViewSettings::from_config(config)))
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Session
        .route("/state", get(api::get_state))
        .route("/map", get(api::get_map))
        .route("/reports", get(api::list_reports))
        .route("/location", put(api::put_location))
        .route("/permissions", put(api::put_permissions))
        // Capture
        .route("/capture/open", post(api::open_capture))
        .route("/capture/close", post(api::close_capture))
        .route("/capture/confirm", post(api::confirm_capture))
        .route("/capture/dismiss", post(api::dismiss_dialog))
        // Places and routing
        .route("/places", get(api::suggest_places))
        .route("/route/swap", post(api::swap_endpoints))
        .route("/route/{endpoint}", delete(api::clear_endpoint))
        .route("/route/{endpoint}/query", put(api::set_query))
        .route("/route/{endpoint}/select", post(api::select_place))
        .route("/route/{endpoint}/current", post(api::use_current_location));

    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
