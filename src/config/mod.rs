//! Configuration module for the MamaMaps core.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{GeoBounds, LatLng, PlaceBias, TravelMode};

const DEFAULT_REPORTS_PATH: &str = "artifacts/nammamama-default/public/data/reports";
const DEFAULT_CENTER: &str = "12.9716,77.5946";
const DEFAULT_PLACES_BOUNDS: &str = "12.80,77.35,13.15,77.85";

/// Firebase web config (`MAMA_FIREBASE_CONFIG`), only the keys the core needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirebaseConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Path to the SQLite report store
    pub db_path: PathBuf,
    /// Path to the local place index directory
    pub index_path: PathBuf,
    /// Optional JSON file of gazetteer entries to index
    pub gazetteer_path: Option<PathBuf>,
    /// Maps web services key; without it local directions and places are used
    pub maps_api_key: Option<String>,
    /// Firebase project config; without an api key the local auth provider is used
    pub firebase: FirebaseConfig,
    /// Pre-supplied custom sign-in token
    pub initial_auth_token: Option<String>,
    /// Logical collection path of the report documents
    pub reports_path: String,
    /// Fixed device position; unset means the location permission is denied
    pub device_location: Option<LatLng>,
    /// Camera centre before the first location fix
    pub default_center: LatLng,
    /// Autocomplete scope
    pub place_bias: PlaceBias,
    pub travel_mode: TravelMode,
    /// Radius of the danger circle drawn around each report
    pub danger_radius_m: f64,
    /// Insert the demo reports into an empty collection at startup
    pub seed_demo_reports: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let bind_addr = env_or("MAMA_BIND_ADDR", "127.0.0.1:8080")
            .parse()
            .map_err(|_| AppError::Validation("Invalid MAMA_BIND_ADDR format".to_string()))?;

        let log_level = env_or("MAMA_LOG_LEVEL", "info");
        let db_path = env_or("MAMA_DB_PATH", "./data/reports.sqlite").into();
        let index_path = env_or("MAMA_INDEX_PATH", "./data/places").into();
        let gazetteer_path = env_opt("MAMA_GAZETTEER_PATH").map(PathBuf::from);
        let maps_api_key = env_opt("MAMA_MAPS_API_KEY");

        let firebase = match env_opt("MAMA_FIREBASE_CONFIG") {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Validation(format!("Invalid MAMA_FIREBASE_CONFIG: {}", e))
            })?,
            None => FirebaseConfig::default(),
        };

        let initial_auth_token = env_opt("MAMA_INITIAL_AUTH_TOKEN");
        let reports_path = env_or("MAMA_REPORTS_PATH", DEFAULT_REPORTS_PATH);

        let device_location = env_opt("MAMA_DEVICE_LOCATION")
            .map(|v| LatLng::parse(&v))
            .transpose()?;
        let default_center = LatLng::parse(&env_or("MAMA_DEFAULT_CENTER", DEFAULT_CENTER))?;

        let place_bias = PlaceBias {
            country: env_or("MAMA_PLACES_COUNTRY", "in").to_ascii_lowercase(),
            bounds: GeoBounds::parse(&env_or("MAMA_PLACES_BOUNDS", DEFAULT_PLACES_BOUNDS))?,
            strict_bounds: parse_flag("MAMA_PLACES_STRICT_BOUNDS")?,
        };

        let travel_mode = env_or("MAMA_TRAVEL_MODE", "driving").parse()?;

        let danger_radius_m = env_or("MAMA_DANGER_RADIUS_M", "150")
            .parse::<f64>()
            .ok()
            .filter(|r| r.is_finite() && *r > 0.0)
            .ok_or_else(|| {
                AppError::Validation("MAMA_DANGER_RADIUS_M must be a positive number".to_string())
            })?;

        let seed_demo_reports = parse_flag("MAMA_SEED_DEMO_REPORTS")?;

        Ok(Self {
            bind_addr,
            log_level,
            db_path,
            index_path,
            gazetteer_path,
            maps_api_key,
            firebase,
            initial_auth_token,
            reports_path,
            device_location,
            default_center,
            place_bias,
            travel_mode,
            danger_radius_m,
            seed_demo_reports,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Unset and blank values both count as absent.
fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(key: &str) -> Result<bool, AppError> {
    match env_opt(key).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0") | Some("false") | Some("no") => Ok(false),
        Some("1") | Some("true") | Some("yes") => Ok(true),
        Some(other) => Err(AppError::Validation(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}
