//! Session read-back and device event endpoints.

use axum::{extract::State, Json};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::models::{LatLng, MapScene, Report};
use crate::session::{Permissions, SessionState};
use crate::AppState;

/// GET /api/state - The full session state.
pub async fn get_state(State(state): State<AppState>) -> ApiResult<SessionState> {
    let session = state.view.session_snapshot().await;
    let revision_id = session.feed_revision;
    success(session, revision_id)
}

/// GET /api/map - What the map currently shows.
pub async fn get_map(State(state): State<AppState>) -> ApiResult<MapScene> {
    let revision_id = state.view.revision().await;
    success(state.view.scene().await, revision_id)
}

/// GET /api/reports - Reports from the latest snapshot.
pub async fn list_reports(State(state): State<AppState>) -> ApiResult<Vec<Report>> {
    let (reports, revision_id) = state.view.reports().await;
    success(reports, revision_id)
}

/// A GPS fix pushed by the shell.
#[derive(Debug, Deserialize)]
pub struct LocationRequest {
    pub lat: f64,
    pub lng: f64,
}

/// PUT /api/location - Report a device position.
pub async fn put_location(
    State(state): State<AppState>,
    Json(request): Json<LocationRequest>,
) -> ApiResult<SessionState> {
    let revision_id = state.view.revision().await;

    let fix = match LatLng::new(request.lat, request.lng) {
        Ok(fix) => fix,
        Err(e) => return error(e, revision_id),
    };

    if let Err(e) = state.view.on_location_fix(fix).await {
        return error(e, revision_id);
    }

    success(state.view.session_snapshot().await, revision_id)
}

#[derive(Debug, Deserialize)]
pub struct PermissionsRequest {
    #[serde(default)]
    pub location: Option<bool>,
    #[serde(default)]
    pub camera: Option<bool>,
}

/// PUT /api/permissions - Update device permission state.
pub async fn put_permissions(
    State(state): State<AppState>,
    Json(request): Json<PermissionsRequest>,
) -> ApiResult<Permissions> {
    state
        .view
        .set_permissions(request.location, request.camera)
        .await;

    let session = state.view.session_snapshot().await;
    success(session.permissions, session.feed_revision)
}
