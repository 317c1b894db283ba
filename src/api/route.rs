//! Place search and route endpoint editing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{error, success, ApiResult};
use crate::errors::AppError;
use crate::models::{Endpoint, PlaceCandidate};
use crate::session::RouteState;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PlacesQuery {
    #[serde(default)]
    pub input: String,
}

fn parse_endpoint(raw: &str) -> Result<Endpoint, AppError> {
    match raw {
        "source" => Ok(Endpoint::Source),
        "destination" => Ok(Endpoint::Destination),
        other => Err(AppError::Validation(format!(
            "Unknown route endpoint '{}', expected 'source' or 'destination'",
            other
        ))),
    }
}

async fn route_state(state: &AppState) -> ApiResult<RouteState> {
    let session = state.view.session_snapshot().await;
    success(session.route, session.feed_revision)
}

/// GET /api/places?input= - Autocomplete suggestions.
pub async fn suggest_places(
    State(state): State<AppState>,
    Query(params): Query<PlacesQuery>,
) -> ApiResult<Vec<PlaceCandidate>> {
    let revision_id = state.view.revision().await;

    match state.view.suggest_places(&params.input).await {
        Ok(candidates) => success(candidates, revision_id),
        Err(e) => error(e, revision_id),
    }
}

#[derive(Debug, Deserialize)]
pub struct QueryTextRequest {
    pub text: String,
}

/// PUT /api/route/{endpoint}/query - Edit an endpoint's search text.
pub async fn set_query(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Json(request): Json<QueryTextRequest>,
) -> ApiResult<RouteState> {
    let endpoint = match parse_endpoint(&endpoint) {
        Ok(endpoint) => endpoint,
        Err(e) => return error(e, state.view.revision().await),
    };

    state.view.set_query(endpoint, request.text).await;
    route_state(&state).await
}

/// POST /api/route/{endpoint}/select - Use a place candidate as the endpoint.
pub async fn select_place(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    Json(candidate): Json<PlaceCandidate>,
) -> ApiResult<RouteState> {
    let revision_id = state.view.revision().await;
    let endpoint = match parse_endpoint(&endpoint) {
        Ok(endpoint) => endpoint,
        Err(e) => return error(e, revision_id),
    };

    match state.view.select_place(endpoint, &candidate).await {
        Ok(applied) => {
            if !applied {
                tracing::debug!("Selection of '{}' ignored", candidate.place_id);
            }
            route_state(&state).await
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/route/{endpoint}/current - Follow the device position.
pub async fn use_current_location(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
) -> ApiResult<RouteState> {
    let endpoint = match parse_endpoint(&endpoint) {
        Ok(endpoint) => endpoint,
        Err(e) => return error(e, state.view.revision().await),
    };

    state.view.use_device_location(endpoint).await;
    route_state(&state).await
}

/// DELETE /api/route/{endpoint} - Clear an endpoint.
pub async fn clear_endpoint(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
) -> ApiResult<RouteState> {
    let endpoint = match parse_endpoint(&endpoint) {
        Ok(endpoint) => endpoint,
        Err(e) => return error(e, state.view.revision().await),
    };

    state.view.clear_endpoint(endpoint).await;
    route_state(&state).await
}

/// POST /api/route/swap - Exchange source and destination.
pub async fn swap_endpoints(State(state): State<AppState>) -> ApiResult<RouteState> {
    state.view.swap_endpoints().await;
    route_state(&state).await
}
