//! Capture flow endpoints.

use axum::extract::State;
use serde::Serialize;

use super::{error, success, ApiResult};
use crate::map::SkipReason;
use crate::session::CaptureState;
use crate::AppState;

/// Outcome of a confirmation as seen by the shell.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmResponse {
    /// A write was issued; the dialog is shown either way
    pub published: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub capture: CaptureState,
}

async fn capture_state(state: &AppState) -> ApiResult<CaptureState> {
    let session = state.view.session_snapshot().await;
    success(session.capture, session.feed_revision)
}

/// POST /api/capture/open - Show the scanner.
pub async fn open_capture(State(state): State<AppState>) -> ApiResult<CaptureState> {
    if let Err(e) = state.view.open_capture().await {
        return error(e, state.view.revision().await);
    }
    capture_state(&state).await
}

/// POST /api/capture/close - Hide the scanner without reporting.
pub async fn close_capture(State(state): State<AppState>) -> ApiResult<CaptureState> {
    state.view.close_capture().await;
    capture_state(&state).await
}

/// POST /api/capture/confirm - Report a checkpoint at the current location.
pub async fn confirm_capture(State(state): State<AppState>) -> ApiResult<ConfirmResponse> {
    let receipt = state.view.confirm_capture().await;
    let session = state.view.session_snapshot().await;

    success(
        ConfirmResponse {
            published: receipt.published(),
            skipped: receipt.skipped,
            capture: session.capture,
        },
        session.feed_revision,
    )
}

/// POST /api/capture/dismiss - Hide the success dialog.
pub async fn dismiss_dialog(State(state): State<AppState>) -> ApiResult<CaptureState> {
    state.view.dismiss_dialog().await;
    capture_state(&state).await
}
