//! System status.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{models::StatusResponse, AppState};

/// GET /status - Busy flag and library summary
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let info = state.library.info();
    Json(StatusResponse {
        status: "running",
        callback_in_progress: state.sequencer.is_busy(),
        total_sounds: info.total_sounds,
        sounds_loaded: info.total_sounds > 0,
        audio_folder: info.audio_folder,
    })
}
