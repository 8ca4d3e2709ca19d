//! Library listing.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{models::SoundsResponse, AppState};

/// GET /sounds - List all loaded sounds
pub async fn list_sounds(State(state): State<Arc<AppState>>) -> Json<SoundsResponse> {
    let info = state.library.info();
    Json(SoundsResponse {
        total_sounds: info.total_sounds,
        sounds: info.sounds,
    })
}
