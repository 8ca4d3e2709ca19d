//! Library reload.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{models::ReloadResponse, AppState};

/// GET /reload - Rescan the audio folder
///
/// Decoding can take a while, so the scan runs on the blocking pool.
pub async fn reload_sounds(State(state): State<Arc<AppState>>) -> Json<ReloadResponse> {
    let library = state.library.clone();
    let previous_count = library.len();

    let reloaded = tokio::task::spawn_blocking(move || {
        library.reload();
        library.info()
    })
    .await;

    let response = match reloaded {
        Ok(info) => {
            log::info!(
                "Reloaded audio files: {} -> {}",
                previous_count,
                info.total_sounds
            );
            ReloadResponse {
                success: true,
                message: "Audio files reloaded successfully".to_string(),
                previous_count: Some(previous_count),
                new_count: Some(info.total_sounds),
                change: Some(info.total_sounds as i64 - previous_count as i64),
                audio_folder: Some(info.audio_folder),
                loaded_files: Some(info.sounds),
            }
        }
        Err(e) => {
            let message = format!("Error reloading audio files: {}", e);
            log::error!("{}", message);
            ReloadResponse::failed(message)
        }
    };
    Json(response)
}
