//! Immediate playback.

use axum::{extract::State, Json};
use std::sync::Arc;
use trickster_core::PlayOutcome;

use crate::{models::PlayResponse, AppState};

/// GET /play - Play a random sound right away
///
/// Starting playback waits for the audio thread, so it runs on the blocking
/// pool.
pub async fn play_sound(State(state): State<Arc<AppState>>) -> Json<PlayResponse> {
    let library = state.library.clone();
    let played = tokio::task::spawn_blocking(move || library.play_random()).await;

    let response = match played {
        Ok(Ok(PlayOutcome::Played {
            filename,
            total_sounds,
        })) => PlayResponse {
            success: true,
            message: format!("Playing {}", filename),
            filename: Some(filename),
            total_sounds: Some(total_sounds),
        },
        Ok(Ok(PlayOutcome::Empty)) => PlayResponse::failed("No audio files available to play."),
        Ok(Err(e)) => {
            let message = format!("Error playing audio: {}", e);
            log::error!("{}", message);
            PlayResponse::failed(message)
        }
        Err(e) => {
            let message = format!("Error playing audio: {}", e);
            log::error!("{}", message);
            PlayResponse::failed(message)
        }
    };
    Json(response)
}
