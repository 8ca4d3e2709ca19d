//! Response models for the HTTP API.

use serde::Serialize;

// =============================================================================
// Playback
// =============================================================================

/// `GET /play`
#[derive(Debug, Serialize)]
pub struct PlayResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_sounds: Option<usize>,
}

impl PlayResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            filename: None,
            total_sounds: None,
        }
    }
}

/// `GET /trigger`
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    /// Only present when the sequence was started
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay_range: Option<String>,
}

// =============================================================================
// Library
// =============================================================================

/// `GET /status`
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    /// Whether a scare sequence is running
    pub callback_in_progress: bool,
    pub total_sounds: usize,
    pub sounds_loaded: bool,
    pub audio_folder: String,
}

/// `GET /sounds`
#[derive(Debug, Serialize)]
pub struct SoundsResponse {
    pub total_sounds: usize,
    pub sounds: Vec<String>,
}

/// `GET /reload`. Counts are absent when the reload failed.
#[derive(Debug, Serialize)]
pub struct ReloadResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_folder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_files: Option<Vec<String>>,
}

impl ReloadResponse {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            previous_count: None,
            new_count: None,
            change: None,
            audio_folder: None,
            loaded_files: None,
        }
    }
}
