//! HTTP control API for Trickster.
//!
//! Every route is a plain `GET` returning JSON with status 200; failures are
//! reported in the body as `success: false`. Other methods get a 405 from
//! the router.
//!
//! | Route      | Effect                                          |
//! |------------|-------------------------------------------------|
//! | `/play`    | Play one random sound right away                |
//! | `/trigger` | Start the delayed scare sequence in background  |
//! | `/status`  | Busy flag and library summary                   |
//! | `/sounds`  | List the loaded sounds                          |
//! | `/reload`  | Rescan the audio folder                         |
//!
//! # Usage
//!
//! ```ignore
//! use trickster_http::{serve, AppState};
//!
//! let state = AppState::from_controller(&controller);
//! serve(state, "0.0.0.0:5000".parse()?, async { shutdown_rx.await.ok(); }).await?;
//! ```

mod models;
mod routes;

use axum::{routing::get, Router};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use trickster_core::{ActionSequencer, Controller, SoundLibrary};

pub use models::*;

/// Shared application state for HTTP handlers.
pub struct AppState {
    /// Sounds for `/play`, `/sounds`, `/reload` and `/status`
    pub library: Arc<SoundLibrary>,
    /// The scare sequencer behind `/trigger`
    pub sequencer: ActionSequencer,
}

impl AppState {
    pub fn from_controller(controller: &Controller) -> Self {
        Self {
            library: controller.library().clone(),
            sequencer: controller.sequencer().clone(),
        }
    }
}

/// Routes and one-line descriptions, for the startup log.
pub fn endpoint_summary(delay_range: &str) -> Vec<(&'static str, String)> {
    vec![
        ("GET /play", "Play a random sound (immediate)".to_string()),
        ("GET /trigger", format!("Trigger delayed action ({} delay)", delay_range)),
        ("GET /status", "Get system status".to_string()),
        ("GET /sounds", "List all available sounds".to_string()),
        ("GET /reload", "Reload audio files from folder".to_string()),
    ]
}

/// Build the router with all routes.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/play", get(routes::play::play_sound))
        .route("/trigger", get(routes::trigger::trigger_sequence))
        .route("/status", get(routes::status::get_status))
        .route("/sounds", get(routes::sounds::list_sounds))
        .route("/reload", get(routes::reload::reload_sounds))
        .with_state(Arc::new(state))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!(
        "HTTP API server starting on http://{}:{}",
        addr.ip(),
        addr.port()
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    log::info!("HTTP API server stopped");
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::AppState;
    use std::path::Path;
    use std::sync::Arc;
    use std::time::Duration;
    use trickster_core::hardware::ServoMotion;
    use trickster_core::{
        ActionSequencer, Actuators, NullBackend, SequenceTiming, SimulatedPins, SoundLibrary,
    };

    /// A 10 ms silent mono WAV, so the null backend can decode it.
    pub fn write_wav(dir: &Path, name: &str) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dir.join(name), spec).unwrap();
        for _ in 0..441 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    pub struct Fixture {
        pub dir: tempfile::TempDir,
        pub pins: Arc<SimulatedPins>,
        pub state: Arc<AppState>,
    }

    /// Library over a temp dir holding `files`, with a sequence that
    /// lasts about `run_ms` and a servo delay of exactly `run_ms`.
    pub fn fixture(files: &[&str], run_ms: u64) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            write_wav(dir.path(), name);
        }

        let library = Arc::new(SoundLibrary::new(dir.path(), Arc::new(NullBackend::new())));
        library.load(dir.path());

        let pins = Arc::new(SimulatedPins::new());
        let motion = ServoMotion {
            settle: Duration::ZERO,
            hold: Duration::ZERO,
            step: Duration::ZERO,
            scare_angle: 0.0,
            return_angle: 5.0,
        };
        let actuators = Arc::new(Actuators::new(pins.clone(), motion));
        let delay = run_ms as f64 / 1000.0;
        let timing = SequenceTiming {
            target_duration: Duration::from_millis(run_ms),
            delay_secs: delay..=delay,
            pause_secs: 0.0..=0.001,
            poll_interval: Duration::from_millis(1),
        };

        let state = Arc::new(AppState {
            library: library.clone(),
            sequencer: ActionSequencer::new(library, actuators, timing),
        });
        Fixture { dir, pins, state }
    }
}
