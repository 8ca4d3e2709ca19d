//! Delayed scare sequence.

use axum::{extract::State, Json};
use std::sync::Arc;
use trickster_core::TriggerSource;

use crate::{models::TriggerResponse, AppState};

/// GET /trigger - Start the scare sequence, as if the button was pressed
///
/// The sequencer is claimed before responding, so a second request arriving
/// right after always sees it busy. The sequence itself runs on the blocking
/// pool and is not awaited.
pub async fn trigger_sequence(State(state): State<Arc<AppState>>) -> Json<TriggerResponse> {
    let Some(run) = state.sequencer.try_begin() else {
        log::info!("HTTP trigger ignored - action already in progress");
        return Json(TriggerResponse {
            success: false,
            message: "Action already in progress, ignoring trigger".to_string(),
            delay_range: None,
        });
    };

    let timing = state.sequencer.timing();
    let response = TriggerResponse {
        success: true,
        message: format!(
            "Delayed action triggered ({} second random delay)",
            timing.delay_span()
        ),
        delay_range: Some(timing.delay_label()),
    };

    log::info!("Delayed action triggered via HTTP");
    tokio::task::spawn_blocking(move || {
        run.run(TriggerSource::Http);
    });

    Json(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;
    use std::time::{Duration, Instant};

    async fn wait_idle(state: &AppState) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while state.sequencer.is_busy() {
            assert!(Instant::now() < deadline, "sequence did not finish");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    #[tokio::test]
    async fn test_trigger_starts_sequence() {
        let fixture = fixture(&["boo.wav"], 20);
        let Json(response) = trigger_sequence(State(fixture.state.clone())).await;

        assert!(response.success);
        assert_eq!(
            response.message,
            "Delayed action triggered (0.02-0.02 second random delay)"
        );
        assert_eq!(response.delay_range.as_deref(), Some("0.02-0.02 seconds"));

        wait_idle(&fixture.state).await;
        assert_eq!(fixture.pins.indicator_history(), vec![true, false]);
        assert!(!fixture.pins.duty_history().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_second_trigger_rejected() {
        let fixture = fixture(&["boo.wav"], 200);

        let Json(first) = trigger_sequence(State(fixture.state.clone())).await;
        let Json(second) = trigger_sequence(State(fixture.state.clone())).await;

        assert!(first.success);
        assert!(!second.success);
        assert!(second.message.contains("already in progress"));
        assert!(second.delay_range.is_none());

        wait_idle(&fixture.state).await;
        // Only the first trigger ran
        assert_eq!(fixture.pins.indicator_history(), vec![true, false]);
    }
}
