//! The scare sequencer.
//!
//! A triggered sequence runs two phases at the same time:
//!
//! - **Phase A** plays random sounds back to back (with a random pause in
//!   between) until the configured minimum duration has passed.
//! - **Phase B** waits a random delay and then sweeps the servo.
//!
//! Only one sequence runs at a time. The busy flag is claimed with a
//! compare-and-swap and released by the [`SequenceRun`] guard, so the LED
//! goes off and the flag clears on every exit path, panics included.

use crate::config::Config;
use crate::hardware::Actuators;
use crate::library::SoundLibrary;
use crate::error::Result;
use rand::Rng;
use serde::Serialize;
use std::fmt;
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

const PLAYBACK_POLL: Duration = Duration::from_millis(100);

/// What started a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerSource {
    Button,
    Http,
    Manual,
}

impl fmt::Display for TriggerSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerSource::Button => write!(f, "button"),
            TriggerSource::Http => write!(f, "http"),
            TriggerSource::Manual => write!(f, "manual"),
        }
    }
}

/// Timing of a sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceTiming {
    /// Phase A keeps going until this much time has passed
    pub target_duration: Duration,
    /// Delay before phase B, in seconds
    pub delay_secs: RangeInclusive<f64>,
    /// Pause between two sounds, in seconds
    pub pause_secs: RangeInclusive<f64>,
    /// How often phase A checks whether a sound has finished
    pub poll_interval: Duration,
}

impl SequenceTiming {
    pub fn from_config(config: &Config) -> Self {
        Self {
            target_duration: config.target_duration(),
            delay_secs: config.delay_range(),
            pause_secs: config.pause_range(),
            poll_interval: PLAYBACK_POLL,
        }
    }

    /// Delay bounds as `min-max`, e.g. `10-20`
    pub fn delay_span(&self) -> String {
        format!("{}-{}", self.delay_secs.start(), self.delay_secs.end())
    }

    /// Delay range for humans, e.g. `10-20 seconds`
    pub fn delay_label(&self) -> String {
        format!("{} seconds", self.delay_span())
    }
}

/// What happened during a completed sequence.
#[derive(Debug, Clone)]
pub struct SequenceReport {
    pub source: TriggerSource,
    /// Files played by phase A, in order
    pub sounds_played: Vec<String>,
    /// Delay phase B waited before the sweep
    pub servo_delay: Duration,
    /// Wall-clock time from start to join
    pub elapsed: Duration,
    /// Phase A finished without error or panic
    pub audio_ok: bool,
    /// Phase B finished without error or panic
    pub servo_ok: bool,
}

/// Result of [`ActionSequencer::trigger`].
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    Completed(SequenceReport),
    /// Another sequence was already running. Nothing happened.
    Rejected,
}

impl TriggerOutcome {
    pub fn is_rejected(&self) -> bool {
        matches!(self, TriggerOutcome::Rejected)
    }
}

struct Inner {
    busy: AtomicBool,
    library: Arc<SoundLibrary>,
    actuators: Arc<Actuators>,
    timing: SequenceTiming,
}

/// Runs one scare sequence at a time. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct ActionSequencer {
    inner: Arc<Inner>,
}

impl ActionSequencer {
    pub fn new(
        library: Arc<SoundLibrary>,
        actuators: Arc<Actuators>,
        timing: SequenceTiming,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                busy: AtomicBool::new(false),
                library,
                actuators,
                timing,
            }),
        }
    }

    /// Whether a sequence is running right now.
    pub fn is_busy(&self) -> bool {
        self.inner.busy.load(Ordering::Acquire)
    }

    pub fn timing(&self) -> &SequenceTiming {
        &self.inner.timing
    }

    /// Claim the sequencer without running anything yet.
    ///
    /// Returns `None` if a sequence is already running. The returned guard
    /// keeps the sequencer busy until it is run or dropped.
    pub fn try_begin(&self) -> Option<SequenceRun> {
        self.inner
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| SequenceRun {
                sequencer: self.clone(),
            })
    }

    /// Run a full sequence on the calling thread, or do nothing if one is
    /// already running.
    pub fn trigger(&self, source: TriggerSource) -> TriggerOutcome {
        match self.try_begin() {
            Some(run) => TriggerOutcome::Completed(run.run(source)),
            None => {
                log::info!("Trigger from {} ignored - action already in progress", source);
                TriggerOutcome::Rejected
            }
        }
    }
}

impl fmt::Debug for ActionSequencer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionSequencer")
            .field("busy", &self.is_busy())
            .field("timing", &self.inner.timing)
            .finish_non_exhaustive()
    }
}

/// A claimed sequence. Dropping it switches the LED off and clears the busy
/// flag, in that order.
pub struct SequenceRun {
    sequencer: ActionSequencer,
}

impl SequenceRun {
    /// Run both phases and wait for them. Faults are logged, never raised.
    pub fn run(self, source: TriggerSource) -> SequenceReport {
        let inner = &self.sequencer.inner;
        let started = Instant::now();
        log::info!("Sequence triggered by {}", source);

        if let Err(e) = inner.actuators.set_indicator(true) {
            log::error!("Failed to switch LED on: {}", e);
        }

        let servo_delay = random_duration(&inner.timing.delay_secs);

        let (audio, servo) = thread::scope(|scope| {
            let audio = scope.spawn(|| play_audio_phase(&inner.library, &inner.timing));
            let servo = scope.spawn(|| servo_phase(&inner.actuators, servo_delay));
            (audio.join(), servo.join())
        });

        let (sounds_played, audio_ok) = match audio {
            Ok(Ok(played)) => (played, true),
            Ok(Err((played, e))) => {
                log::error!("Audio phase failed: {}", e);
                (played, false)
            }
            Err(_) => {
                log::error!("Audio phase panicked");
                (Vec::new(), false)
            }
        };

        let servo_ok = match servo {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                log::error!("Servo phase failed: {}", e);
                false
            }
            Err(_) => {
                log::error!("Servo phase panicked");
                false
            }
        };

        let elapsed = started.elapsed();
        log::info!(
            "Action completed! {} sounds over {:.1}s",
            sounds_played.len(),
            elapsed.as_secs_f64()
        );

        SequenceReport {
            source,
            sounds_played,
            servo_delay,
            elapsed,
            audio_ok,
            servo_ok,
        }
    }
}

impl Drop for SequenceRun {
    fn drop(&mut self) {
        let inner = &self.sequencer.inner;
        if let Err(e) = inner.actuators.set_indicator(false) {
            log::error!("Failed to switch LED off: {}", e);
        }
        inner.busy.store(false, Ordering::Release);
    }
}

/// Phase A. Returns the files played; on failure also the ones played so far.
fn play_audio_phase(
    library: &SoundLibrary,
    timing: &SequenceTiming,
) -> std::result::Result<Vec<String>, (Vec<String>, crate::error::Error)> {
    let mut played = Vec::new();
    if library.is_empty() {
        log::warn!("No audio files available to play");
        return Ok(played);
    }

    let started = Instant::now();
    log::info!("Starting extended audio sequence...");

    while started.elapsed() < timing.target_duration {
        let Some(asset) = library.pick_random() else {
            break;
        };
        if let Err(e) = library.play(&asset) {
            return Err((played, e));
        }
        played.push(asset.filename);

        while library.is_playing() {
            thread::sleep(timing.poll_interval);
        }
        thread::sleep(random_duration(&timing.pause_secs));
    }

    log::info!(
        "Audio sequence completed: {} sounds played over {:.1} seconds",
        played.len(),
        started.elapsed().as_secs_f64()
    );
    Ok(played)
}

/// Phase B.
fn servo_phase(actuators: &Actuators, delay: Duration) -> Result<()> {
    log::info!("Waiting {:.1} seconds before servo activation...", delay.as_secs_f64());
    thread::sleep(delay);
    log::info!("Activating servo now!");
    actuators.sweep()
}

fn random_duration(range: &RangeInclusive<f64>) -> Duration {
    let (min, max) = (*range.start(), *range.end());
    let secs = if min < max {
        rand::rng().random_range(min..=max)
    } else {
        min
    };
    Duration::from_secs_f64(secs.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{AudioBackend, SoundClip};
    use crate::hardware::{PinEvent, ServoMotion, SimulatedPins};
    use crate::library::tests::{touch, FakeBackend};
    use std::path::Path;

    fn fast_timing() -> SequenceTiming {
        SequenceTiming {
            target_duration: Duration::from_millis(30),
            delay_secs: 0.01..=0.02,
            pause_secs: 0.001..=0.002,
            poll_interval: Duration::from_millis(1),
        }
    }

    fn fast_motion() -> ServoMotion {
        ServoMotion {
            settle: Duration::ZERO,
            hold: Duration::ZERO,
            step: Duration::ZERO,
            scare_angle: 0.0,
            return_angle: 10.0,
        }
    }

    struct Rig {
        _dir: tempfile::TempDir,
        pins: Arc<SimulatedPins>,
        sequencer: ActionSequencer,
    }

    fn rig_with(backend: Arc<dyn AudioBackend>, files: &[&str], timing: SequenceTiming) -> Rig {
        let dir = tempfile::tempdir().unwrap();
        for name in files {
            touch(dir.path(), name);
        }
        let library = Arc::new(SoundLibrary::new(dir.path(), backend));
        library.load(dir.path());
        let pins = Arc::new(SimulatedPins::new());
        let actuators = Arc::new(Actuators::new(pins.clone(), fast_motion()));
        Rig {
            _dir: dir,
            pins,
            sequencer: ActionSequencer::new(library, actuators, timing),
        }
    }

    fn rig(files: &[&str]) -> Rig {
        rig_with(Arc::new(FakeBackend::with_clip_ms(1)), files, fast_timing())
    }

    #[test]
    fn test_full_sequence() {
        let rig = rig(&["boo.wav", "howl.mp3"]);
        assert!(!rig.sequencer.is_busy());

        let outcome = rig.sequencer.trigger(TriggerSource::Manual);
        let report = match outcome {
            TriggerOutcome::Completed(report) => report,
            TriggerOutcome::Rejected => panic!("first trigger must run"),
        };

        assert!(report.audio_ok);
        assert!(report.servo_ok);
        assert!(!report.sounds_played.is_empty());
        assert!(report.elapsed >= Duration::from_millis(30));
        assert!(report.servo_delay >= Duration::from_millis(10));
        assert!(report.servo_delay <= Duration::from_millis(20));

        assert!(!rig.sequencer.is_busy());
        assert_eq!(rig.pins.indicator_history(), vec![true, false]);
        // Sweep: scare angle, 10 steps, stop
        assert_eq!(rig.pins.duty_history().len(), 12);
    }

    #[test]
    fn test_led_on_before_sweep_and_off_after() {
        let rig = rig(&["boo.wav"]);
        rig.sequencer.trigger(TriggerSource::Button);

        let events = rig.pins.events();
        assert_eq!(events.first(), Some(&PinEvent::Indicator(true)));
        assert_eq!(events.last(), Some(&PinEvent::Indicator(false)));
    }

    #[test]
    fn test_busy_during_run_and_rejects_second_trigger() {
        let timing = SequenceTiming {
            target_duration: Duration::from_millis(150),
            ..fast_timing()
        };
        let rig = rig_with(Arc::new(FakeBackend::with_clip_ms(1)), &["boo.wav"], timing);

        let first = {
            let sequencer = rig.sequencer.clone();
            thread::spawn(move || sequencer.trigger(TriggerSource::Button))
        };

        let deadline = Instant::now() + Duration::from_secs(2);
        while !rig.sequencer.is_busy() {
            assert!(Instant::now() < deadline, "sequence never started");
            thread::yield_now();
        }

        let second = rig.sequencer.trigger(TriggerSource::Http);
        assert!(second.is_rejected());
        assert!(rig.sequencer.try_begin().is_none());
        assert!(rig.sequencer.is_busy());

        assert!(!first.join().unwrap().is_rejected());
        assert!(!rig.sequencer.is_busy());
        assert_eq!(rig.pins.indicator_history(), vec![true, false]);
    }

    #[test]
    fn test_concurrent_triggers_run_once() {
        let rig = rig(&["boo.wav"]);
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sequencer = rig.sequencer.clone();
                thread::spawn(move || sequencer.trigger(TriggerSource::Http))
            })
            .collect();

        let completed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|o| !o.is_rejected())
            .count();
        assert!(completed >= 1);
        // Every completed run switched the LED on exactly once and off exactly once
        let history = rig.pins.indicator_history();
        assert_eq!(history.len(), completed * 2);
        assert!(history.chunks(2).all(|pair| pair == [true, false]));
        assert!(!rig.sequencer.is_busy());
    }

    #[test]
    fn test_empty_library_still_sweeps() {
        let rig = rig(&[]);
        let outcome = rig.sequencer.trigger(TriggerSource::Manual);
        let TriggerOutcome::Completed(report) = outcome else {
            panic!("expected a run");
        };
        assert!(report.sounds_played.is_empty());
        assert!(report.audio_ok);
        assert!(report.servo_ok);
        assert!(report.elapsed < Duration::from_millis(500));
    }

    #[test]
    fn test_led_fault_does_not_block_release() {
        let rig = rig(&["boo.wav"]);
        rig.pins.fail_indicator(true);

        let outcome = rig.sequencer.trigger(TriggerSource::Button);
        assert!(!outcome.is_rejected());
        assert!(!rig.sequencer.is_busy());
        assert!(rig.sequencer.try_begin().is_some());
    }

    #[test]
    fn test_servo_fault_is_contained() {
        let rig = rig(&["boo.wav"]);
        rig.pins.fail_servo_after(0);

        let TriggerOutcome::Completed(report) = rig.sequencer.trigger(TriggerSource::Button) else {
            panic!("expected a run");
        };
        assert!(!report.servo_ok);
        assert!(report.audio_ok);
        assert!(!rig.sequencer.is_busy());
        assert_eq!(rig.pins.indicator_history(), vec![true, false]);
    }

    struct PanickingBackend;

    impl AudioBackend for PanickingBackend {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn decode(&self, _path: &Path) -> Result<SoundClip> {
            Ok(SoundClip::new(1, 1000, vec![0.0; 1]))
        }

        fn play(&self, _clip: &SoundClip) -> Result<()> {
            panic!("speaker on fire");
        }

        fn is_playing(&self) -> bool {
            false
        }

        fn stop_all(&self) {}
    }

    #[test]
    fn test_audio_panic_is_contained() {
        let rig = rig_with(Arc::new(PanickingBackend), &["boo.wav"], fast_timing());

        let TriggerOutcome::Completed(report) = rig.sequencer.trigger(TriggerSource::Manual) else {
            panic!("expected a run");
        };
        assert!(!report.audio_ok);
        assert!(report.servo_ok);
        assert!(!rig.sequencer.is_busy());
        assert_eq!(rig.pins.indicator_history(), vec![true, false]);
    }

    #[test]
    fn test_dropped_claim_releases() {
        let rig = rig(&["boo.wav"]);
        let claim = rig.sequencer.try_begin().expect("idle sequencer");
        assert!(rig.sequencer.is_busy());
        drop(claim);
        assert!(!rig.sequencer.is_busy());
    }

    #[test]
    fn test_claim_can_run_on_another_thread() {
        let rig = rig(&["boo.wav"]);
        let claim = rig.sequencer.try_begin().unwrap();
        let report = thread::spawn(move || claim.run(TriggerSource::Http))
            .join()
            .unwrap();
        assert_eq!(report.source, TriggerSource::Http);
        assert!(!rig.sequencer.is_busy());
    }

    #[test]
    fn test_random_duration_bounds() {
        for _ in 0..100 {
            let d = random_duration(&(0.5..=2.0));
            assert!(d >= Duration::from_millis(500) && d <= Duration::from_secs(2));
        }
        assert_eq!(random_duration(&(3.0..=3.0)), Duration::from_secs(3));
    }

    #[test]
    fn test_timing_from_config() {
        let timing = SequenceTiming::from_config(&Config::default());
        assert_eq!(timing.target_duration, Duration::from_secs(60));
        assert_eq!(timing.delay_secs, 10.0..=20.0);
        assert_eq!(timing.pause_secs, 0.5..=2.0);
        assert_eq!(timing.delay_span(), "10-20");
        assert_eq!(timing.delay_label(), "10-20 seconds");
    }
}
