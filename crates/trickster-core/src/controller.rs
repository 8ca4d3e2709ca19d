//! Wires the library, the actuators and the sequencer together.

use crate::audio::AudioBackend;
use crate::config::Config;
use crate::error::Result;
use crate::hardware::{Actuators, PinDriver, ServoMotion};
use crate::library::SoundLibrary;
use crate::sequencer::{ActionSequencer, SequenceTiming, TriggerSource};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// A running trickster: sounds loaded, button armed.
pub struct Controller {
    config: Config,
    library: Arc<SoundLibrary>,
    actuators: Arc<Actuators>,
    sequencer: ActionSequencer,
    stopped: AtomicBool,
}

impl Controller {
    /// Load the sound library and arm the button.
    ///
    /// A button press while a sequence is running is logged and ignored. If
    /// the button cannot be armed the controller still starts, so HTTP
    /// triggers keep working.
    pub fn start(
        config: Config,
        audio: Arc<dyn AudioBackend>,
        pins: Arc<dyn PinDriver>,
    ) -> Result<Self> {
        config.validate()?;

        let folder = config.audio.folder.clone();
        let library = Arc::new(SoundLibrary::new(&folder, audio));
        log::info!("Loading audio files from {}", folder.display());
        library.load(&folder);

        let actuators = Arc::new(Actuators::new(
            pins,
            ServoMotion::from_settings(&config.servo),
        ));
        let sequencer = ActionSequencer::new(
            library.clone(),
            actuators.clone(),
            SequenceTiming::from_config(&config),
        );

        let on_press = sequencer.clone();
        let armed = actuators.subscribe_button(Arc::new(move || on_button_press(&on_press)));
        if let Err(e) = armed {
            log::error!("Button disabled: {}", e);
        }

        log::info!(
            "Controller ready: {} sounds, audio={}, gpio={}",
            library.len(),
            library.backend_name(),
            actuators.driver_name()
        );

        Ok(Self {
            config,
            library,
            actuators,
            sequencer,
            stopped: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn library(&self) -> &Arc<SoundLibrary> {
        &self.library
    }

    pub fn sequencer(&self) -> &ActionSequencer {
        &self.sequencer
    }

    pub fn actuators(&self) -> &Arc<Actuators> {
        &self.actuators
    }

    /// The servo delay range as shown to API clients.
    pub fn delay_range_label(&self) -> String {
        self.sequencer.timing().delay_label()
    }

    /// Release the pins and the audio device. Only the first call does
    /// anything.
    pub fn shutdown(&self) {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        log::info!("Cleaning up...");
        if self.sequencer.is_busy() {
            log::warn!("Shutting down while a sequence is still running");
        }
        if let Err(e) = self.actuators.release() {
            log::error!("Failed to release GPIO: {}", e);
        }
        self.library.shutdown();
        log::info!("Cleanup completed");
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn on_button_press(sequencer: &ActionSequencer) {
    log::info!("Button pressed!");
    let Some(run) = sequencer.try_begin() else {
        log::info!("Button press ignored - action already in progress");
        return;
    };

    let spawned = thread::Builder::new()
        .name("trickster-button".to_string())
        .spawn(move || {
            run.run(TriggerSource::Button);
        });
    // The closure (and the claim inside it) is dropped on failure, which
    // releases the sequencer again.
    if let Err(e) = spawned {
        log::error!("Failed to start sequence thread: {}", e);
    }
}
