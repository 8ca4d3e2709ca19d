//! Trickster Core - Sound library, servo/LED actuators and the scare sequencer.
//!
//! This crate provides everything below the HTTP surface:
//!
//! - **Config** - TOML configuration with environment overrides
//! - **Audio** - Decoding and playback backends (rodio or headless)
//! - **Library** - Preloaded sounds with atomic reload and random picks
//! - **Hardware** - Servo, status LED and button (rppal or simulated)
//! - **Sequencer** - The busy-gated, two-phase scare sequence
//! - **Controller** - Wires it all together and arms the button
//!
//! # Architecture
//!
//! A trigger (button or HTTP) claims the [`ActionSequencer`]. While it runs,
//! phase A plays random sounds and phase B sweeps the servo after a random
//! delay. Triggers arriving in the meantime are rejected. Nothing is global:
//! the [`Controller`] owns the pieces and hands out `Arc`s.
//!
//! # Feature Flags
//!
//! - `audio` - Real audio output through rodio (needs ALSA on Linux)
//! - `gpio` - Real GPIO/PWM through rppal (Raspberry Pi only)
//! - `native` - Both of the above

pub mod audio;
pub mod config;
pub mod controller;
pub mod error;
pub mod hardware;
pub mod library;
pub mod sequencer;

pub use audio::{open_backend, AudioBackend, NullBackend, SoundClip};
pub use config::Config;
pub use controller::Controller;
pub use error::{Error, Result};
pub use hardware::{open_driver, Actuators, PinDriver, SimulatedPins};
pub use library::{LibraryInfo, PlayOutcome, SoundAsset, SoundLibrary};
pub use sequencer::{
    ActionSequencer, SequenceReport, SequenceRun, SequenceTiming, TriggerOutcome, TriggerSource,
};
