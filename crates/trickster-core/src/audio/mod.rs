//! Audio decoding and playback backends.
//!
//! The sound library only talks to the [`AudioBackend`] trait. Two
//! implementations exist:
//!
//! - [`RodioBackend`] (feature `audio`) plays through the default output
//!   device on a dedicated audio thread.
//! - [`NullBackend`] decodes WAV files with hound and simulates playback by
//!   staying busy for the length of the clip. It is used on machines without
//!   a sound card and in tests.

mod null;
#[cfg(feature = "audio")]
mod rodio_backend;

pub use null::{decode_wav, NullBackend};
#[cfg(feature = "audio")]
pub use rodio_backend::RodioBackend;

use crate::error::Result;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// A decoded, ready-to-play audio buffer.
///
/// Samples are interleaved `f32` in `-1.0..=1.0`. Cloning is cheap.
#[derive(Clone)]
pub struct SoundClip {
    channels: u16,
    sample_rate: u32,
    samples: Arc<[f32]>,
}

impl SoundClip {
    /// Wrap decoded samples.
    pub fn new(channels: u16, sample_rate: u32, samples: Vec<f32>) -> Self {
        Self {
            channels: channels.max(1),
            sample_rate: sample_rate.max(1),
            samples: samples.into(),
        }
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Playback length of the clip.
    pub fn duration(&self) -> Duration {
        let frames = self.samples.len() as f64 / f64::from(self.channels);
        Duration::from_secs_f64(frames / f64::from(self.sample_rate))
    }
}

impl fmt::Debug for SoundClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundClip")
            .field("channels", &self.channels)
            .field("sample_rate", &self.sample_rate)
            .field("frames", &(self.samples.len() / usize::from(self.channels)))
            .finish()
    }
}

/// Decode/playback engine used by the sound library.
pub trait AudioBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Decode a file into memory.
    fn decode(&self, path: &Path) -> Result<SoundClip>;

    /// Start playing a clip and return immediately.
    fn play(&self, clip: &SoundClip) -> Result<()>;

    /// Whether anything is still playing.
    fn is_playing(&self) -> bool;

    /// Stop everything that is playing.
    fn stop_all(&self);

    /// Release the output device. Safe to call more than once.
    fn shutdown(&self) {}
}

/// Open the best available backend.
///
/// With the `audio` feature the default output device is tried first. If it
/// cannot be opened (or `prefer_null` is set) the [`NullBackend`] is used.
pub fn open_backend(prefer_null: bool) -> Arc<dyn AudioBackend> {
    if prefer_null {
        log::info!("Audio output disabled, using null backend");
        return Arc::new(NullBackend::new());
    }

    #[cfg(feature = "audio")]
    {
        match RodioBackend::start() {
            Ok(backend) => return Arc::new(backend),
            Err(e) => log::error!("Failed to open audio output: {} (falling back to null backend)", e),
        }
    }

    #[cfg(not(feature = "audio"))]
    log::warn!("Built without the `audio` feature, sounds will not be audible");

    Arc::new(NullBackend::new())
}

/// Whether a file name looks like a playable sound (`.wav` / `.mp3`, any case).
pub fn is_audio_file(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".wav") || lower.ends_with(".mp3")
}
