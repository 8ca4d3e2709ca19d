//! Headless audio backend.

use super::{AudioBackend, SoundClip};
use crate::error::{Error, Result};
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;

/// Backend without an output device.
///
/// WAV files are decoded with hound so clip lengths are real; playing a clip
/// keeps the backend busy for that long.
#[derive(Debug, Default)]
pub struct NullBackend {
    busy_until: Mutex<Option<Instant>>,
}

impl NullBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioBackend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn decode(&self, path: &Path) -> Result<SoundClip> {
        let is_wav = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("wav"));
        if !is_wav {
            return Err(Error::decode(
                path,
                "only WAV files can be decoded without the `audio` feature",
            ));
        }
        decode_wav(path)
    }

    fn play(&self, clip: &SoundClip) -> Result<()> {
        let mut busy = self.busy_until.lock().expect("null backend lock poisoned");
        *busy = Some(Instant::now() + clip.duration());
        log::debug!("null backend: simulating {:?} of playback", clip.duration());
        Ok(())
    }

    fn is_playing(&self) -> bool {
        let busy = self.busy_until.lock().expect("null backend lock poisoned");
        busy.is_some_and(|until| Instant::now() < until)
    }

    fn stop_all(&self) {
        *self.busy_until.lock().expect("null backend lock poisoned") = None;
    }
}

/// Decode a WAV file into interleaved `f32` samples.
pub fn decode_wav(path: &Path) -> Result<SoundClip> {
    let mut reader = hound::WavReader::open(path).map_err(|e| Error::decode(path, e))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::decode(path, e))?,
        hound::SampleFormat::Int => {
            let scale = (1_i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::decode(path, e))?
        }
    };

    if samples.is_empty() {
        return Err(Error::decode(path, "file contains no audio data"));
    }

    Ok(SoundClip::new(spec.channels, spec.sample_rate, samples))
}
