//! Rodio-based audio backend.
//!
//! Audio runs on a dedicated thread since rodio's `OutputStream` is not
//! `Send`. The backend talks to it over a command channel.

use super::{AudioBackend, SoundClip};
use crate::error::{Error, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use rodio::buffer::SamplesBuffer;
use rodio::{Decoder, OutputStream, Sink, Source};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

/// Commands sent to the audio thread
enum AudioCommand {
    /// Append a clip to a fresh sink
    Play(SoundClip, Sender<Result<()>>),
    /// Report whether any sink still has queued audio
    IsPlaying(Sender<bool>),
    /// Stop every sink
    StopAll,
    /// Stop everything and exit the thread
    Shutdown,
}

/// Plays clips through the default output device.
pub struct RodioBackend {
    tx: Sender<AudioCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl RodioBackend {
    /// Spawn the audio thread and open the default output device.
    pub fn start() -> Result<Self> {
        let (tx, rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);

        let thread = thread::Builder::new()
            .name("trickster-audio".to_string())
            .spawn(move || audio_thread_main(rx, ready_tx))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!("Audio output opened");
                Ok(Self {
                    tx,
                    thread: Mutex::new(Some(thread)),
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::Audio("audio thread exited during startup".to_string()))
            }
        }
    }

    fn send(&self, cmd: AudioCommand) -> Result<()> {
        self.tx
            .send(cmd)
            .map_err(|_| Error::Audio("audio thread is not running".to_string()))
    }
}

impl AudioBackend for RodioBackend {
    fn name(&self) -> &'static str {
        "rodio"
    }

    fn decode(&self, path: &Path) -> Result<SoundClip> {
        let file = File::open(path)?;
        let decoder = Decoder::new(BufReader::new(file)).map_err(|e| Error::decode(path, e))?;
        let channels = decoder.channels();
        let sample_rate = decoder.sample_rate();
        let samples: Vec<f32> = decoder.convert_samples::<f32>().collect();

        if samples.is_empty() {
            return Err(Error::decode(path, "file contains no audio data"));
        }
        Ok(SoundClip::new(channels, sample_rate, samples))
    }

    fn play(&self, clip: &SoundClip) -> Result<()> {
        let (reply_tx, reply_rx) = bounded(1);
        self.send(AudioCommand::Play(clip.clone(), reply_tx))?;
        reply_rx
            .recv()
            .map_err(|_| Error::Audio("audio thread did not answer".to_string()))?
    }

    fn is_playing(&self) -> bool {
        let (reply_tx, reply_rx) = bounded(1);
        if self.send(AudioCommand::IsPlaying(reply_tx)).is_err() {
            return false;
        }
        reply_rx.recv().unwrap_or(false)
    }

    fn stop_all(&self) {
        let _ = self.send(AudioCommand::StopAll);
    }

    fn shutdown(&self) {
        let handle = self
            .thread
            .lock()
            .expect("audio thread handle lock poisoned")
            .take();
        if let Some(handle) = handle {
            let _ = self.send(AudioCommand::Shutdown);
            let _ = handle.join();
            log::info!("Audio output closed");
        }
    }
}

impl Drop for RodioBackend {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Audio thread main function
fn audio_thread_main(rx: Receiver<AudioCommand>, ready: Sender<Result<()>>) {
    let (_stream, stream_handle) = match OutputStream::try_default() {
        Ok(s) => s,
        Err(e) => {
            let _ = ready.send(Err(Error::Audio(format!("failed to open output: {}", e))));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let mut sinks: Vec<Sink> = Vec::new();

    while let Ok(cmd) = rx.recv() {
        sinks.retain(|sink| !sink.empty());
        match cmd {
            AudioCommand::Play(clip, reply) => {
                let result = Sink::try_new(&stream_handle)
                    .map(|sink| {
                        sink.append(SamplesBuffer::new(
                            clip.channels(),
                            clip.sample_rate(),
                            clip.samples().to_vec(),
                        ));
                        sinks.push(sink);
                    })
                    .map_err(|e| Error::Audio(format!("failed to create sink: {}", e)));
                let _ = reply.send(result);
            }
            AudioCommand::IsPlaying(reply) => {
                let _ = reply.send(!sinks.is_empty());
            }
            AudioCommand::StopAll => {
                for sink in sinks.drain(..) {
                    sink.stop();
                }
            }
            AudioCommand::Shutdown => {
                for sink in sinks.drain(..) {
                    sink.stop();
                }
                break;
            }
        }
    }

    log::debug!("Audio thread exited");
}
