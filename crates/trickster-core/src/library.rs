//! The sound library.
//!
//! [`SoundLibrary`] scans a folder for `.wav`/`.mp3` files, decodes them
//! up front and hands out random picks. The decoded list is published as an
//! `Arc<Vec<SoundAsset>>`: a reload builds a complete new list and swaps it
//! in under a short write lock, so readers always see either the old or the
//! new list, never a mix.

use crate::audio::{is_audio_file, AudioBackend, SoundClip};
use crate::error::Result;
use rand::Rng;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// A preloaded sound and the file it came from.
#[derive(Debug, Clone)]
pub struct SoundAsset {
    pub filename: String,
    pub clip: SoundClip,
}

/// Snapshot of the library for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryInfo {
    pub total_sounds: usize,
    pub sounds: Vec<String>,
    pub audio_folder: String,
}

/// Result of [`SoundLibrary::play_random`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// A sound was handed to the backend.
    Played { filename: String, total_sounds: usize },
    /// Nothing is loaded.
    Empty,
}

struct LibraryState {
    directory: PathBuf,
    assets: Arc<Vec<SoundAsset>>,
}

/// Decoded sounds from one folder.
pub struct SoundLibrary {
    backend: Arc<dyn AudioBackend>,
    state: RwLock<LibraryState>,
}

impl SoundLibrary {
    /// Create an empty library bound to `directory`. Nothing is loaded yet.
    pub fn new(directory: impl Into<PathBuf>, backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            backend,
            state: RwLock::new(LibraryState {
                directory: directory.into(),
                assets: Arc::new(Vec::new()),
            }),
        }
    }

    /// Scan `directory` and replace the current sounds with what it holds.
    ///
    /// Files that fail to decode are logged and skipped. A missing folder
    /// leaves the library empty. Returns the number of loaded sounds.
    pub fn load(&self, directory: &Path) -> usize {
        let assets = self.scan(directory);
        let count = assets.len();

        let mut state = self.state.write().expect("sound library lock poisoned");
        state.directory = directory.to_path_buf();
        state.assets = Arc::new(assets);
        count
    }

    /// Load the current folder again.
    pub fn reload(&self) -> usize {
        let directory = self.directory();
        self.load(&directory)
    }

    fn scan(&self, directory: &Path) -> Vec<SoundAsset> {
        let mut assets = Vec::new();

        if !directory.exists() {
            log::warn!("Audio folder '{}' does not exist", directory.display());
            return assets;
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                log::error!("Error reading audio folder '{}': {}", directory.display(), e);
                return assets;
            }
        };

        for entry in entries.flatten() {
            let filename = entry.file_name().to_string_lossy().into_owned();
            if !is_audio_file(&filename) {
                continue;
            }
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            match self.backend.decode(&path) {
                Ok(clip) => {
                    log::info!("  Preloaded: {} ({:.1}s)", filename, clip.duration().as_secs_f64());
                    assets.push(SoundAsset { filename, clip });
                }
                Err(e) => log::warn!("  Failed to load {}: {}", filename, e),
            }
        }

        if assets.is_empty() {
            log::warn!("No valid .wav or .mp3 files found in '{}'", directory.display());
        } else {
            log::info!(
                "Successfully preloaded {} audio files from {}",
                assets.len(),
                directory.display()
            );
        }
        assets
    }

    /// The current sound list. Cheap: clones an `Arc`.
    pub fn assets(&self) -> Arc<Vec<SoundAsset>> {
        self.state
            .read()
            .expect("sound library lock poisoned")
            .assets
            .clone()
    }

    /// Folder the library loads from.
    pub fn directory(&self) -> PathBuf {
        self.state
            .read()
            .expect("sound library lock poisoned")
            .directory
            .clone()
    }

    pub fn len(&self) -> usize {
        self.assets().len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets().is_empty()
    }

    /// Pick one sound uniformly at random.
    pub fn pick_random(&self) -> Option<SoundAsset> {
        let assets = self.assets();
        if assets.is_empty() {
            return None;
        }
        let index = rand::rng().random_range(0..assets.len());
        Some(assets[index].clone())
    }

    /// Read-only snapshot of the library.
    pub fn info(&self) -> LibraryInfo {
        let state = self.state.read().expect("sound library lock poisoned");
        LibraryInfo {
            total_sounds: state.assets.len(),
            sounds: state.assets.iter().map(|a| a.filename.clone()).collect(),
            audio_folder: state.directory.display().to_string(),
        }
    }

    /// Start playing one sound.
    pub fn play(&self, asset: &SoundAsset) -> Result<()> {
        log::info!("Playing: {}", asset.filename);
        self.backend.play(&asset.clip)
    }

    /// Pick a random sound and start playing it.
    pub fn play_random(&self) -> Result<PlayOutcome> {
        let assets = self.assets();
        if assets.is_empty() {
            return Ok(PlayOutcome::Empty);
        }
        let index = rand::rng().random_range(0..assets.len());
        let asset = &assets[index];
        self.play(asset)?;
        Ok(PlayOutcome::Played {
            filename: asset.filename.clone(),
            total_sounds: assets.len(),
        })
    }

    /// Whether the backend is still playing something.
    pub fn is_playing(&self) -> bool {
        self.backend.is_playing()
    }

    /// Name of the audio backend in use.
    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Release the audio backend.
    pub fn shutdown(&self) {
        self.backend.stop_all();
        self.backend.shutdown();
    }
}
