//! Configuration file support for trickster
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/trickster/config.toml`
//! - macOS: `~/Library/Application Support/trickster/config.toml`
//! - Windows: `%APPDATA%\trickster\config.toml`
//!
//! Values are layered: built-in defaults, then the config file, then
//! `TRICKSTER_*` environment variables, then command line flags.

use crate::error::{Error, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding `audio.folder`
pub const ENV_AUDIO_FOLDER: &str = "TRICKSTER_AUDIO_FOLDER";
/// Environment variable overriding `api.host`
pub const ENV_API_HOST: &str = "TRICKSTER_API_HOST";
/// Environment variable overriding `api.port`
pub const ENV_API_PORT: &str = "TRICKSTER_API_PORT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// GPIO pin assignments
    pub pins: PinSettings,
    /// Sound library and playback settings
    pub audio: AudioSettings,
    /// Delay before the servo fires
    pub timing: TimingSettings,
    /// Servo PWM and sweep choreography
    pub servo: ServoSettings,
    /// Button input settings
    pub button: ButtonSettings,
    /// HTTP API settings
    pub api: ApiSettings,
}

impl Config {
    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the default config file location
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            Err(Error::Config(format!("Config file not found at {:?}", path)))
        }
    }

    /// Load configuration, falling back to defaults.
    ///
    /// An explicit path must exist. Without one, a missing default file is
    /// not an error.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            log::info!("Loading config from {}", path.display());
            return Self::load_from(path);
        }
        match Self::config_path() {
            Ok(path) if path.exists() => {
                log::info!("Loading config from {}", path.display());
                Self::load_from(&path)
            }
            _ => {
                log::info!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save configuration to the given path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "trickster") {
            Ok(proj_dirs.config_dir().join("config.toml"))
        } else {
            Err(Error::Config("Could not determine config directory".to_string()))
        }
    }

    /// Write a default config file with comments
    pub fn create_default_config_file(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, DEFAULT_CONFIG_TOML)?;
        Ok(())
    }

    /// Apply `TRICKSTER_*` overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_vars(std::env::vars())
    }

    /// Apply `TRICKSTER_*` overrides from an arbitrary set of variables.
    pub fn apply_env_vars<I>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            match key.as_str() {
                ENV_AUDIO_FOLDER => self.audio.folder = PathBuf::from(value),
                ENV_API_HOST => self.api.host = value,
                ENV_API_PORT => {
                    self.api.port = value.trim().parse().map_err(|_| {
                        Error::Config(format!("{} is not a valid port: {:?}", ENV_API_PORT, value))
                    })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check the configuration for values the hardware or sequencer cannot use.
    pub fn validate(&self) -> Result<()> {
        let pins = &self.pins;
        if pins.button == pins.servo || pins.button == pins.led || pins.servo == pins.led {
            return Err(Error::Config(format!(
                "GPIO pins must be distinct (button={}, servo={}, led={})",
                pins.button, pins.servo, pins.led
            )));
        }

        check_range("audio.min_pause_secs", self.audio.min_pause_secs, self.audio.max_pause_secs)?;
        check_range("timing.min_delay_secs", self.timing.min_delay_secs, self.timing.max_delay_secs)?;
        check_seconds("audio.target_duration_secs", self.audio.target_duration_secs)?;

        let frequency = self.servo.pwm_frequency_hz;
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(Error::Config("servo.pwm_frequency_hz must be positive".to_string()));
        }
        for (name, angle) in [
            ("servo.scare_angle", self.servo.scare_angle),
            ("servo.return_angle", self.servo.return_angle),
        ] {
            if !(0.0..=180.0).contains(&angle) {
                return Err(Error::Config(format!("{} must be within 0-180 degrees", name)));
            }
        }
        Ok(())
    }

    /// Minimum total length of the audio phase
    pub fn target_duration(&self) -> Duration {
        Duration::from_secs_f64(self.audio.target_duration_secs)
    }

    /// Range the servo delay is drawn from, in seconds
    pub fn delay_range(&self) -> RangeInclusive<f64> {
        self.timing.min_delay_secs..=self.timing.max_delay_secs
    }

    /// Range the pause between sounds is drawn from, in seconds
    pub fn pause_range(&self) -> RangeInclusive<f64> {
        self.audio.min_pause_secs..=self.audio.max_pause_secs
    }

    /// Address the HTTP server binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

/// Seconds must fit in a `Duration`; negative, NaN and overflowing values fail.
fn check_seconds(name: &str, secs: f64) -> Result<()> {
    Duration::try_from_secs_f64(secs)
        .map(|_| ())
        .map_err(|_| Error::Config(format!("{} must be a non-negative number of seconds", name)))
}

fn check_range(name: &str, min: f64, max: f64) -> Result<()> {
    check_seconds(name, min)?;
    check_seconds(name, max)?;
    if min > max {
        return Err(Error::Config(format!(
            "{} ({}) must not exceed its maximum ({})",
            name, min, max
        )));
    }
    Ok(())
}

/// GPIO pin assignments (BCM numbering)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinSettings {
    /// Push button, wired to ground (internal pull-up)
    pub button: u8,
    /// Servo signal line
    pub servo: u8,
    /// Status LED
    pub led: u8,
}

impl Default for PinSettings {
    fn default() -> Self {
        Self {
            button: 17,
            servo: 12,
            led: 16,
        }
    }
}

/// Audio settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Folder scanned for `.wav` and `.mp3` files
    pub folder: PathBuf,
    /// Minimum total duration of the audio phase, in seconds
    pub target_duration_secs: f64,
    /// Minimum pause between two sounds, in seconds
    pub min_pause_secs: f64,
    /// Maximum pause between two sounds, in seconds
    pub max_pause_secs: f64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            folder: PathBuf::from("/mnt/samba/"),
            target_duration_secs: 60.0,
            min_pause_secs: 0.5,
            max_pause_secs: 2.0,
        }
    }
}

/// Timing of the delayed servo phase
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    /// Minimum delay before the servo fires, in seconds
    pub min_delay_secs: f64,
    /// Maximum delay before the servo fires, in seconds
    pub max_delay_secs: f64,
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            min_delay_secs: 10.0,
            max_delay_secs: 20.0,
        }
    }
}

/// Servo settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoSettings {
    /// PWM frequency in Hz
    pub pwm_frequency_hz: f64,
    /// How long a single positioning call holds the signal, in milliseconds
    pub settle_ms: u64,
    /// Pause at the scare angle during a sweep, in milliseconds
    pub sweep_hold_ms: u64,
    /// Time per degree on the way back, in milliseconds
    pub sweep_step_ms: u64,
    /// Angle the sweep jumps to first
    pub scare_angle: f64,
    /// Angle the sweep returns to
    pub return_angle: f64,
}

impl Default for ServoSettings {
    fn default() -> Self {
        Self {
            pwm_frequency_hz: 50.0,
            settle_ms: 500,
            sweep_hold_ms: 500,
            sweep_step_ms: 10,
            scare_angle: 0.0,
            return_angle: 160.0,
        }
    }
}

/// Button settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonSettings {
    /// Debounce window for the falling edge, in milliseconds
    pub debounce_ms: u64,
}

impl Default for ButtonSettings {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

/// HTTP API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSettings {
    /// Bind host
    pub host: String,
    /// Bind port
    pub port: u16,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

const DEFAULT_CONFIG_TOML: &str = r#"# trickster configuration file

[pins]
# BCM pin numbers, must all be different
button = 17
servo = 12
led = 16

[audio]
# Folder with .wav / .mp3 files (not searched recursively)
folder = "/mnt/samba/"

# The audio phase keeps picking sounds until this many seconds have passed
target_duration_secs = 60.0

# Random pause between two sounds
min_pause_secs = 0.5
max_pause_secs = 2.0

[timing]
# Random delay before the servo fires
min_delay_secs = 10.0
max_delay_secs = 20.0

[servo]
pwm_frequency_hz = 50.0
settle_ms = 500
sweep_hold_ms = 500
sweep_step_ms = 10
scare_angle = 0.0
return_angle = 160.0

[button]
debounce_ms = 300

[api]
host = "0.0.0.0"
port = 5000
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pins.button, 17);
        assert_eq!(config.pins.servo, 12);
        assert_eq!(config.pins.led, 16);
        assert_eq!(config.api.port, 5000);
        assert!((config.servo.pwm_frequency_hz - 50.0).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_file_matches_defaults() {
        let parsed: Config = toml::from_str(DEFAULT_CONFIG_TOML).unwrap();
        let defaults = Config::default();
        assert_eq!(parsed.pins.button, defaults.pins.button);
        assert_eq!(parsed.audio.folder, defaults.audio.folder);
        assert_eq!(parsed.timing.max_delay_secs, defaults.timing.max_delay_secs);
        assert_eq!(parsed.servo.return_angle, defaults.servo.return_angle);
        assert_eq!(parsed.api.host, defaults.api.host);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: Config = toml::from_str("[api]\nport = 8080\n").unwrap();
        assert_eq!(parsed.api.port, 8080);
        assert_eq!(parsed.api.host, "0.0.0.0");
        assert_eq!(parsed.pins.servo, 12);
    }

    #[test]
    fn test_duplicate_pins_rejected() {
        let mut config = Config::default();
        config.pins.led = config.pins.button;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("distinct"));
    }

    #[test]
    fn test_inverted_ranges_rejected() {
        let mut config = Config::default();
        config.timing.min_delay_secs = 30.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio.min_pause_secs = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unrepresentable_durations_rejected() {
        let mut config = Config::default();
        config.audio.target_duration_secs = 1e20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("audio.target_duration_secs"));

        let mut config = Config::default();
        config.timing.max_delay_secs = 1e30;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio.max_pause_secs = f64::INFINITY;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.audio.target_duration_secs = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_servo_values_rejected() {
        let mut config = Config::default();
        config.servo.pwm_frequency_hz = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.servo.return_angle = 200.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env_vars(vec![
                (ENV_AUDIO_FOLDER.to_string(), "/tmp/spooky".to_string()),
                (ENV_API_PORT.to_string(), "8081".to_string()),
                ("UNRELATED".to_string(), "x".to_string()),
            ])
            .unwrap();
        assert_eq!(config.audio.folder, PathBuf::from("/tmp/spooky"));
        assert_eq!(config.api.port, 8081);
        assert_eq!(config.api.host, "0.0.0.0");
    }

    #[test]
    fn test_env_bad_port() {
        let mut config = Config::default();
        let result = config.apply_env_vars(vec![(ENV_API_PORT.to_string(), "nope".to_string())]);
        assert!(result.is_err());
    }

    #[test]
    fn test_bind_address() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "0.0.0.0:5000");
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.audio.folder = PathBuf::from("/srv/sounds");
        config.save(&path).unwrap();

        let loaded = Config::load_or_default(Some(&path)).unwrap();
        assert_eq!(loaded.audio.folder, PathBuf::from("/srv/sounds"));
    }

    #[test]
    fn test_explicit_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(Config::load_or_default(Some(&missing)).is_err());
    }
}
