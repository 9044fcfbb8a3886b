//! Configuration for the voice pipeline
//!
//! Defaults are tuned for conversational speech (16 kHz mono capture, 5 s
//! silence timeout, 3 s transcription segments). A TOML file at
//! `~/.config/vocalink/config.toml` is a partial overlay on top of the
//! defaults; API keys come from the environment and override the file.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::{Error, Result};

/// Voice pipeline configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Capture/VAD settings for `listen()`
    pub listen: ListenConfig,

    /// Speech-to-text engine settings
    pub stt: SttConfig,

    /// Text-to-speech engine settings
    pub tts: TtsConfig,

    /// Queue and temp-file settings shared by the speak pipeline
    pub pipeline: PipelineConfig,
}

/// Capture and voice-activity-detection settings
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Fixed RMS amplitude threshold for the speech/silence decision
    pub vad_threshold: f32,

    /// Continuous silence after speech that ends the session
    pub silence_timeout: Duration,

    /// Target length of each transcription segment
    pub segment_duration: Duration,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            vad_threshold: 0.005,
            silence_timeout: Duration::from_secs(5),
            segment_duration: Duration::from_secs(3),
        }
    }
}

/// Speech-to-text engine settings
///
/// Decode options (language hint, temperature, timestamp suppression) are
/// fixed per recognizer instance, not negotiated per call.
#[derive(Debug, Clone)]
pub struct SttConfig {
    /// Provider backend ("whisper" or "deepgram")
    pub provider: String,

    /// Model identifier (e.g. "whisper-1", "nova-2")
    pub model: String,

    /// Language hint passed to the engine (e.g. "en", "zh")
    pub language: Option<String>,

    /// API key (from `OPENAI_API_KEY` or `DEEPGRAM_API_KEY`)
    pub api_key: String,
}

impl Default for SttConfig {
    fn default() -> Self {
        Self {
            provider: "whisper".to_string(),
            model: "whisper-1".to_string(),
            language: None,
            api_key: String::new(),
        }
    }
}

/// Text-to-speech engine settings
#[derive(Debug, Clone)]
pub struct TtsConfig {
    /// Provider backend ("openai" or "elevenlabs")
    pub provider: String,

    /// Model identifier (e.g. "tts-1", "eleven_monolingual_v1")
    pub model: String,

    /// Voice identifier (e.g. "alloy", or an ElevenLabs voice id)
    pub voice: String,

    /// Speed multiplier (0.25 to 4.0, OpenAI only)
    pub speed: f32,

    /// API key (from `OPENAI_API_KEY` or `ELEVENLABS_API_KEY`)
    pub api_key: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            speed: 1.0,
            api_key: String::new(),
        }
    }
}

/// Queue and temp-file settings for the speak pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Bounded capacity of the sentence and clip queues
    pub queue_capacity: usize,

    /// Directory for synthesized clip files. Shared across sessions;
    /// filename uniqueness is the only isolation mechanism.
    pub temp_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 32,
            temp_dir: std::env::temp_dir().join("vocalink"),
        }
    }
}

impl Config {
    /// Load configuration: defaults, overlaid by the config file if present,
    /// overlaid by environment API keys.
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed, or if a
    /// value fails validation.
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        if let Some(path) = config_file_path() {
            if path.exists() {
                let raw = std::fs::read_to_string(&path)?;
                let file: ConfigFile = toml::from_str(&raw)?;
                config.apply_file(file);
                tracing::debug!(path = %path.display(), "loaded config file");
            }
        }

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from a parsed config file
    fn apply_file(&mut self, file: ConfigFile) {
        if let Some(v) = file.listen.vad_threshold {
            self.listen.vad_threshold = v;
        }
        if let Some(secs) = file.listen.silence_timeout_secs {
            if secs.is_finite() && secs > 0.0 {
                self.listen.silence_timeout = Duration::from_secs_f64(secs);
            }
        }
        if let Some(secs) = file.listen.segment_secs {
            if secs.is_finite() && secs > 0.0 {
                self.listen.segment_duration = Duration::from_secs_f64(secs);
            }
        }

        if let Some(v) = file.stt.provider {
            self.stt.provider = v;
        }
        if let Some(v) = file.stt.model {
            self.stt.model = v;
        }
        if let Some(v) = file.stt.language {
            self.stt.language = Some(v);
        }

        if let Some(v) = file.tts.provider {
            self.tts.provider = v;
        }
        if let Some(v) = file.tts.model {
            self.tts.model = v;
        }
        if let Some(v) = file.tts.voice {
            self.tts.voice = v;
        }
        if let Some(v) = file.tts.speed {
            self.tts.speed = v;
        }

        if let Some(v) = file.pipeline.queue_capacity {
            self.pipeline.queue_capacity = v;
        }
        if let Some(v) = file.pipeline.temp_dir {
            self.pipeline.temp_dir = v;
        }

        if let Some(v) = file.api_keys.openai {
            if self.stt.provider == "whisper" {
                self.stt.api_key.clone_from(&v);
            }
            if self.tts.provider == "openai" {
                self.tts.api_key = v;
            }
        }
        if let Some(v) = file.api_keys.deepgram {
            if self.stt.provider == "deepgram" {
                self.stt.api_key = v;
            }
        }
        if let Some(v) = file.api_keys.elevenlabs {
            if self.tts.provider == "elevenlabs" {
                self.tts.api_key = v;
            }
        }
    }

    /// Overlay API keys from the environment
    fn apply_env(&mut self) {
        let openai = std::env::var("OPENAI_API_KEY").ok();
        if let Some(key) = openai {
            if self.stt.provider == "whisper" {
                self.stt.api_key.clone_from(&key);
            }
            if self.tts.provider == "openai" {
                self.tts.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("DEEPGRAM_API_KEY") {
            if self.stt.provider == "deepgram" {
                self.stt.api_key = key;
            }
        }
        if let Ok(key) = std::env::var("ELEVENLABS_API_KEY") {
            if self.tts.provider == "elevenlabs" {
                self.tts.api_key = key;
            }
        }
    }

    /// Validate ranges
    fn validate(&self) -> Result<()> {
        if self.listen.vad_threshold <= 0.0 {
            return Err(Error::Config(
                "listen.vad_threshold must be positive".to_string(),
            ));
        }
        if self.listen.silence_timeout.is_zero() {
            return Err(Error::Config(
                "listen.silence_timeout must be positive".to_string(),
            ));
        }
        if self.listen.segment_duration.is_zero() {
            return Err(Error::Config(
                "listen.segment_secs must be positive".to_string(),
            ));
        }
        if !(0.25..=4.0).contains(&self.tts.speed) {
            return Err(Error::Config(
                "tts.speed must be between 0.25 and 4.0".to_string(),
            ));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(Error::Config(
                "pipeline.queue_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Path to the user config file
fn config_file_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "vocalink")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Top-level TOML configuration file schema
///
/// All fields are optional; the file is a partial overlay on top of defaults.
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    listen: ListenFileConfig,

    #[serde(default)]
    stt: SttFileConfig,

    #[serde(default)]
    tts: TtsFileConfig,

    #[serde(default)]
    pipeline: PipelineFileConfig,

    #[serde(default)]
    api_keys: ApiKeysFileConfig,
}

#[derive(Debug, Default, Deserialize)]
struct ListenFileConfig {
    vad_threshold: Option<f32>,
    silence_timeout_secs: Option<f64>,
    segment_secs: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct SttFileConfig {
    provider: Option<String>,
    model: Option<String>,
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TtsFileConfig {
    provider: Option<String>,
    model: Option<String>,
    voice: Option<String>,
    speed: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct PipelineFileConfig {
    queue_capacity: Option<usize>,
    temp_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiKeysFileConfig {
    openai: Option<String>,
    deepgram: Option<String>,
    elevenlabs: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!((config.listen.vad_threshold - 0.005).abs() < f32::EPSILON);
        assert_eq!(config.listen.silence_timeout, Duration::from_secs(5));
        assert_eq!(config.listen.segment_duration, Duration::from_secs(3));
    }

    #[test]
    fn file_overlay_is_partial() {
        let file: ConfigFile = toml::from_str(
            r#"
            [listen]
            silence_timeout_secs = 2.5

            [tts]
            voice = "nova"
            "#,
        )
        .unwrap();

        let mut config = Config::default();
        config.apply_file(file);

        assert_eq!(config.listen.silence_timeout, Duration::from_secs_f64(2.5));
        assert_eq!(config.tts.voice, "nova");
        // untouched fields keep their defaults
        assert_eq!(config.listen.segment_duration, Duration::from_secs(3));
        assert_eq!(config.stt.model, "whisper-1");
    }

    #[test]
    fn speed_out_of_range_rejected() {
        let mut config = Config::default();
        config.tts.speed = 9.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_queue_capacity_rejected() {
        let mut config = Config::default();
        config.pipeline.queue_capacity = 0;
        assert!(config.validate().is_err());
    }
}
