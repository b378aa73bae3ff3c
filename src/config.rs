use crate::audio::BoundaryPolicy;
use crate::defaults;
use crate::error::{GistingError, Result};
use crate::gateway::recognizers::FILE_PLACEHOLDER;
use crate::languages;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub languages: LanguagesConfig,
    pub audio: AudioConfig,
    pub transcription: TranscriptionConfig,
    pub translation: TranslationConfig,
    pub synthesis: SynthesisConfig,
    pub render: RenderConfig,
}

/// Initial language selection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LanguagesConfig {
    pub source: String,
    pub target: String,
}

/// How utterances are cut from the incoming stream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum BoundaryKind {
    #[default]
    Silence,
    PerFrame,
    Fixed,
}

/// Utterance shaping configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub boundary: BoundaryKind,
    pub fixed_ms: u32,
    pub silence_threshold: f32,
    pub silence_ms: u32,
    pub max_utterance_ms: u32,
    /// Utterances below this RMS skip recognition entirely.
    pub min_energy: f32,
}

/// Which speech recognizer to use
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerBackend {
    #[default]
    Http,
    Command,
    Mock,
}

/// Speech-to-text configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub backend: RecognizerBackend,
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    /// Program and arguments for the command backend; `{file}` and `{lang}` are substituted.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub workers: usize,
    pub queue_depth: usize,
}

/// Machine translation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TranslationConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

/// Render loop configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub poll_ms: u64,
    /// Where synthesized MP3s are written; nothing is saved when unset.
    pub output_dir: Option<PathBuf>,
}

impl Default for LanguagesConfig {
    fn default() -> Self {
        Self {
            source: defaults::SOURCE_LANGUAGE.to_string(),
            target: defaults::TARGET_LANGUAGE.to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            boundary: BoundaryKind::Silence,
            fixed_ms: defaults::FIXED_UTTERANCE_MS,
            silence_threshold: defaults::SILENCE_THRESHOLD,
            silence_ms: defaults::SILENCE_MS,
            max_utterance_ms: defaults::MAX_UTTERANCE_MS,
            min_energy: defaults::MIN_ENERGY_FOR_TRANSCRIPTION,
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            backend: RecognizerBackend::Http,
            endpoint: defaults::STT_ENDPOINT.to_string(),
            model: defaults::STT_MODEL.to_string(),
            api_key: None,
            command: Vec::new(),
            timeout_secs: defaults::GATEWAY_TIMEOUT_SECS,
            workers: defaults::TRANSCRIPTION_WORKERS,
            queue_depth: defaults::QUEUE_DEPTH,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::TRANSLATE_ENDPOINT.to_string(),
            api_key: None,
            timeout_secs: defaults::GATEWAY_TIMEOUT_SECS,
        }
    }
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::TTS_ENDPOINT.to_string(),
            timeout_secs: defaults::GATEWAY_TIMEOUT_SECS,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            poll_ms: defaults::POLL_MS,
            output_dir: None,
        }
    }
}

impl AudioConfig {
    /// The boundary policy these settings describe.
    pub fn boundary_policy(&self) -> BoundaryPolicy {
        match self.boundary {
            BoundaryKind::PerFrame => BoundaryPolicy::PerFrame,
            BoundaryKind::Fixed => BoundaryPolicy::FixedDuration { ms: self.fixed_ms },
            BoundaryKind::Silence => BoundaryPolicy::Silence {
                threshold: self.silence_threshold,
                silence_ms: self.silence_ms,
                max_ms: self.max_utterance_ms,
            },
        }
    }
}

impl TranscriptionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl TranslationConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl SynthesisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn invalid(key: &str, message: impl Into<String>) -> GistingError {
    GistingError::ConfigInvalidValue {
        key: key.to_string(),
        message: message.into(),
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(GistingError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only a missing file falls back to defaults; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e)
                if matches!(
                    e.downcast_ref::<GistingError>(),
                    Some(GistingError::ConfigFileNotFound { .. })
                ) =>
            {
                Ok(Self::default())
            }
            Err(e) => Err(e.context(format!("Failed to load config from {}", path.display()))),
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - GISTING_SOURCE_LANG → languages.source
    /// - GISTING_TARGET_LANG → languages.target
    /// - GISTING_STT_ENDPOINT → transcription.endpoint
    /// - GISTING_STT_API_KEY → transcription.api_key
    /// - GISTING_TRANSLATE_ENDPOINT → translation.endpoint
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(source) = std::env::var("GISTING_SOURCE_LANG")
            && !source.is_empty()
        {
            self.languages.source = source;
        }

        if let Ok(target) = std::env::var("GISTING_TARGET_LANG")
            && !target.is_empty()
        {
            self.languages.target = target;
        }

        if let Ok(endpoint) = std::env::var("GISTING_STT_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.transcription.endpoint = endpoint;
        }

        if let Ok(key) = std::env::var("GISTING_STT_API_KEY")
            && !key.is_empty()
        {
            self.transcription.api_key = Some(key);
        }

        if let Ok(endpoint) = std::env::var("GISTING_TRANSLATE_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.translation.endpoint = endpoint;
        }

        self
    }

    /// Check values that deserialize fine but cannot work.
    pub fn validate(&self) -> Result<()> {
        if !self
            .languages
            .source
            .eq_ignore_ascii_case(defaults::AUTO_LANGUAGE)
        {
            languages::resolve(&self.languages.source)
                .map_err(|e| invalid("languages.source", e.to_string()))?;
        }
        languages::resolve(&self.languages.target)
            .map_err(|e| invalid("languages.target", e.to_string()))?;

        if !(0.0..=1.0).contains(&self.audio.silence_threshold) {
            return Err(invalid("audio.silence_threshold", "must be between 0.0 and 1.0"));
        }
        if self.audio.boundary == BoundaryKind::Fixed && self.audio.fixed_ms == 0 {
            return Err(invalid("audio.fixed_ms", "must be greater than 0"));
        }
        if self.audio.max_utterance_ms == 0 {
            return Err(invalid("audio.max_utterance_ms", "must be greater than 0"));
        }

        if self.transcription.workers == 0 {
            return Err(invalid("transcription.workers", "must be at least 1"));
        }
        if self.transcription.queue_depth == 0 {
            return Err(invalid("transcription.queue_depth", "must be at least 1"));
        }
        if self.transcription.backend == RecognizerBackend::Command
            && !self
                .transcription
                .command
                .iter()
                .skip(1)
                .any(|a| a.contains(FILE_PLACEHOLDER))
        {
            return Err(invalid(
                "transcription.command",
                format!("needs a program and an argument containing {}", FILE_PLACEHOLDER),
            ));
        }

        for (key, secs) in [
            ("transcription.timeout_secs", self.transcription.timeout_secs),
            ("translation.timeout_secs", self.translation.timeout_secs),
            ("synthesis.timeout_secs", self.synthesis.timeout_secs),
        ] {
            if secs == 0 {
                return Err(invalid(key, "must be greater than 0"));
            }
        }

        if self.render.poll_ms == 0 {
            return Err(invalid("render.poll_ms", "must be greater than 0"));
        }

        Ok(())
    }

    /// Serialize back to TOML, e.g. for `config show`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GistingError::ConfigParse {
            message: e.to_string(),
        })
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/gisting/config.toml on Linux, `None` when the
    /// platform has no config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gisting").join("config.toml"))
    }
}
