use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::shared::constants::{
    DEFAULT_ETA_FACTOR, DEFAULT_LANGUAGE, HF_TOKEN_ENV, INLINE_LIMIT_SECS, MAX_DURATION_SECS,
    WHISPER_MODEL_BASE_URL, WHISPER_MODEL_PATH_ENV,
};
use crate::shared::model_resolver::ModelSource;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WhisperModelSize {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "large-v3")]
    LargeV3,
}

impl WhisperModelSize {
    pub fn file_name(self) -> &'static str {
        match self {
            WhisperModelSize::Tiny => "ggml-tiny.bin",
            WhisperModelSize::Base => "ggml-base.bin",
            WhisperModelSize::Small => "ggml-small.bin",
            WhisperModelSize::Medium => "ggml-medium.bin",
            WhisperModelSize::LargeV3 => "ggml-large-v3.bin",
        }
    }

    pub fn source(self) -> ModelSource {
        let name = self.file_name();
        ModelSource::new(name, format!("{WHISPER_MODEL_BASE_URL}/{name}"))
    }
}

impl std::fmt::Display for WhisperModelSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhisperModelSize::Tiny => write!(f, "tiny"),
            WhisperModelSize::Base => write!(f, "base"),
            WhisperModelSize::Small => write!(f, "small"),
            WhisperModelSize::Medium => write!(f, "medium"),
            WhisperModelSize::LargeV3 => write!(f, "large-v3"),
        }
    }
}

/// Operator settings, read from `settings.json` in the platform config directory.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub whisper_model: WhisperModelSize,
    pub whisper_model_path: Option<PathBuf>,
    pub default_language: String,
    pub inline_limit_secs: f64,
    pub max_duration_secs: f64,
    pub eta_factor: f64,
    pub max_speakers: usize,
    pub speaker_similarity: f32,
    pub threads: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            whisper_model: WhisperModelSize::Medium,
            whisper_model_path: None,
            default_language: DEFAULT_LANGUAGE.to_string(),
            inline_limit_secs: INLINE_LIMIT_SECS,
            max_duration_secs: MAX_DURATION_SECS,
            eta_factor: DEFAULT_ETA_FACTOR,
            max_speakers: 10,
            speaker_similarity: 0.5,
            threads: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Transcriber").join("settings.json"))
    }

    /// Load from the default location. A missing file yields defaults; a
    /// broken one is reported and ignored.
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load_from(&path).unwrap_or_else(|e| {
            log::warn!("{e}; using default settings");
            Self::default()
        })
    }

    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides that take precedence over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(path) = env_var(WHISPER_MODEL_PATH_ENV) {
            self.whisper_model_path = Some(PathBuf::from(path));
        }
        self
    }

    pub fn thread_count(&self) -> usize {
        self.threads.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(8)
        })
    }
}

/// The diarization credential, read from the environment.
pub fn hf_token_from_env() -> Option<String> {
    env_var(HF_TOKEN_ENV)
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
