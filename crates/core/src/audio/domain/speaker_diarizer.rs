use std::path::{Path, PathBuf};

use thiserror::Error;

use super::transcript::SpeakerTurn;
use crate::shared::model_resolver::ModelResolveError;

/// Closed set of engine failure categories. Only `SizeMismatch` is retried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiarizationFailureKind {
    /// Tensor shapes disagreed inside the engine; a freshly loaded engine
    /// usually gets past it.
    SizeMismatch,
    Other,
}

const SIZE_MISMATCH_PATTERNS: &[&str] = &[
    "sizes of tensors must match",
    "size mismatch",
    "shape mismatch",
];

impl DiarizationFailureKind {
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if SIZE_MISMATCH_PATTERNS.iter().any(|p| lower.contains(p)) {
            DiarizationFailureKind::SizeMismatch
        } else {
            DiarizationFailureKind::Other
        }
    }
}

#[derive(Error, Debug)]
pub enum DiarizationError {
    #[error("the {0} environment variable must hold a Hugging Face access token")]
    MissingCredential(&'static str),
    #[error("failed to resolve diarization model: {0}")]
    Model(#[from] ModelResolveError),
    #[error("failed to read audio {}: {message}", .path.display())]
    Audio { path: PathBuf, message: String },
    #[error("{message}")]
    Engine {
        kind: DiarizationFailureKind,
        message: String,
    },
}

impl DiarizationError {
    /// An engine failure, classified from its message.
    pub fn engine(message: impl Into<String>) -> Self {
        let message = message.into();
        DiarizationError::Engine {
            kind: DiarizationFailureKind::classify(&message),
            message,
        }
    }

    pub fn audio(path: &Path, message: impl Into<String>) -> Self {
        DiarizationError::Audio {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DiarizationError::Engine {
                kind: DiarizationFailureKind::SizeMismatch,
                ..
            }
        )
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, DiarizationError::MissingCredential(_))
    }
}

/// Domain interface for splitting a recording into speaker turns.
pub trait SpeakerDiarizer: Send + Sync {
    /// Turns in the order the engine reports them.
    fn diarize(&self, wav_path: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError>;

    /// Tear down any loaded engine state so the next call starts fresh.
    /// Default: nothing to reset.
    fn reset(&self) {}
}
