use std::path::PathBuf;

use thiserror::Error;

use crate::audio::domain::duration_probe::ProbeError;
use crate::audio::domain::speaker_diarizer::DiarizationError;
use crate::audio::domain::speech_recognizer::RecognitionError;
use crate::audio::domain::transcoder::TranscodeError;
use crate::shared::constants::SUPPORTED_FORMATS;

/// Everything that can stop a transcription request or job.
#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("unsupported file format '{extension}' (supported: {})", SUPPORTED_FORMATS.join(", "))]
    UnsupportedFormat { extension: String },
    #[error(
        "audio duration {:.1} minutes exceeds the {:.0} minute limit",
        .duration_secs / 60.0,
        .limit_secs / 60.0
    )]
    DurationExceeded { duration_secs: f64, limit_secs: f64 },
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error(transparent)]
    Transcode(#[from] TranscodeError),
    #[error(transparent)]
    Recognition(#[from] RecognitionError),
    #[error("speaker diarization is not configured: {0}")]
    DiarizationConfig(#[source] DiarizationError),
    #[error("speaker diarization failed: {0}")]
    Diarization(#[source] DiarizationError),
    #[error("failed to launch worker process {}: {source}", .program.display())]
    ProcessSpawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<DiarizationError> for TranscribeError {
    fn from(err: DiarizationError) -> Self {
        if err.is_configuration() {
            TranscribeError::DiarizationConfig(err)
        } else {
            TranscribeError::Diarization(err)
        }
    }
}

impl TranscribeError {
    /// Errors detected before any pipeline stage runs.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TranscribeError::InputNotFound(_)
                | TranscribeError::UnsupportedFormat { .. }
                | TranscribeError::DurationExceeded { .. }
        )
    }
}
