use std::path::Path;

use crate::audio::domain::speaker_diarizer::{DiarizationError, SpeakerDiarizer};
use crate::audio::domain::transcript::SpeakerTurn;

/// Decorator that retries a diarization call exactly once when the engine
/// reports a tensor size mismatch.
///
/// The wrapped diarizer is reset before the second attempt so it reloads
/// its engine. Any other failure, or a second failure of the same kind, is
/// returned as-is.
pub struct RetryingDiarizer {
    inner: Box<dyn SpeakerDiarizer>,
}

impl RetryingDiarizer {
    pub fn new(inner: Box<dyn SpeakerDiarizer>) -> Self {
        Self { inner }
    }
}

impl SpeakerDiarizer for RetryingDiarizer {
    fn diarize(&self, wav_path: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError> {
        match self.inner.diarize(wav_path) {
            Err(err) if err.is_retryable() => {
                log::warn!(
                    "Diarization hit a size mismatch, reloading engine and retrying once: {err}"
                );
                self.inner.reset();
                self.inner.diarize(wav_path)
            }
            other => other,
        }
    }

    fn reset(&self) {
        self.inner.reset();
    }
}
