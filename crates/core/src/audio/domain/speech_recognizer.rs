use std::path::Path;

use thiserror::Error;

use super::transcript::TranscriptSegment;

#[derive(Error, Debug)]
#[error("speech recognition failed: {message}")]
pub struct RecognitionError {
    pub message: String,
}

impl RecognitionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// What the recognition engine returns for one file.
#[derive(Clone, Debug, PartialEq)]
pub struct Recognition {
    pub segments: Vec<TranscriptSegment>,
    pub language: String,
}

/// Domain interface for speech-to-text transcription.
///
/// `language` is a hint such as `"zh"` or `"en"`; `None` asks the engine to
/// detect it. The call blocks until the whole file is transcribed.
pub trait SpeechRecognizer: Send + Sync {
    fn recognize(
        &self,
        wav_path: &Path,
        language: Option<&str>,
    ) -> Result<Recognition, RecognitionError>;
}
