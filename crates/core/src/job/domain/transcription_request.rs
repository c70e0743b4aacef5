use std::path::{Path, PathBuf};

/// One transcription request, as received from a tool call or the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptionRequest {
    pub audio_path: PathBuf,
    /// Language hint; `None` lets the recognizer detect it.
    pub language: Option<String>,
    pub diarization: bool,
}

impl TranscriptionRequest {
    pub fn new(
        audio_path: impl Into<PathBuf>,
        language: Option<String>,
        diarization: bool,
    ) -> Self {
        Self {
            audio_path: audio_path.into(),
            language: language.filter(|l| !l.trim().is_empty()),
            diarization,
        }
    }

    pub fn language_hint(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Language as shown to callers.
    pub fn language_label(&self) -> &str {
        self.language.as_deref().unwrap_or("auto-detect")
    }

    pub fn file_name(&self) -> String {
        file_name_of(&self.audio_path)
    }

    /// Lower-case extension without the dot, or an empty string.
    pub fn extension(&self) -> String {
        self.audio_path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default()
    }
}

pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_language_means_auto_detect() {
        let request = TranscriptionRequest::new("a.mp3", Some("  ".to_string()), true);
        assert_eq!(request.language_hint(), None);
        assert_eq!(request.language_label(), "auto-detect");
    }

    #[test]
    fn test_extension_is_lower_cased() {
        let request = TranscriptionRequest::new("/data/Meeting.MP3", Some("en".to_string()), false);
        assert_eq!(request.extension(), "mp3");
        assert_eq!(request.file_name(), "Meeting.MP3");
        assert_eq!(request.language_label(), "en");
    }

    #[test]
    fn test_missing_extension_is_empty() {
        let request = TranscriptionRequest::new("/data/recording", None, false);
        assert_eq!(request.extension(), "");
    }
}
