use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
#[error("audio conversion failed for {}: {message}", .path.display())]
pub struct TranscodeError {
    pub path: PathBuf,
    pub message: String,
}

impl TranscodeError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// A mono 16 kHz PCM WAV ready for the engines.
///
/// When the file was produced by the transcoder it is deleted on drop, on
/// success and failure alike. Deletion errors are ignored.
#[derive(Debug)]
pub struct TranscodedAudio {
    path: PathBuf,
    temporary: bool,
}

impl TranscodedAudio {
    /// The input was already canonical and is used in place.
    pub fn original(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            temporary: false,
        }
    }

    /// A scratch file owned by this value.
    pub fn temporary(path: PathBuf) -> Self {
        Self {
            path,
            temporary: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

impl Drop for TranscodedAudio {
    fn drop(&mut self) {
        if self.temporary {
            if let Err(e) = std::fs::remove_file(&self.path) {
                log::debug!("Could not remove {}: {e}", self.path.display());
            }
        }
    }
}

/// Domain interface for normalising arbitrary audio to the engines' input format.
///
/// Implementations must hand back canonical input unchanged.
pub trait Transcoder: Send + Sync {
    fn transcode(&self, path: &Path) -> Result<TranscodedAudio, TranscodeError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_temporary_file_removed_on_drop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scratch.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        drop(TranscodedAudio::temporary(path.clone()));
        assert!(!path.exists());
    }

    #[test]
    fn test_original_file_kept_on_drop() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("input.wav");
        std::fs::write(&path, b"RIFF").unwrap();

        drop(TranscodedAudio::original(&path));
        assert!(path.exists());
    }

    #[test]
    fn test_missing_temporary_file_is_not_an_error() {
        drop(TranscodedAudio::temporary(PathBuf::from("/nonexistent/scratch.wav")));
    }
}
