use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Error, Debug)]
#[error("could not read audio duration of {}: {message}", .path.display())]
pub struct ProbeError {
    pub path: PathBuf,
    pub message: String,
}

impl ProbeError {
    pub fn new(path: &Path, message: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Length of an input file in seconds. Only used for routing and ETA display.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct AudioDuration(f64);

impl AudioDuration {
    pub fn from_secs(secs: f64) -> Self {
        Self(secs)
    }

    pub fn secs(self) -> f64 {
        self.0
    }

    pub fn minutes(self) -> f64 {
        self.0 / 60.0
    }
}

/// Domain interface for measuring how long a media file plays.
pub trait DurationProbe: Send + Sync {
    fn probe(&self, path: &Path) -> Result<AudioDuration, ProbeError>;
}
