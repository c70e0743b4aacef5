use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// The files that make up one detached job, all derived from the output path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobPaths {
    /// Final result, written in full before the marker is removed.
    pub output: PathBuf,
    /// Liveness marker; present while running and after a failure.
    pub marker: PathBuf,
    /// The worker's own log.
    pub log: PathBuf,
    /// Raw stdout/stderr of the worker process.
    pub stderr: PathBuf,
}

impl JobPaths {
    pub fn for_output(output: &Path) -> Self {
        Self {
            output: output.to_path_buf(),
            marker: output.with_extension("processing"),
            log: output.with_extension("log"),
            stderr: output.with_extension("stderr"),
        }
    }

    /// Paths for a job transcribing `audio`, with the result next to it.
    pub fn for_audio(audio: &Path) -> Self {
        Self::for_output(&output_path_for(audio))
    }

    /// Sibling the output is written to before being renamed into place.
    pub fn partial_output(&self) -> PathBuf {
        let mut name = self
            .output
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| OsString::from("output"));
        name.push(".part");
        self.output.with_file_name(name)
    }
}

/// Default result location for `audio`: same directory and stem, `.txt` extension.
pub fn output_path_for(audio: &Path) -> PathBuf {
    audio.with_extension("txt")
}
