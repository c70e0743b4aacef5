use std::ffi::OsString;
use std::path::PathBuf;

use super::job_paths::JobPaths;
use super::transcription_request::TranscriptionRequest;
use crate::shared::constants::AUTO_LANGUAGE_SENTINEL;

/// Positional arguments of the worker entry point:
/// `<audio_path> <output_path> <language|None> <true|false> [<log_path>]`.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkerArgs {
    pub audio_path: PathBuf,
    pub output_path: PathBuf,
    pub language: Option<String>,
    pub diarization: bool,
    pub log_path: Option<PathBuf>,
}

impl WorkerArgs {
    pub fn new(request: &TranscriptionRequest, paths: &JobPaths) -> Self {
        Self {
            audio_path: request.audio_path.clone(),
            output_path: paths.output.clone(),
            language: request.language.clone(),
            diarization: request.diarization,
            log_path: Some(paths.log.clone()),
        }
    }

    pub fn request(&self) -> TranscriptionRequest {
        TranscriptionRequest::new(self.audio_path.clone(), self.language.clone(), self.diarization)
    }

    pub fn paths(&self) -> JobPaths {
        JobPaths::for_output(&self.output_path)
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = vec![
            self.audio_path.clone().into_os_string(),
            self.output_path.clone().into_os_string(),
            OsString::from(self.language.as_deref().unwrap_or(AUTO_LANGUAGE_SENTINEL)),
            OsString::from(if self.diarization { "true" } else { "false" }),
        ];
        if let Some(log_path) = &self.log_path {
            args.push(log_path.clone().into_os_string());
        }
        args
    }
}

/// Decode the language argument; the sentinel (or nothing) means auto-detect.
pub fn parse_language(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw == AUTO_LANGUAGE_SENTINEL {
        None
    } else {
        Some(raw.to_string())
    }
}

/// Decode the diarization argument, accepting any casing of `true`/`false`.
pub fn parse_flag(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(format!("expected 'true' or 'false', got '{other}'")),
    }
}
