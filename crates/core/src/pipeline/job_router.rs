use std::path::Path;

use crate::audio::domain::duration_probe::AudioDuration;
use crate::shared::constants::{INLINE_LIMIT_SECS, MAX_DURATION_SECS, SUPPORTED_FORMATS};
use crate::shared::error::TranscribeError;

/// Where a request runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecutionPath {
    /// Within the caller's request; the response carries the transcript.
    Inline,
    /// In a separate worker process; the response carries a job handle.
    Detached,
}

/// Duration thresholds that pick the execution path. Language and
/// diarization never influence the choice.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoutingPolicy {
    pub inline_limit_secs: f64,
    pub max_duration_secs: f64,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            inline_limit_secs: INLINE_LIMIT_SECS,
            max_duration_secs: MAX_DURATION_SECS,
        }
    }
}

impl RoutingPolicy {
    pub fn route(&self, duration: AudioDuration) -> Result<ExecutionPath, TranscribeError> {
        let secs = duration.secs();
        if secs > self.max_duration_secs {
            Err(TranscribeError::DurationExceeded {
                duration_secs: secs,
                limit_secs: self.max_duration_secs,
            })
        } else if secs <= self.inline_limit_secs {
            Ok(ExecutionPath::Inline)
        } else {
            Ok(ExecutionPath::Detached)
        }
    }
}

/// Checks that need nothing but the path: existence and a supported extension.
pub fn validate_input(path: &Path) -> Result<(), TranscribeError> {
    if !path.is_file() {
        return Err(TranscribeError::InputNotFound(path.to_path_buf()));
    }
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_FORMATS.contains(&extension.as_str()) {
        return Err(TranscribeError::UnsupportedFormat { extension });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[rstest]
    #[case(0.5, ExecutionPath::Inline)]
    #[case(120.0, ExecutionPath::Inline)]
    #[case(180.0, ExecutionPath::Inline)]
    #[case(180.001, ExecutionPath::Detached)]
    #[case(600.0, ExecutionPath::Detached)]
    #[case(3600.0, ExecutionPath::Detached)]
    fn test_route(#[case] secs: f64, #[case] expected: ExecutionPath) {
        let path = RoutingPolicy::default()
            .route(AudioDuration::from_secs(secs))
            .unwrap();
        assert_eq!(path, expected);
    }

    #[rstest]
    #[case(3600.001)]
    #[case(7200.0)]
    fn test_route_rejects_over_ceiling(#[case] secs: f64) {
        let err = RoutingPolicy::default()
            .route(AudioDuration::from_secs(secs))
            .unwrap_err();
        assert!(matches!(err, TranscribeError::DurationExceeded { .. }));
    }

    #[test]
    fn test_custom_policy() {
        let policy = RoutingPolicy {
            inline_limit_secs: 10.0,
            max_duration_secs: 20.0,
        };
        assert_eq!(policy.route(AudioDuration::from_secs(15.0)).unwrap(), ExecutionPath::Detached);
        assert!(policy.route(AudioDuration::from_secs(21.0)).is_err());
    }

    #[test]
    fn test_validate_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = validate_input(&tmp.path().join("nope.mp3")).unwrap_err();
        assert!(matches!(err, TranscribeError::InputNotFound(_)));
    }

    #[test]
    fn test_validate_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("folder.mp3");
        std::fs::create_dir(&dir).unwrap();
        assert!(matches!(
            validate_input(&dir).unwrap_err(),
            TranscribeError::InputNotFound(_)
        ));
    }

    #[rstest]
    #[case("notes.txt", "txt")]
    #[case("README", "")]
    fn test_validate_unsupported_extension(#[case] name: &str, #[case] extension: &str) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        match validate_input(&path).unwrap_err() {
            TranscribeError::UnsupportedFormat { extension: got } => assert_eq!(got, extension),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[rstest]
    #[case("a.MP3")]
    #[case("a.wav")]
    #[case("a.webm")]
    fn test_validate_supported(#[case] name: &str) {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(name);
        std::fs::write(&path, b"x").unwrap();
        assert!(validate_input(&path).is_ok());
    }
}
