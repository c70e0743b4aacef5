use chrono::{DateTime, Duration, Local};

use super::job_launcher::LaunchedWorker;
use super::job_paths::JobPaths;
use crate::audio::domain::duration_probe::AudioDuration;

/// What a caller gets back when a job was handed to a detached worker.
#[derive(Clone, Debug)]
pub struct JobHandle {
    pub paths: JobPaths,
    pub pid: u32,
    pub estimated_minutes: u64,
    pub estimated_completion: DateTime<Local>,
    pub command_line: String,
}

impl JobHandle {
    pub fn new(
        paths: JobPaths,
        worker: LaunchedWorker,
        duration: AudioDuration,
        eta_factor: f64,
    ) -> Self {
        let estimated_minutes = estimated_minutes(duration, eta_factor);
        let estimated_completion =
            Local::now() + Duration::minutes(estimated_minutes.min(u64::from(u32::MAX)) as i64);
        Self {
            paths,
            pid: worker.pid,
            estimated_minutes,
            estimated_completion,
            command_line: worker.command_line,
        }
    }
}

/// Whole minutes of processing expected for `duration`.
pub fn estimated_minutes(duration: AudioDuration, eta_factor: f64) -> u64 {
    (duration.minutes() * eta_factor).floor().max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::path::Path;

    #[rstest]
    #[case(600.0, 1.2, 12)]
    #[case(210.0, 1.2, 4)]
    #[case(3600.0, 1.2, 72)]
    #[case(30.0, 1.0, 0)]
    fn test_estimated_minutes(#[case] secs: f64, #[case] factor: f64, #[case] expected: u64) {
        assert_eq!(estimated_minutes(AudioDuration::from_secs(secs), factor), expected);
    }

    #[test]
    fn test_completion_is_in_the_future() {
        let before = Local::now();
        let handle = JobHandle::new(
            JobPaths::for_audio(Path::new("/a/talk.mp3")),
            LaunchedWorker {
                pid: 10,
                command_line: "transcriber worker".to_string(),
            },
            AudioDuration::from_secs(600.0),
            1.2,
        );
        assert_eq!(handle.pid, 10);
        assert_eq!(handle.estimated_minutes, 12);
        assert!(handle.estimated_completion >= before + Duration::minutes(12));
    }
}
