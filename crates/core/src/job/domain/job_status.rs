use std::fmt;
use std::fs;
use std::io;

use super::job_paths::JobPaths;
use super::lifecycle_marker;
use crate::shared::constants::RESULT_BANNER;

/// State of a detached job, derived only from the files on disk.
#[derive(Clone, Debug, PartialEq)]
pub enum JobStatus {
    NotStarted,
    /// The marker exists and records no failure. A worker that crashed
    /// without recording anything also looks like this; compare `pid`
    /// with the process table to tell them apart.
    Running {
        started: Option<String>,
        pid: Option<u32>,
    },
    Succeeded,
    Failed { detail: String },
}

impl JobStatus {
    pub fn read(paths: &JobPaths) -> io::Result<Self> {
        if let Some(marker) = lifecycle_marker::read(&paths.marker)? {
            if marker.has_failed() {
                let detail = marker
                    .error
                    .unwrap_or_else(|| "failed without detail".to_string());
                return Ok(JobStatus::Failed { detail });
            }
            return Ok(JobStatus::Running {
                started: marker.started,
                pid: marker.pid,
            });
        }

        match fs::read_to_string(&paths.output) {
            Ok(text) if text.starts_with(RESULT_BANNER) => Ok(JobStatus::Succeeded),
            Ok(text) => Ok(JobStatus::Failed {
                detail: text.trim().to_string(),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(JobStatus::NotStarted),
            Err(e) => Err(e),
        }
    }

    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Succeeded | JobStatus::Failed { .. })
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::NotStarted => write!(f, "not started"),
            JobStatus::Running { started, pid } => {
                write!(f, "running")?;
                if let Some(started) = started {
                    write!(f, " since {started}")?;
                }
                if let Some(pid) = pid {
                    write!(f, " (pid {pid})")?;
                }
                Ok(())
            }
            JobStatus::Succeeded => write!(f, "succeeded"),
            JobStatus::Failed { detail } => write!(f, "failed: {detail}"),
        }
    }
}
