//! The `.processing` marker of a detached job.
//!
//! Plain `Key: value` lines. The marker is created when a job starts, gets a
//! `Failed`/`Error` pair appended when the job fails, and is deleted only
//! after the output file is in place.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use crate::shared::timestamp::local_now;

const STARTED: &str = "Started";
const AUDIO_FILE: &str = "Audio file";
const PROCESS_ID: &str = "Process ID";
const FAILED: &str = "Failed";
const ERROR: &str = "Error";

/// Parsed contents of a marker file. Unknown or malformed lines are ignored.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MarkerRecord {
    pub started: Option<String>,
    pub audio_file: Option<String>,
    pub pid: Option<u32>,
    pub failed_at: Option<String>,
    pub error: Option<String>,
}

impl MarkerRecord {
    pub fn parse(text: &str) -> Self {
        let mut record = Self::default();
        let mut lines = text.lines();
        while let Some(line) = lines.next() {
            let Some((key, value)) = line.split_once(": ") else {
                continue;
            };
            match key {
                STARTED => record.started = Some(value.trim().to_string()),
                AUDIO_FILE => record.audio_file = Some(value.trim().to_string()),
                PROCESS_ID => record.pid = value.trim().parse().ok(),
                FAILED => record.failed_at = Some(value.trim().to_string()),
                ERROR => {
                    // The error message runs to the end of the file
                    let mut detail = value.to_string();
                    for rest in lines.by_ref() {
                        detail.push('\n');
                        detail.push_str(rest);
                    }
                    record.error = Some(detail.trim_end().to_string());
                }
                _ => {}
            }
        }
        record
    }

    pub fn has_failed(&self) -> bool {
        self.failed_at.is_some() || self.error.is_some()
    }
}

/// Create (or replace) the marker. `pid` is `None` while the worker is still
/// being launched.
pub fn write(path: &Path, audio: &Path, pid: Option<u32>) -> io::Result<()> {
    let pid = pid
        .map(|p| p.to_string())
        .unwrap_or_else(|| "pending".to_string());
    fs::write(
        path,
        format!(
            "{STARTED}: {}\n{AUDIO_FILE}: {}\n{PROCESS_ID}: {pid}\n",
            local_now(),
            audio.display()
        ),
    )
}

/// Append the failure time and message. Creates the marker if it is gone.
pub fn append_failure(path: &Path, message: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write!(file, "\n{FAILED}: {}\n{ERROR}: {message}\n", local_now())?;
    file.flush()
}

/// `Ok(None)` when there is no marker.
pub fn read(path: &Path) -> io::Result<Option<MarkerRecord>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(MarkerRecord::parse(&text))),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Delete the marker. A marker that is already gone is not an error.
pub fn remove(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
