//! Text renderings of results, errors and job status.
//!
//! Everything here is pure: the same inputs always give the same bytes.
//! Callers supply timestamps instead of the formatter reading the clock.

use std::fmt::Display;

use crate::audio::domain::duration_probe::AudioDuration;
use crate::audio::domain::transcript::{SpeakerTurn, TranscriptSegment};
use crate::job::domain::job_handle::JobHandle;
use crate::job::domain::transcription_request::TranscriptionRequest;
use crate::shared::constants::{
    ERROR_PREFIX, FAILURE_BANNER, RESULT_BANNER, TIMESTAMP_FORMAT, UNKNOWN_SPEAKER,
};

const RULE: &str = "============================================================";

/// `HH:MM:SS.mmm`, rounded to the nearest millisecond. Negative input clamps to zero.
pub fn format_timestamp(secs: f64) -> String {
    let total_ms = (secs.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = total_ms / 60_000 % 60;
    let seconds = total_ms / 1000 % 60;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

fn format_span(segment: &TranscriptSegment) -> String {
    format!(
        "[{} --> {}]",
        format_timestamp(segment.start_time),
        format_timestamp(segment.end_time)
    )
}

/// A transcript segment paired with the speaker it was attributed to.
#[derive(Clone, Debug, PartialEq)]
pub struct MergedSegment<'a> {
    pub segment: &'a TranscriptSegment,
    pub speaker: &'a str,
}

/// Attribute each segment to the first turn (in input order) that contains
/// its start time, or to [`UNKNOWN_SPEAKER`] when none does.
pub fn merge_speakers<'a>(
    segments: &'a [TranscriptSegment],
    turns: &'a [SpeakerTurn],
) -> Vec<MergedSegment<'a>> {
    segments
        .iter()
        .map(|segment| {
            let speaker = turns
                .iter()
                .find(|turn| turn.contains(segment.start_time))
                .map(|turn| turn.speaker.as_str())
                .unwrap_or(UNKNOWN_SPEAKER);
            MergedSegment { segment, speaker }
        })
        .collect()
}

/// One block per segment: speaker and time span on the first line, text on the next.
pub fn format_diarized(segments: &[TranscriptSegment], turns: &[SpeakerTurn]) -> String {
    merge_speakers(segments, turns)
        .iter()
        .map(|merged| {
            format!(
                "[Speaker {}] {}\n{}\n",
                merged.speaker,
                format_span(merged.segment),
                merged.segment.text.trim()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One `[start --> end] text` line per segment.
pub fn format_plain(segments: &[TranscriptSegment]) -> String {
    segments
        .iter()
        .map(|segment| format!("{} {}", format_span(segment), segment.text.trim()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Metadata printed above every successful transcript.
#[derive(Clone, Debug, PartialEq)]
pub struct ResultHeader {
    pub file_name: String,
    pub duration: AudioDuration,
    pub language: String,
    pub diarization: bool,
    /// Only shown when diarization ran and found someone.
    pub speaker_count: Option<usize>,
    pub completed_at: String,
}

impl ResultHeader {
    pub fn render(&self) -> String {
        let mut out = format!("{RESULT_BANNER}\n{RULE}\n\n");
        out.push_str(&format!("File: {}\n", self.file_name));
        out.push_str(&format!("Duration: {:.1} minutes\n", self.duration.minutes()));
        out.push_str(&format!("Language: {}\n", self.language));
        out.push_str(&format!(
            "Speaker diarization: {}\n",
            if self.diarization { "enabled" } else { "disabled" }
        ));
        if let Some(count) = self.speaker_count.filter(|&n| self.diarization && n > 0) {
            out.push_str(&format!("Speakers detected: {count}\n"));
        }
        out.push_str(&format!("Completed: {}\n", self.completed_at));
        out.push_str(&format!("\n{RULE}\n\n"));
        out
    }
}

/// Header followed by the transcript body.
pub fn format_result(header: &ResultHeader, body: &str) -> String {
    let mut out = header.render();
    out.push_str(body);
    if !body.ends_with('\n') {
        out.push('\n');
    }
    out
}

/// Error rendering returned to a caller.
pub fn format_error(err: &dyn Display) -> String {
    format!("{ERROR_PREFIX}{err}")
}

/// What a failed detached job leaves in its output file.
pub fn format_worker_failure(err: &dyn Display, failed_at: &str) -> String {
    format!("{FAILURE_BANNER}\n\n{}\nFailed at: {failed_at}\n", format_error(err))
}

/// Status block returned when a job was handed to a detached worker.
pub fn format_job_started(
    request: &TranscriptionRequest,
    duration: AudioDuration,
    handle: &JobHandle,
    device: &str,
) -> String {
    let paths = &handle.paths;
    let mut out = String::from("Transcription started in a background process\n\n");
    out.push_str("File:\n");
    out.push_str(&format!("   - Name: {}\n", request.file_name()));
    out.push_str(&format!("   - Duration: {:.1} minutes\n", duration.minutes()));
    out.push_str(&format!("   - Format: {}\n\n", request.extension().to_uppercase()));
    out.push_str("Settings:\n");
    out.push_str(&format!("   - Language: {}\n", request.language_label()));
    out.push_str(&format!(
        "   - Speaker diarization: {}\n",
        if request.diarization { "yes" } else { "no" }
    ));
    out.push_str(&format!("   - Device: {device}\n"));
    out.push_str(&format!("   - Process ID: {}\n\n", handle.pid));
    out.push_str(&format!(
        "Estimated time: about {} minutes (around {})\n\n",
        handle.estimated_minutes,
        handle.estimated_completion.format(TIMESTAMP_FORMAT)
    ));
    out.push_str(&format!("Result will be written to:\n   {}\n\n", paths.output.display()));
    out.push_str("Progress:\n");
    out.push_str(&format!("   Log: {}\n", paths.log.display()));
    out.push_str(&format!("   Stderr: {}\n", paths.stderr.display()));
    out.push_str(&format!("   Marker: {} (removed on success)\n\n", paths.marker.display()));
    out.push_str(&format!("Re-run by hand:\n   {}\n", handle.command_line));
    out
}
