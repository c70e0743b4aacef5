use std::path::Path;

use crate::audio::domain::duration_probe::{AudioDuration, DurationProbe, ProbeError};

/// Reads the duration via ffmpeg-next without decoding any audio.
///
/// Uses the container duration, falling back to the best audio stream's own
/// duration for containers that do not report one.
pub struct FfmpegDurationProbe;

impl DurationProbe for FfmpegDurationProbe {
    fn probe(&self, path: &Path) -> Result<AudioDuration, ProbeError> {
        ffmpeg_next::init().map_err(|e| ProbeError::new(path, e.to_string()))?;

        let ictx =
            ffmpeg_next::format::input(path).map_err(|e| ProbeError::new(path, e.to_string()))?;

        let secs = container_secs(ictx.duration())
            .or_else(|| {
                let stream = ictx.streams().best(ffmpeg_next::media::Type::Audio)?;
                stream_secs(stream.duration(), f64::from(stream.time_base()))
            })
            .ok_or_else(|| ProbeError::new(path, "no duration reported for container or stream"))?;

        Ok(AudioDuration::from_secs(secs))
    }
}

/// Container duration is in AV_TIME_BASE units; zero or negative means unknown.
fn container_secs(raw: i64) -> Option<f64> {
    (raw > 0).then(|| raw as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE))
}

/// Stream duration is in the stream's own time base.
fn stream_secs(raw: i64, time_base: f64) -> Option<f64> {
    (raw > 0 && time_base > 0.0).then(|| raw as f64 * time_base)
}
