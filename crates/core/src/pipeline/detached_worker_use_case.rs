use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::audio::domain::duration_probe::DurationProbe;
use crate::job::domain::job_paths::JobPaths;
use crate::job::domain::lifecycle_marker;
use crate::job::domain::transcription_request::TranscriptionRequest;
use crate::job::domain::worker_args::WorkerArgs;
use crate::pipeline::job_router::validate_input;
use crate::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use crate::pipeline::result_formatter::format_worker_failure;
use crate::pipeline::transcription_pipeline::TranscriptionPipeline;
use crate::shared::error::TranscribeError;
use crate::shared::timestamp::local_now;

/// The job as run inside a worker process.
///
/// Writes the marker before anything else, runs the shared pipeline, writes
/// the result to the output file and only then removes the marker. On
/// failure the output file gets an error rendering and the marker gets the
/// failure appended and stays behind.
pub struct DetachedWorkerUseCase {
    probe: Arc<dyn DurationProbe>,
    pipeline: Arc<TranscriptionPipeline>,
}

impl DetachedWorkerUseCase {
    pub fn new(probe: Arc<dyn DurationProbe>, pipeline: Arc<TranscriptionPipeline>) -> Self {
        Self { probe, pipeline }
    }

    pub fn run(&self, args: &WorkerArgs) -> Result<(), TranscribeError> {
        let paths = args.paths();
        let request = args.request();
        let mut logger = LogPipelineLogger::new();

        if let Err(err) = self.produce_output(&request, &paths, &mut logger) {
            record_failure(&paths, &err);
            return Err(err);
        }
        logger.summary();

        // Output is already complete; a stuck marker is not recorded as a job failure
        lifecycle_marker::remove(&paths.marker).map_err(|source| {
            log::error!(
                "Result written but {} could not be removed: {source}",
                paths.marker.display()
            );
            TranscribeError::OutputWrite {
                path: paths.marker.clone(),
                source,
            }
        })?;
        log::info!("Job finished: {}", paths.output.display());
        Ok(())
    }

    fn produce_output(
        &self,
        request: &TranscriptionRequest,
        paths: &JobPaths,
        logger: &mut dyn PipelineLogger,
    ) -> Result<(), TranscribeError> {
        mark_started(paths, &request.audio_path)?;

        logger.info(&format!("Worker started for {}", request.audio_path.display()));
        logger.info(&format!("Output: {}", paths.output.display()));

        validate_input(&request.audio_path)?;
        let duration = self.probe.probe(&request.audio_path)?;
        logger.info(&format!(
            "Audio duration: {:.1} minutes, language: {}, diarization: {}",
            duration.minutes(),
            request.language_label(),
            request.diarization
        ));

        let output = self.pipeline.run(request, logger)?;
        let text = output.render(request, duration, &local_now());
        write_output(paths, &text)?;

        logger.metric("output_bytes", text.len() as f64);
        logger.info(&format!(
            "Result written to {} ({} bytes)",
            paths.output.display(),
            text.len()
        ));
        Ok(())
    }
}

/// Claim the job's marker for this process. A worker calls this before doing
/// anything else; calling it again only refreshes the start time.
pub fn mark_started(paths: &JobPaths, audio: &Path) -> Result<(), TranscribeError> {
    lifecycle_marker::write(&paths.marker, audio, Some(std::process::id())).map_err(|source| {
        TranscribeError::OutputWrite {
            path: paths.marker.clone(),
            source,
        }
    })
}

/// Write the output file via a sibling `.part` file, so it is either absent,
/// stale, or complete.
fn write_output(paths: &JobPaths, text: &str) -> Result<(), TranscribeError> {
    let partial = paths.partial_output();
    let written = fs::write(&partial, text).and_then(|()| fs::rename(&partial, &paths.output));
    written.map_err(|source| {
        let _ = fs::remove_file(&partial);
        TranscribeError::OutputWrite {
            path: paths.output.clone(),
            source,
        }
    })
}

/// Leave a failed job's terminal state on disk: an error rendering in the
/// output file and the failure appended to the marker.
pub fn record_failure(paths: &JobPaths, err: &dyn Display) {
    log::error!("Transcription failed: {err}");
    let failed_at = local_now();
    if let Err(e) = write_output(paths, &format_worker_failure(err, &failed_at)) {
        log::error!("Could not record failure in the output file: {e}");
    }
    if let Err(e) = lifecycle_marker::append_failure(&paths.marker, &err.to_string()) {
        log::error!("Could not record failure in {}: {e}", paths.marker.display());
    }
}
