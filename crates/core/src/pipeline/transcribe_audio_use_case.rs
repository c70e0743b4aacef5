use std::sync::Arc;

use crate::audio::domain::duration_probe::DurationProbe;
use crate::job::domain::job_handle::JobHandle;
use crate::job::domain::job_launcher::JobLauncher;
use crate::job::domain::job_paths::JobPaths;
use crate::job::domain::transcription_request::TranscriptionRequest;
use crate::job::domain::worker_args::WorkerArgs;
use crate::pipeline::job_router::{validate_input, ExecutionPath, RoutingPolicy};
use crate::pipeline::pipeline_logger::{LogPipelineLogger, PipelineLogger};
use crate::pipeline::result_formatter::format_job_started;
use crate::pipeline::transcription_pipeline::TranscriptionPipeline;
use crate::shared::constants::DEFAULT_ETA_FACTOR;
use crate::shared::error::TranscribeError;
use crate::shared::timestamp::local_now;

/// What the caller gets back.
#[derive(Debug)]
pub enum TranscribeOutcome {
    /// Short audio: the full transcript with its header.
    Completed(String),
    /// Long audio: a worker was launched; `status` describes where to look.
    Detached { handle: JobHandle, status: String },
}

impl TranscribeOutcome {
    pub fn text(&self) -> &str {
        match self {
            TranscribeOutcome::Completed(text) => text,
            TranscribeOutcome::Detached { status, .. } => status,
        }
    }
}

/// Entry point behind the `transcribe_audio` tool.
///
/// Validates the input, measures it, and either runs the pipeline inline or
/// hands the job to a detached worker. Rejections happen before any
/// pipeline stage runs.
pub struct TranscribeAudioUseCase {
    probe: Arc<dyn DurationProbe>,
    pipeline: Arc<TranscriptionPipeline>,
    launcher: Arc<dyn JobLauncher>,
    policy: RoutingPolicy,
    eta_factor: f64,
    device: String,
}

impl TranscribeAudioUseCase {
    pub fn new(
        probe: Arc<dyn DurationProbe>,
        pipeline: Arc<TranscriptionPipeline>,
        launcher: Arc<dyn JobLauncher>,
    ) -> Self {
        Self {
            probe,
            pipeline,
            launcher,
            policy: RoutingPolicy::default(),
            eta_factor: DEFAULT_ETA_FACTOR,
            device: "CPU".to_string(),
        }
    }

    pub fn with_policy(mut self, policy: RoutingPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_eta_factor(mut self, eta_factor: f64) -> Self {
        self.eta_factor = eta_factor;
        self
    }

    /// Compute device named in status blocks.
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = device.into();
        self
    }

    pub fn execute(
        &self,
        request: &TranscriptionRequest,
    ) -> Result<TranscribeOutcome, TranscribeError> {
        validate_input(&request.audio_path)?;
        let duration = self.probe.probe(&request.audio_path)?;
        let path = self.policy.route(duration)?;
        log::info!(
            "Transcribing {} ({:.1} minutes, {:?} path)",
            request.audio_path.display(),
            duration.minutes(),
            path
        );

        match path {
            ExecutionPath::Inline => {
                let mut logger = LogPipelineLogger::new();
                let output = self.pipeline.run(request, &mut logger)?;
                logger.summary();
                Ok(TranscribeOutcome::Completed(output.render(
                    request,
                    duration,
                    &local_now(),
                )))
            }
            ExecutionPath::Detached => {
                let paths = JobPaths::for_audio(&request.audio_path);
                let worker = self.launcher.launch(&WorkerArgs::new(request, &paths))?;
                let handle = JobHandle::new(paths, worker, duration, self.eta_factor);
                log::info!(
                    "Handed off to worker {} (about {} minutes)",
                    handle.pid,
                    handle.estimated_minutes
                );
                let status = format_job_started(request, duration, &handle, &self.device);
                Ok(TranscribeOutcome::Detached { handle, status })
            }
        }
    }
}
