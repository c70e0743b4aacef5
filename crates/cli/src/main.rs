mod logging;
mod mcp_server;
mod tools;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{self, ExitCode};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};

use transcriber_core::audio::domain::duration_probe::DurationProbe;
use transcriber_core::audio::infrastructure::ffmpeg_duration_probe::FfmpegDurationProbe;
use transcriber_core::audio::infrastructure::ffmpeg_transcoder::FfmpegTranscoder;
use transcriber_core::audio::infrastructure::pyannote_diarizer::{
    DiarizationConfig, PyannoteDiarizer,
};
use transcriber_core::audio::infrastructure::retrying_diarizer::RetryingDiarizer;
use transcriber_core::audio::infrastructure::whisper_recognizer::{
    compute_device, WhisperModel, WhisperRecognizer,
};
use transcriber_core::job::domain::job_paths::JobPaths;
use transcriber_core::job::domain::job_status::JobStatus;
use transcriber_core::job::domain::transcription_request::TranscriptionRequest;
use transcriber_core::job::domain::worker_args::{parse_flag, parse_language, WorkerArgs};
use transcriber_core::job::infrastructure::process_job_launcher::{
    ProcessJobLauncher, WorkerCommand,
};
use transcriber_core::pipeline::detached_worker_use_case::{self, DetachedWorkerUseCase};
use transcriber_core::pipeline::job_router::RoutingPolicy;
use transcriber_core::pipeline::transcribe_audio_use_case::TranscribeAudioUseCase;
use transcriber_core::pipeline::transcription_pipeline::TranscriptionPipeline;
use transcriber_core::shared::constants::SUPPORTED_FORMATS;
use transcriber_core::shared::settings::{hf_token_from_env, Settings};

use crate::tools::Tools;

/// Exit status of `status` while the job has not finished yet.
const JOB_UNFINISHED_EXIT: u8 = 2;

/// Audio transcription with speaker labels, served as tools over stdio.
#[derive(Parser)]
#[command(name = "transcriber", version)]
struct Cli {
    /// Settings file (default: settings.json in the platform config directory).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the transcription tools over stdio (the default).
    Serve,

    /// Run one transcription job to completion, writing results to disk.
    Worker(WorkerInvocation),

    /// Show the state of a background job. Exits with 0 once the job has
    /// finished and with 2 while it has not.
    Status {
        /// The audio file, or the job's output file.
        path: PathBuf,
    },

    /// Transcribe a file from the command line, as the tool call would.
    Transcribe {
        audio_path: PathBuf,

        /// Language code; "auto" to detect (default: from settings).
        #[arg(long)]
        language: Option<String>,

        /// Skip speaker diarization.
        #[arg(long)]
        no_diarization: bool,
    },
}

/// The worker's positional arguments, kept raw until the marker is claimed.
#[derive(Args, Debug)]
struct WorkerInvocation {
    audio_path: PathBuf,
    output_path: PathBuf,
    /// Language code, or "None" to detect it.
    language: String,
    /// "true" or "false".
    diarization: String,
    /// Mirror the log into this file.
    log_path: Option<PathBuf>,
}

impl WorkerInvocation {
    fn paths(&self) -> JobPaths {
        JobPaths::for_output(&self.output_path)
    }

    fn worker_args(&self) -> Result<WorkerArgs, String> {
        Ok(WorkerArgs {
            audio_path: self.audio_path.clone(),
            output_path: self.output_path.clone(),
            language: parse_language(&self.language),
            diarization: parse_flag(&self.diarization)?,
            log_path: self.log_path.clone(),
        })
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let settings = start(config)?;
            run_server(&settings, config)?;
        }
        Command::Worker(invocation) => run_worker(config, &invocation)?,
        Command::Status { path } => {
            logging::init();
            let status = JobStatus::read(&status_paths(&path))?;
            println!("{}: {status}", path.display());
            if !status.is_finished() {
                return Ok(ExitCode::from(JOB_UNFINISHED_EXIT));
            }
        }
        Command::Transcribe {
            audio_path,
            language,
            no_diarization,
        } => {
            let settings = start(config)?;
            let language = language
                .unwrap_or_else(|| settings.default_language.clone())
                .trim()
                .to_string();
            let language = (!language.eq_ignore_ascii_case("auto")).then_some(language);
            let request = TranscriptionRequest::new(audio_path, language, !no_diarization);
            let use_case = build_transcribe_use_case(&settings, config)?;
            println!("{}", use_case.execute(&request)?.text());
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Logging to stderr plus settings, for the commands that run transcriptions.
fn start(config: Option<&Path>) -> Result<Settings, Box<dyn std::error::Error>> {
    logging::init();
    load_settings(config)
}

fn load_settings(path: Option<&Path>) -> Result<Settings, Box<dyn std::error::Error>> {
    let settings = match path {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load(),
    };
    Ok(settings.with_env_overrides())
}

/// Audio files map to their `.txt` job; anything else is taken as the
/// job's output path itself.
fn status_paths(path: &Path) -> JobPaths {
    let is_audio = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_FORMATS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false);
    if is_audio {
        JobPaths::for_audio(path)
    } else {
        JobPaths::for_output(path)
    }
}

fn run_server(
    settings: &Settings,
    config: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let use_case = build_transcribe_use_case(settings, config)?;
    let tools = Arc::new(Tools::new(Arc::new(use_case), settings.default_language.clone()));

    log::info!("Transcription server ready on stdio ({})", compute_device());
    let stdin = io::stdin();
    mcp_server::serve(tools, stdin.lock(), io::stdout())?;
    log::info!("Transcription server stopped");
    Ok(())
}

/// Worker entry point. The marker is claimed before anything else, so a
/// failure while starting up is recorded the same way as a pipeline failure.
fn run_worker(
    config: Option<&Path>,
    invocation: &WorkerInvocation,
) -> Result<(), Box<dyn std::error::Error>> {
    let paths = invocation.paths();
    detached_worker_use_case::mark_started(&paths, &invocation.audio_path)?;

    let (settings, args) = match prepare_worker(config, invocation) {
        Ok(prepared) => prepared,
        Err(e) => {
            detached_worker_use_case::record_failure(&paths, &e);
            return Err(e);
        }
    };

    log::info!(
        "Worker {} started for {}",
        process::id(),
        args.audio_path.display()
    );
    let use_case = DetachedWorkerUseCase::new(build_probe(), build_pipeline(&settings));
    use_case.run(&args)?;
    Ok(())
}

fn prepare_worker(
    config: Option<&Path>,
    invocation: &WorkerInvocation,
) -> Result<(Settings, WorkerArgs), Box<dyn std::error::Error>> {
    match &invocation.log_path {
        Some(log_path) => logging::init_with_file(log_path)?,
        None => logging::init(),
    }
    let settings = load_settings(config)?;
    let args = invocation.worker_args()?;
    Ok((settings, args))
}

fn build_transcribe_use_case(
    settings: &Settings,
    config: Option<&Path>,
) -> Result<TranscribeAudioUseCase, Box<dyn std::error::Error>> {
    let launcher = ProcessJobLauncher::new(worker_command(config)?);
    let policy = RoutingPolicy {
        inline_limit_secs: settings.inline_limit_secs,
        max_duration_secs: settings.max_duration_secs,
    };
    Ok(
        TranscribeAudioUseCase::new(build_probe(), build_pipeline(settings), Arc::new(launcher))
            .with_policy(policy)
            .with_eta_factor(settings.eta_factor)
            .with_device(compute_device()),
    )
}

/// This executable's `worker` subcommand, carrying the same settings file.
fn worker_command(config: Option<&Path>) -> io::Result<WorkerCommand> {
    let program = std::env::current_exe()?;
    let mut leading_args = Vec::new();
    if let Some(config) = config {
        leading_args.push(OsString::from("--config"));
        leading_args.push(config.as_os_str().to_os_string());
    }
    leading_args.push(OsString::from("worker"));
    Ok(WorkerCommand::new(program, leading_args))
}

fn build_probe() -> Arc<dyn DurationProbe> {
    Arc::new(FfmpegDurationProbe)
}

fn build_pipeline(settings: &Settings) -> Arc<TranscriptionPipeline> {
    let model = match &settings.whisper_model_path {
        Some(path) => WhisperModel::Path(path.clone()),
        None => WhisperModel::Resolved(settings.whisper_model.source()),
    };
    let recognizer = WhisperRecognizer::new(model, settings.thread_count());

    let mut diarization = DiarizationConfig::new(hf_token_from_env());
    diarization.max_speakers = settings.max_speakers;
    diarization.similarity_threshold = settings.speaker_similarity;
    let diarizer = RetryingDiarizer::new(Box::new(PyannoteDiarizer::new(diarization)));

    Arc::new(TranscriptionPipeline::new(
        Arc::new(FfmpegTranscoder::new()),
        Arc::new(recognizer),
        Arc::new(diarizer),
    ))
}
