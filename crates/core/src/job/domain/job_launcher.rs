use super::worker_args::WorkerArgs;
use crate::shared::error::TranscribeError;

/// A worker process that has been started and not waited for.
#[derive(Clone, Debug, PartialEq)]
pub struct LaunchedWorker {
    pub pid: u32,
    /// Shell-style command line that re-runs the same job by hand.
    pub command_line: String,
}

/// Domain interface for starting a detached worker.
///
/// Implementations return as soon as the worker is running. Only a failure
/// to start it is reported here; everything after that is recorded by the
/// worker in the job files.
pub trait JobLauncher: Send + Sync {
    fn launch(&self, args: &WorkerArgs) -> Result<LaunchedWorker, TranscribeError>;
}
