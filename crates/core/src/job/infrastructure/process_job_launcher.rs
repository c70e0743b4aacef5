use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;

use crate::job::domain::job_launcher::{JobLauncher, LaunchedWorker};
use crate::job::domain::job_paths::JobPaths;
use crate::job::domain::lifecycle_marker;
use crate::job::domain::worker_args::WorkerArgs;
use crate::shared::error::TranscribeError;

/// The program (and any leading arguments) that runs the worker entry point.
#[derive(Clone, Debug)]
pub struct WorkerCommand {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>, leading_args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args,
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn leading_args(&self) -> &[OsString] {
        &self.leading_args
    }
}

/// Launches each job as a separate OS process.
///
/// The child inherits the environment (the diarization token travels that
/// way), gets stdin from the null device, and has stdout and stderr both
/// captured into the job's `.stderr` file. The call returns once the child
/// exists; a background thread reaps it.
pub struct ProcessJobLauncher {
    command: WorkerCommand,
}

impl ProcessJobLauncher {
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }

    fn spawn(
        &self,
        args: &WorkerArgs,
        paths: &JobPaths,
    ) -> Result<LaunchedWorker, TranscribeError> {
        let stdout = File::create(&paths.stderr).map_err(|source| TranscribeError::OutputWrite {
            path: paths.stderr.clone(),
            source,
        })?;
        let stderr = stdout.try_clone().map_err(|source| TranscribeError::OutputWrite {
            path: paths.stderr.clone(),
            source,
        })?;

        let worker_args = args.to_args();
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.leading_args)
            .args(&worker_args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr);
        detach(&mut cmd);

        let mut child = cmd.spawn().map_err(|source| TranscribeError::ProcessSpawn {
            program: self.command.program.clone(),
            source,
        })?;
        let pid = child.id();
        log::info!("Worker process started: pid {pid}");
        log::info!("Worker log: {}", paths.log.display());
        log::info!("Worker stderr: {}", paths.stderr.display());

        let reaper = thread::Builder::new()
            .name(format!("worker-reaper-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) if status.success() => log::info!("Worker {pid} finished"),
                Ok(status) => log::warn!("Worker {pid} exited with {status}"),
                Err(e) => log::warn!("Failed to wait for worker {pid}: {e}"),
            });
        if let Err(e) = reaper {
            log::warn!("Could not start reaper for worker {pid}: {e}");
        }

        let command_line = std::iter::once(self.command.program.as_os_str())
            .chain(self.command.leading_args.iter().map(OsString::as_os_str))
            .chain(worker_args.iter().map(OsString::as_os_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ");

        Ok(LaunchedWorker { pid, command_line })
    }
}

impl JobLauncher for ProcessJobLauncher {
    fn launch(&self, args: &WorkerArgs) -> Result<LaunchedWorker, TranscribeError> {
        let paths = args.paths();

        // Written before the spawn so a poller never sees a launched job as not started
        lifecycle_marker::write(&paths.marker, &args.audio_path, None).map_err(|source| {
            TranscribeError::OutputWrite {
                path: paths.marker.clone(),
                source,
            }
        })?;

        let launched = self.spawn(args, &paths);
        if launched.is_err() {
            if let Err(e) = lifecycle_marker::remove(&paths.marker) {
                log::warn!("Could not remove {}: {e}", paths.marker.display());
            }
        }
        launched
    }
}

#[cfg(unix)]
fn detach(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;
    // Own process group, so a signal to the server's group does not reach the worker
    cmd.process_group(0);
}

#[cfg(windows)]
fn detach(cmd: &mut Command) {
    use std::os::windows::process::CommandExt;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;
    cmd.creation_flags(CREATE_NO_WINDOW);
}

#[cfg(not(any(unix, windows)))]
fn detach(_cmd: &mut Command) {}

fn shell_quote(arg: &OsStr) -> String {
    let arg = arg.to_string_lossy();
    if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || "\"'\\$`".contains(c)) {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        arg.into_owned()
    }
}
