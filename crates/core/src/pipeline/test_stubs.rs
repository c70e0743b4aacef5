//! Hand-written stand-ins for the engines, shared by the pipeline tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::audio::domain::duration_probe::{AudioDuration, DurationProbe, ProbeError};
use crate::audio::domain::speaker_diarizer::{DiarizationError, SpeakerDiarizer};
use crate::audio::domain::speech_recognizer::{Recognition, RecognitionError, SpeechRecognizer};
use crate::audio::domain::transcoder::{TranscodeError, TranscodedAudio, Transcoder};
use crate::audio::domain::transcript::{SpeakerTurn, TranscriptSegment};
use crate::job::domain::job_launcher::{JobLauncher, LaunchedWorker};
use crate::job::domain::worker_args::WorkerArgs;
use crate::shared::error::TranscribeError;

pub struct StubProbe {
    pub secs: Option<f64>,
}

impl DurationProbe for StubProbe {
    fn probe(&self, path: &Path) -> Result<AudioDuration, ProbeError> {
        self.secs
            .map(AudioDuration::from_secs)
            .ok_or_else(|| ProbeError::new(path, "no duration"))
    }
}

/// Writes a scratch file into `scratch_dir` and hands it out as temporary.
pub struct StubTranscoder {
    pub scratch_dir: PathBuf,
    pub calls: Arc<AtomicUsize>,
    pub last_output: Arc<Mutex<Option<PathBuf>>>,
}

impl StubTranscoder {
    pub fn new(scratch_dir: &Path) -> Self {
        Self {
            scratch_dir: scratch_dir.to_path_buf(),
            calls: Arc::new(AtomicUsize::new(0)),
            last_output: Arc::new(Mutex::new(None)),
        }
    }
}

impl Transcoder for StubTranscoder {
    fn transcode(&self, path: &Path) -> Result<TranscodedAudio, TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let scratch = self.scratch_dir.join("scratch.16k.wav");
        std::fs::write(&scratch, b"RIFF").map_err(|e| TranscodeError::new(path, e.to_string()))?;
        *self.last_output.lock().unwrap() = Some(scratch.clone());
        Ok(TranscodedAudio::temporary(scratch))
    }
}

pub struct StubRecognizer {
    pub result: Result<Recognition, String>,
    pub calls: Arc<AtomicUsize>,
    pub languages: Arc<Mutex<Vec<Option<String>>>>,
}

impl StubRecognizer {
    pub fn ok(segments: Vec<TranscriptSegment>) -> Self {
        Self {
            result: Ok(Recognition {
                segments,
                language: "en".to_string(),
            }),
            calls: Arc::new(AtomicUsize::new(0)),
            languages: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            result: Err(message.to_string()),
            ..Self::ok(vec![])
        }
    }
}

impl SpeechRecognizer for StubRecognizer {
    fn recognize(
        &self,
        wav_path: &Path,
        language: Option<&str>,
    ) -> Result<Recognition, RecognitionError> {
        assert!(wav_path.exists(), "recognizer got a missing file");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.languages.lock().unwrap().push(language.map(str::to_string));
        self.result.clone().map_err(RecognitionError::new)
    }
}

pub struct StubDiarizer {
    pub turns: Vec<SpeakerTurn>,
    pub missing_credential: bool,
    pub calls: Arc<AtomicUsize>,
}

impl StubDiarizer {
    pub fn new(turns: Vec<SpeakerTurn>) -> Self {
        Self {
            turns,
            missing_credential: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn without_credential() -> Self {
        Self {
            missing_credential: true,
            ..Self::new(vec![])
        }
    }
}

impl SpeakerDiarizer for StubDiarizer {
    fn diarize(&self, _: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.missing_credential {
            return Err(DiarizationError::MissingCredential("HUGGINGFACE_TOKEN"));
        }
        Ok(self.turns.clone())
    }
}

pub struct StubLauncher {
    pub launched: Arc<Mutex<Vec<WorkerArgs>>>,
    pub fail: bool,
}

impl StubLauncher {
    pub fn new() -> Self {
        Self {
            launched: Arc::new(Mutex::new(Vec::new())),
            fail: false,
        }
    }
}

impl JobLauncher for StubLauncher {
    fn launch(&self, args: &WorkerArgs) -> Result<LaunchedWorker, TranscribeError> {
        if self.fail {
            return Err(TranscribeError::ProcessSpawn {
                program: PathBuf::from("transcriber"),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        self.launched.lock().unwrap().push(args.clone());
        Ok(LaunchedWorker {
            pid: 4242,
            command_line: "transcriber worker".to_string(),
        })
    }
}

pub fn two_segments() -> Vec<TranscriptSegment> {
    vec![
        TranscriptSegment::new(0.0, 1.5, "Good morning."),
        TranscriptSegment::new(1.5, 3.0, "Morning!"),
    ]
}

pub fn two_speakers() -> Vec<SpeakerTurn> {
    vec![
        SpeakerTurn::new(0.0, 1.4, "SPEAKER_00"),
        SpeakerTurn::new(1.4, 3.0, "SPEAKER_01"),
    ]
}
