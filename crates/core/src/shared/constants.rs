/// Input extensions accepted by `transcribe_audio`, in the order they are listed to callers.
pub const SUPPORTED_FORMATS: &[&str] = &[
    "mp3", "wav", "m4a", "flac", "ogg", "wma", "aac", "opus", "webm", "mp4",
];

/// Inputs up to this length are transcribed inline, within the caller's request timeout.
pub const INLINE_LIMIT_SECS: f64 = 180.0;

/// Hard ceiling on input length, regardless of execution path.
pub const MAX_DURATION_SECS: f64 = 3600.0;

/// Processing time relative to audio length, used for the ETA shown to callers.
pub const DEFAULT_ETA_FACTOR: f64 = 1.2;

pub const DEFAULT_LANGUAGE: &str = "zh";

/// Argument value standing for "no language hint" in the worker's positional contract.
pub const AUTO_LANGUAGE_SENTINEL: &str = "None";

pub const HF_TOKEN_ENV: &str = "HUGGINGFACE_TOKEN";
pub const WHISPER_MODEL_PATH_ENV: &str = "TRANSCRIBER_WHISPER_MODEL_PATH";

pub const WHISPER_SAMPLE_RATE: u32 = 16000;
pub const WHISPER_MODEL_BASE_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

pub const SEGMENTATION_MODEL_NAME: &str = "segmentation-3.0.onnx";
pub const SEGMENTATION_MODEL_URL: &str =
    "https://huggingface.co/onnx-community/pyannote-segmentation-3.0/resolve/main/onnx/model.onnx";

pub const EMBEDDING_MODEL_NAME: &str = "wespeaker_en_voxceleb_CAM++.onnx";
pub const EMBEDDING_MODEL_URL: &str =
    "https://github.com/thewh1teagle/pyannote-rs/releases/download/v0.1.0/wespeaker_en_voxceleb_CAM++.onnx";

/// Label assigned to a transcript segment that no speaker turn covers.
pub const UNKNOWN_SPEAKER: &str = "UNKNOWN";

/// First line of every successful result, inline or on disk.
pub const RESULT_BANNER: &str = "Transcription Result";

/// First line of the output file of a failed detached job.
pub const FAILURE_BANNER: &str = "Transcription failed";

/// Prefix of every error rendering returned to a caller.
pub const ERROR_PREFIX: &str = "Error: ";

/// Local wall-clock format used in headers, markers and status blocks.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
