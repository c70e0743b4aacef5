pub mod ffmpeg_duration_probe;
pub mod ffmpeg_transcoder;
pub mod pyannote_diarizer;
pub mod retrying_diarizer;
pub mod wav_file;
pub mod whisper_recognizer;
