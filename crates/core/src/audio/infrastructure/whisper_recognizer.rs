use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::speech_recognizer::{Recognition, RecognitionError, SpeechRecognizer};
use crate::audio::domain::transcript::TranscriptSegment;
use crate::audio::infrastructure::wav_file;
use crate::shared::constants::WHISPER_SAMPLE_RATE;
use crate::shared::lazy_model::LazyModel;
use crate::shared::model_resolver::{self, ModelSource};

/// Where the ggml model file comes from.
#[derive(Clone, Debug)]
pub enum WhisperModel {
    /// An explicit file on disk.
    Path(PathBuf),
    /// Resolved from the model cache, downloading on first use.
    Resolved(ModelSource),
}

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// The whisper context is loaded on the first call and shared by every
/// later call, including concurrent ones.
pub struct WhisperRecognizer {
    model: WhisperModel,
    threads: usize,
    context: LazyModel<WhisperContext>,
}

impl WhisperRecognizer {
    pub fn new(model: WhisperModel, threads: usize) -> Self {
        Self {
            model,
            threads: threads.max(1),
            context: LazyModel::new("whisper"),
        }
    }

    /// Resolve the model file and load it. Called at most once per process
    /// unless the load fails.
    fn load_context(&self) -> Result<WhisperContext, RecognitionError> {
        let model_path = match &self.model {
            WhisperModel::Path(path) => {
                if !path.exists() {
                    return Err(RecognitionError::new(format!(
                        "Whisper model not found at: {}",
                        path.display()
                    )));
                }
                path.clone()
            }
            WhisperModel::Resolved(source) => model_resolver::resolve(source, None, None, None)
                .map_err(|e| RecognitionError::new(e.to_string()))?,
        };

        log::info!("Loading Whisper model from {} on {}", model_path.display(), compute_device());
        WhisperContext::new_with_params(
            model_path.to_str().ok_or_else(|| RecognitionError::new("invalid model path"))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| RecognitionError::new(format!("failed to load Whisper model: {e}")))
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn recognize(
        &self,
        wav_path: &Path,
        language: Option<&str>,
    ) -> Result<Recognition, RecognitionError> {
        let ctx = self.context.ensure_initialized(|| self.load_context())?;

        let audio = wav_file::read_wav(wav_path).map_err(|e| {
            RecognitionError::new(format!("cannot read {}: {e}", wav_path.display()))
        })?;
        if audio.sample_rate() != WHISPER_SAMPLE_RATE {
            return Err(RecognitionError::new(format!(
                "expected {WHISPER_SAMPLE_RATE} Hz input, got {} Hz",
                audio.sample_rate()
            )));
        }

        let mut state = ctx
            .create_state()
            .map_err(|e| RecognitionError::new(format!("failed to create Whisper state: {e}")))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language.unwrap_or("auto")));
        params.set_translate(false);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(self.threads as i32);

        log::info!("Transcribing {} ({:.1}s)", wav_path.display(), audio.duration());
        state
            .full(params, audio.samples())
            .map_err(|e| RecognitionError::new(format!("Whisper inference failed: {e}")))?;

        let mut segments = Vec::new();
        for seg_idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };
            let text = match segment.to_str_lossy() {
                Ok(text) => text.into_owned(),
                Err(e) => {
                    log::warn!("Skipping undecodable segment {seg_idx}: {e}");
                    continue;
                }
            };
            // Segment timestamps are in centiseconds (10ms units)
            segments.push(TranscriptSegment::new(
                segment.start_timestamp() as f64 / 100.0,
                segment.end_timestamp() as f64 / 100.0,
                text,
            ));
        }

        let detected = state
            .full_lang_id_from_state()
            .ok()
            .and_then(whisper_rs::get_lang_str)
            .map(str::to_string);
        let language = detected
            .or_else(|| language.map(str::to_string))
            .unwrap_or_else(|| "unknown".to_string());

        log::info!("Recognized {} segments, language {language}", segments.len());
        Ok(Recognition { segments, language })
    }
}

/// Human-readable name of the device whisper runs on in this build.
pub fn compute_device() -> &'static str {
    if cfg!(feature = "cuda") {
        "GPU (CUDA)"
    } else {
        "CPU"
    }
}
