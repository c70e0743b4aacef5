use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use pyannote_rs::{get_segments, EmbeddingExtractor, EmbeddingManager};

use crate::audio::domain::speaker_diarizer::{DiarizationError, SpeakerDiarizer};
use crate::audio::domain::transcript::SpeakerTurn;
use crate::audio::infrastructure::wav_file;
use crate::shared::constants::{
    EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL, HF_TOKEN_ENV, SEGMENTATION_MODEL_NAME,
    SEGMENTATION_MODEL_URL, UNKNOWN_SPEAKER,
};
use crate::shared::lazy_model::LazyModel;
use crate::shared::model_resolver::{self, ModelSource};

/// Everything the diarization engine needs, injected at construction.
#[derive(Clone, Debug)]
pub struct DiarizationConfig {
    /// Hugging Face access token; diarization refuses to run without one.
    pub hf_token: Option<String>,
    pub segmentation_model: ModelSource,
    pub embedding_model: ModelSource,
    pub max_speakers: usize,
    /// Cosine similarity above which an embedding joins an existing speaker.
    pub similarity_threshold: f32,
}

impl DiarizationConfig {
    pub fn new(hf_token: Option<String>) -> Self {
        Self {
            hf_token,
            segmentation_model: ModelSource::new(SEGMENTATION_MODEL_NAME, SEGMENTATION_MODEL_URL),
            embedding_model: ModelSource::new(EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL),
            max_speakers: 10,
            similarity_threshold: 0.5,
        }
    }
}

struct PyannoteEngine {
    segmentation_model: PathBuf,
    extractor: EmbeddingExtractor,
}

impl PyannoteEngine {
    fn load(config: &DiarizationConfig, token: &str) -> Result<Self, DiarizationError> {
        let segmentation_model =
            model_resolver::resolve(&config.segmentation_model, None, Some(token), None)?;
        let embedding_model =
            model_resolver::resolve(&config.embedding_model, None, Some(token), None)?;

        let extractor = EmbeddingExtractor::new(&embedding_model).map_err(|e| {
            DiarizationError::engine(format!("failed to create embedding extractor: {e}"))
        })?;

        Ok(Self {
            segmentation_model,
            extractor,
        })
    }
}

/// Speaker diarization using pyannote-rs (segmentation + speaker embeddings).
///
/// Speakers are clustered per file, so labels (`SPEAKER_00`, `SPEAKER_01`, ...)
/// are only meaningful within one result.
pub struct PyannoteDiarizer {
    config: DiarizationConfig,
    engine: LazyModel<Mutex<PyannoteEngine>>,
}

impl PyannoteDiarizer {
    pub fn new(config: DiarizationConfig) -> Self {
        Self {
            config,
            engine: LazyModel::new("diarization"),
        }
    }
}

impl SpeakerDiarizer for PyannoteDiarizer {
    fn diarize(&self, wav_path: &Path) -> Result<Vec<SpeakerTurn>, DiarizationError> {
        let token = self
            .config
            .hf_token
            .as_deref()
            .ok_or(DiarizationError::MissingCredential(HF_TOKEN_ENV))?;

        let shared = self
            .engine
            .ensure_initialized(|| PyannoteEngine::load(&self.config, token).map(Mutex::new))?;

        let audio = wav_file::read_wav(wav_path)
            .map_err(|e| DiarizationError::audio(wav_path, e.to_string()))?;
        let samples = audio.to_i16();

        log::info!("Running speaker diarization on {:.1}s of audio", audio.duration());
        let mut engine = shared.lock().unwrap_or_else(PoisonError::into_inner);
        let segmentation_model = engine.segmentation_model.clone();

        let segments = get_segments(&samples, audio.sample_rate(), &segmentation_model)
            .map_err(|e| DiarizationError::engine(e.to_string()))?;

        let mut speakers = EmbeddingManager::new(self.config.max_speakers);
        let mut turns = Vec::new();
        for segment in segments {
            let segment = segment.map_err(|e| DiarizationError::engine(e.to_string()))?;

            let embedding: Vec<f32> = match engine.extractor.compute(&segment.samples) {
                Ok(values) => values.collect(),
                Err(e) => {
                    log::warn!(
                        "No speaker embedding for {:.2}s-{:.2}s: {e}",
                        segment.start,
                        segment.end
                    );
                    continue;
                }
            };

            let speaker = speakers
                .search_speaker(embedding, self.config.similarity_threshold)
                .map(|idx| format!("SPEAKER_{idx:02}"))
                .unwrap_or_else(|| UNKNOWN_SPEAKER.to_string());
            turns.push(SpeakerTurn::new(segment.start, segment.end, speaker));
        }

        log::info!("Diarization produced {} speaker turns", turns.len());
        Ok(turns)
    }

    fn reset(&self) {
        self.engine.reset();
    }
}
