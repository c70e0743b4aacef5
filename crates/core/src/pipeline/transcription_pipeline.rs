use std::sync::Arc;
use std::time::Instant;

use crate::audio::domain::duration_probe::AudioDuration;
use crate::audio::domain::speaker_diarizer::SpeakerDiarizer;
use crate::audio::domain::speech_recognizer::{Recognition, SpeechRecognizer};
use crate::audio::domain::transcoder::Transcoder;
use crate::audio::domain::transcript::{speaker_count, SpeakerTurn};
use crate::job::domain::transcription_request::TranscriptionRequest;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::pipeline::result_formatter::{
    format_diarized, format_plain, format_result, ResultHeader,
};
use crate::shared::error::TranscribeError;

/// Result of one pipeline run, before the header is added.
#[derive(Clone, Debug)]
pub struct TranscriptionOutput {
    pub recognition: Recognition,
    /// `None` when diarization was not requested.
    pub turns: Option<Vec<SpeakerTurn>>,
    pub body: String,
}

impl TranscriptionOutput {
    pub fn speaker_count(&self) -> Option<usize> {
        self.turns.as_deref().map(speaker_count)
    }

    /// Full result text: header, then body.
    pub fn render(
        &self,
        request: &TranscriptionRequest,
        duration: AudioDuration,
        completed_at: &str,
    ) -> String {
        let header = ResultHeader {
            file_name: request.file_name(),
            duration,
            language: self.recognition.language.clone(),
            diarization: request.diarization,
            speaker_count: self.speaker_count(),
            completed_at: completed_at.to_string(),
        };
        format_result(&header, &self.body)
    }
}

/// Transcode, recognize, optionally diarize, then format. Shared by the
/// inline path and the detached worker.
///
/// Stages run strictly in sequence and the first failure aborts the run.
/// The transcoded scratch file is removed when the run ends either way.
pub struct TranscriptionPipeline {
    transcoder: Arc<dyn Transcoder>,
    recognizer: Arc<dyn SpeechRecognizer>,
    diarizer: Arc<dyn SpeakerDiarizer>,
}

impl TranscriptionPipeline {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        recognizer: Arc<dyn SpeechRecognizer>,
        diarizer: Arc<dyn SpeakerDiarizer>,
    ) -> Self {
        Self {
            transcoder,
            recognizer,
            diarizer,
        }
    }

    pub fn run(
        &self,
        request: &TranscriptionRequest,
        logger: &mut dyn PipelineLogger,
    ) -> Result<TranscriptionOutput, TranscribeError> {
        let start = Instant::now();
        let wav = self.transcoder.transcode(&request.audio_path)?;
        logger.timing("transcode", elapsed_ms(start));

        let start = Instant::now();
        let recognition = self.recognizer.recognize(wav.path(), request.language_hint())?;
        logger.timing("recognize", elapsed_ms(start));
        logger.metric("segments", recognition.segments.len() as f64);
        logger.info(&format!(
            "Recognized {} segments (language: {})",
            recognition.segments.len(),
            recognition.language
        ));

        let turns = if request.diarization {
            let start = Instant::now();
            let turns = self.diarizer.diarize(wav.path())?;
            logger.timing("diarize", elapsed_ms(start));
            logger.metric("speakers", speaker_count(&turns) as f64);
            logger.info(&format!(
                "Found {} speakers in {} turns",
                speaker_count(&turns),
                turns.len()
            ));
            Some(turns)
        } else {
            None
        };

        let start = Instant::now();
        let body = match &turns {
            Some(turns) => format_diarized(&recognition.segments, turns),
            None => format_plain(&recognition.segments),
        };
        logger.timing("format", elapsed_ms(start));

        Ok(TranscriptionOutput {
            recognition,
            turns,
            body,
        })
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::pipeline_logger::{LogPipelineLogger, NullPipelineLogger};
    use crate::pipeline::test_stubs::*;
    use crate::shared::constants::RESULT_BANNER;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;

    struct Fixture {
        _tmp: TempDir,
        transcoder: Arc<StubTranscoder>,
        recognizer: Arc<StubRecognizer>,
        diarizer: Arc<StubDiarizer>,
        request: TranscriptionRequest,
    }

    impl Fixture {
        fn new(recognizer: StubRecognizer, diarizer: StubDiarizer, diarization: bool) -> Self {
            let tmp = TempDir::new().unwrap();
            let audio = tmp.path().join("talk.mp3");
            std::fs::write(&audio, b"ID3").unwrap();
            Self {
                transcoder: Arc::new(StubTranscoder::new(tmp.path())),
                recognizer: Arc::new(recognizer),
                diarizer: Arc::new(diarizer),
                request: TranscriptionRequest::new(audio, Some("en".to_string()), diarization),
                _tmp: tmp,
            }
        }

        fn pipeline(&self) -> TranscriptionPipeline {
            TranscriptionPipeline::new(
                self.transcoder.clone(),
                self.recognizer.clone(),
                self.diarizer.clone(),
            )
        }

        fn scratch_file(&self) -> std::path::PathBuf {
            self.transcoder.last_output.lock().unwrap().clone().unwrap()
        }
    }

    #[test]
    fn test_plain_run_skips_diarizer() {
        let fx = Fixture::new(
            StubRecognizer::ok(two_segments()),
            StubDiarizer::new(two_speakers()),
            false,
        );
        let output = fx.pipeline().run(&fx.request, &mut NullPipelineLogger).unwrap();

        assert_eq!(fx.diarizer.calls.load(Ordering::SeqCst), 0);
        assert!(output.turns.is_none());
        assert_eq!(output.speaker_count(), None);
        assert_eq!(output.body.lines().count(), 2);
        assert!(!output.body.contains("Speaker"));
    }

    #[test]
    fn test_diarized_run_labels_segments() {
        let fx = Fixture::new(
            StubRecognizer::ok(two_segments()),
            StubDiarizer::new(two_speakers()),
            true,
        );
        let output = fx.pipeline().run(&fx.request, &mut NullPipelineLogger).unwrap();

        assert_eq!(output.speaker_count(), Some(2));
        assert!(output.body.contains("[Speaker SPEAKER_00]"));
        assert!(output.body.contains("[Speaker SPEAKER_01]"));
    }

    #[test]
    fn test_language_hint_reaches_recognizer() {
        let fx = Fixture::new(StubRecognizer::ok(vec![]), StubDiarizer::new(vec![]), false);
        fx.pipeline().run(&fx.request, &mut NullPipelineLogger).unwrap();
        assert_eq!(
            *fx.recognizer.languages.lock().unwrap(),
            vec![Some("en".to_string())]
        );
    }

    #[test]
    fn test_scratch_file_removed_after_success() {
        let fx = Fixture::new(StubRecognizer::ok(two_segments()), StubDiarizer::new(vec![]), false);
        fx.pipeline().run(&fx.request, &mut NullPipelineLogger).unwrap();
        assert!(!fx.scratch_file().exists());
    }

    #[test]
    fn test_scratch_file_removed_after_failure() {
        let fx = Fixture::new(
            StubRecognizer::failing("model missing"),
            StubDiarizer::new(vec![]),
            false,
        );
        let err = fx
            .pipeline()
            .run(&fx.request, &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, TranscribeError::Recognition(_)));
        assert!(!fx.scratch_file().exists());
    }

    #[test]
    fn test_missing_credential_surfaces_as_config_error() {
        let fx = Fixture::new(
            StubRecognizer::ok(two_segments()),
            StubDiarizer::without_credential(),
            true,
        );
        let err = fx
            .pipeline()
            .run(&fx.request, &mut NullPipelineLogger)
            .unwrap_err();
        assert!(matches!(err, TranscribeError::DiarizationConfig(_)));
    }

    #[test]
    fn test_stage_timings_recorded() {
        let fx = Fixture::new(
            StubRecognizer::ok(two_segments()),
            StubDiarizer::new(two_speakers()),
            true,
        );
        let mut logger = LogPipelineLogger::new();
        fx.pipeline().run(&fx.request, &mut logger).unwrap();
        for stage in ["transcode", "recognize", "diarize", "format"] {
            assert!(logger.timing_for(stage).is_some(), "missing {stage}");
        }
        assert_eq!(logger.metric_for("segments"), Some(2.0));
    }

    #[test]
    fn test_render_adds_header() {
        let fx = Fixture::new(
            StubRecognizer::ok(two_segments()),
            StubDiarizer::new(two_speakers()),
            true,
        );
        let output = fx.pipeline().run(&fx.request, &mut NullPipelineLogger).unwrap();
        let text =
            output.render(&fx.request, AudioDuration::from_secs(90.0), "2026-01-01 00:00:00");
        assert!(text.starts_with(RESULT_BANNER));
        assert!(text.contains("Speakers detected: 2"));
        assert!(text.contains("Language: en"));
        assert!(text.ends_with(&format!("{}\n", output.body.trim_end())));
    }
}
