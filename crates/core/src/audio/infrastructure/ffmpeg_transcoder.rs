use std::path::{Path, PathBuf};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::transcoder::{TranscodeError, TranscodedAudio, Transcoder};
use crate::audio::infrastructure::wav_file;
use crate::shared::constants::WHISPER_SAMPLE_RATE;

/// Decodes any ffmpeg-readable audio, resamples it to mono 16 kHz and writes
/// a scratch WAV. Canonical WAV input is passed through untouched.
pub struct FfmpegTranscoder {
    scratch_dir: Option<PathBuf>,
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self { scratch_dir: None }
    }

    /// Write scratch files under `dir` instead of the system temp directory.
    pub fn with_scratch_dir(dir: PathBuf) -> Self {
        Self {
            scratch_dir: Some(dir),
        }
    }

    fn scratch_path(&self, source: &Path) -> Result<PathBuf, TranscodeError> {
        let stem = source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("audio");
        let mut builder = tempfile::Builder::new();
        builder.prefix(stem).suffix(".16k.wav");
        let file = match &self.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| TranscodeError::new(source, format!("cannot create scratch file: {e}")))?;

        file.into_temp_path()
            .keep()
            .map_err(|e| TranscodeError::new(source, format!("cannot keep scratch file: {e}")))
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Transcoder for FfmpegTranscoder {
    fn transcode(&self, path: &Path) -> Result<TranscodedAudio, TranscodeError> {
        if wav_file::is_canonical(path) {
            log::debug!("{} is already mono 16 kHz PCM", path.display());
            return Ok(TranscodedAudio::original(path));
        }

        log::info!("Converting {} to 16 kHz mono WAV", path.display());
        let audio = decode_mono(path, WHISPER_SAMPLE_RATE)
            .map_err(|e| TranscodeError::new(path, e.to_string()))?;

        let wav_path = self.scratch_path(path)?;
        // Owned from here on, so a failed write still cleans up
        let transcoded = TranscodedAudio::temporary(wav_path);
        wav_file::write_wav(transcoded.path(), &audio)
            .map_err(|e| TranscodeError::new(path, e.to_string()))?;

        log::info!(
            "Converted {:.1}s of audio to {}",
            audio.duration(),
            transcoded.path().display()
        );
        Ok(transcoded)
    }
}

fn decode_mono(
    path: &Path,
    target_sample_rate: u32,
) -> Result<AudioSegment, Box<dyn std::error::Error>> {
    ffmpeg_next::init()?;

    let mut ictx = ffmpeg_next::format::input(path)?;

    let audio_stream = ictx
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .ok_or("no audio stream found")?;
    let audio_stream_index = audio_stream.index();

    let codec_ctx =
        ffmpeg_next::codec::context::Context::from_parameters(audio_stream.parameters())?;
    let mut decoder = codec_ctx.decoder().audio()?;

    let mut resampler = ffmpeg_next::software::resampling::Context::get(
        decoder.format(),
        decoder.channel_layout(),
        decoder.rate(),
        ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Planar),
        ffmpeg_next::ChannelLayout::MONO,
        target_sample_rate,
    )?;

    let mut all_samples: Vec<f32> = Vec::new();
    let mut decoded_frame = ffmpeg_next::util::frame::audio::Audio::empty();
    let mut resampled_frame = ffmpeg_next::util::frame::audio::Audio::empty();

    for (stream, packet) in ictx.packets() {
        if stream.index() != audio_stream_index {
            continue;
        }

        decoder.send_packet(&packet)?;
        while decoder.receive_frame(&mut decoded_frame).is_ok() {
            resampler.run(&decoded_frame, &mut resampled_frame)?;
            extract_f32_samples(&resampled_frame, &mut all_samples);
        }
    }

    decoder.send_eof()?;
    while decoder.receive_frame(&mut decoded_frame).is_ok() {
        resampler.run(&decoded_frame, &mut resampled_frame)?;
        extract_f32_samples(&resampled_frame, &mut all_samples);
    }

    // The resampler may still hold buffered samples
    if let Ok(Some(delay)) = resampler.flush(&mut resampled_frame) {
        if delay.output > 0 {
            extract_f32_samples(&resampled_frame, &mut all_samples);
        }
    }

    Ok(AudioSegment::new(all_samples, target_sample_rate))
}

/// Extract f32 samples from a planar mono resampled frame.
fn extract_f32_samples(frame: &ffmpeg_next::util::frame::audio::Audio, out: &mut Vec<f32>) {
    let num_samples = frame.samples();
    if num_samples == 0 {
        return;
    }
    let data = frame.data(0);
    let floats = unsafe { std::slice::from_raw_parts(data.as_ptr() as *const f32, num_samples) };
    out.extend_from_slice(floats);
}
