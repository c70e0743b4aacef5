use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::shared::constants::WHISPER_SAMPLE_RATE;

/// The format both engines consume: mono, 16 kHz, signed 16-bit PCM.
pub fn canonical_spec() -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate: WHISPER_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// True when `path` is a WAV file already in [`canonical_spec`] format.
pub fn is_canonical(path: &Path) -> bool {
    let is_wav = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false);
    if !is_wav {
        return false;
    }
    match WavReader::open(path) {
        Ok(reader) => reader.spec() == canonical_spec(),
        Err(_) => false,
    }
}

/// Read a WAV file, averaging channels down to mono.
pub fn read_wav(path: &Path) -> Result<AudioSegment, hound::Error> {
    let mut reader = WavReader::open(path)?;
    let spec = reader.spec();

    let interleaved: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader.samples::<f32>().collect::<Result<_, _>>()?,
        (SampleFormat::Int, bits) => {
            let scale = (1i64 << (bits - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let samples = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
            .collect()
    };

    Ok(AudioSegment::new(samples, spec.sample_rate))
}

/// Write `audio` as canonical 16-bit mono PCM.
pub fn write_wav(path: &Path, audio: &AudioSegment) -> Result<(), hound::Error> {
    let spec = WavSpec {
        sample_rate: audio.sample_rate(),
        ..canonical_spec()
    };
    let mut writer = WavWriter::create(path, spec)?;
    for sample in audio.to_i16() {
        writer.write_sample(sample)?;
    }
    writer.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tempfile::TempDir;

    #[test]
    fn test_written_file_is_canonical_and_reads_back() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("tone.wav");
        let audio = AudioSegment::new(vec![0.0, 0.5, -0.5, 0.25], WHISPER_SAMPLE_RATE);

        write_wav(&path, &audio).unwrap();
        assert!(is_canonical(&path));

        let read = read_wav(&path).unwrap();
        assert_eq!(read.sample_rate(), WHISPER_SAMPLE_RATE);
        assert_eq!(read.samples().len(), 4);
        assert_relative_eq!(read.samples()[1], 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_stereo_is_not_canonical_and_downmixes() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("stereo.wav");
        let spec = WavSpec {
            channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for _ in 0..10 {
            writer.write_sample(16384i16).unwrap();
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();

        assert!(!is_canonical(&path));
        let read = read_wav(&path).unwrap();
        assert_eq!(read.samples().len(), 10);
        assert_relative_eq!(read.samples()[0], 0.25, epsilon = 1e-3);
    }

    #[test]
    fn test_non_wav_extension_is_not_canonical() {
        assert!(!is_canonical(Path::new("/tmp/audio.mp3")));
    }

    #[test]
    fn test_missing_wav_is_not_canonical() {
        assert!(!is_canonical(Path::new("/nonexistent/audio.wav")));
    }
}
