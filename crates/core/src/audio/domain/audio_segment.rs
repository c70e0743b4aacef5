/// Decoded mono audio: PCM samples normalized to [-1.0, 1.0].
#[derive(Clone, Debug)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// 16-bit PCM, clamped, as written to WAV files and fed to the diarizer.
    pub fn to_i16(&self) -> Vec<i16> {
        self.samples
            .iter()
            .map(|&s| (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let seg = AudioSegment::new(vec![0.0; 48000], 16000);
        assert_eq!(seg.duration(), 3.0);
    }

    #[test]
    fn test_i16_conversion_clamps() {
        let seg = AudioSegment::new(vec![0.0, 1.0, -1.0, 2.0, -2.0], 16000);
        assert_eq!(seg.to_i16(), vec![0, i16::MAX, -i16::MAX, i16::MAX, i16::MIN]);
    }
}
