/// Decoded answer audio: interleaved f32 PCM in [-1.0, 1.0].
#[derive(Clone, Debug)]
pub struct AudioSegment {
    samples: Vec<f32>,
    sample_rate: u32,
    channels: u16,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Length in seconds; zero for a segment without a valid rate.
    pub fn duration(&self) -> f64 {
        let per_second = self.sample_rate as f64 * self.channels as f64;
        if per_second == 0.0 {
            return 0.0;
        }
        self.samples.len() as f64 / per_second
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0, |peak, s| peak.max(s.abs()))
    }

    /// No sample reaches `threshold`. Empty segments are quiet.
    pub fn is_quiet(&self, threshold: f32) -> bool {
        self.peak() < threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_accessors() {
        let seg = AudioSegment::new(vec![0.25; 160], 16000, 1);
        assert_eq!(seg.samples().len(), 160);
        assert_eq!(seg.sample_rate(), 16000);
        assert_eq!(seg.channels(), 1);
    }

    #[rstest]
    #[case::mono(48000, 16000, 1, 3.0)]
    #[case::stereo(96000, 48000, 2, 1.0)]
    #[case::no_rate(100, 0, 1, 0.0)]
    fn test_duration(
        #[case] len: usize,
        #[case] rate: u32,
        #[case] channels: u16,
        #[case] expected: f64,
    ) {
        let seg = AudioSegment::new(vec![0.0; len], rate, channels);
        assert_relative_eq!(seg.duration(), expected);
    }

    #[test]
    fn test_peak_uses_magnitude() {
        let seg = AudioSegment::new(vec![0.1, -0.6, 0.3], 16000, 1);
        assert_relative_eq!(seg.peak(), 0.6);
    }

    #[test]
    fn test_is_quiet() {
        assert!(AudioSegment::new(Vec::new(), 16000, 1).is_quiet(0.01));
        assert!(AudioSegment::new(vec![0.005, -0.002], 16000, 1).is_quiet(0.01));
        assert!(!AudioSegment::new(vec![0.0, -0.2], 16000, 1).is_quiet(0.01));
    }
}
