use std::path::PathBuf;

/// Properties of an opened frame source.
///
/// Still images are represented as a single-frame source with `fps == 0`.
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub codec: String,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    pub fn is_still_image(&self) -> bool {
        self.fps <= 0.0 && self.total_frames <= 1
    }

    /// Playback length in seconds, or `None` when the frame rate is unknown.
    pub fn duration(&self) -> Option<f64> {
        if self.fps > 0.0 {
            Some(self.total_frames as f64 / self.fps)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn video(fps: f64, total_frames: usize) -> VideoMetadata {
        VideoMetadata {
            width: 1280,
            height: 720,
            fps,
            total_frames,
            codec: "h264".to_string(),
            source_path: Some(PathBuf::from("/tmp/interview.mp4")),
        }
    }

    #[test]
    fn test_duration() {
        assert_relative_eq!(video(30.0, 900).duration().unwrap(), 30.0);
    }

    #[test]
    fn test_duration_unknown_without_fps() {
        assert!(video(0.0, 1).duration().is_none());
    }

    #[test]
    fn test_image_metadata_is_still() {
        let meta = VideoMetadata {
            width: 800,
            height: 600,
            fps: 0.0,
            total_frames: 1,
            codec: "png".to_string(),
            source_path: None,
        };
        assert!(meta.is_still_image());
        assert!(!video(24.0, 100).is_still_image());
    }
}
