use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;

/// Reads frames from a video or image file in decode order.
///
/// Implementations handle I/O details (codec, container format, etc.)
/// while playback works with the abstract `Frame` and `VideoMetadata`
/// types. Each returned frame carries its presentation timestamp.
pub trait VideoReader: Send {
    /// Opens a video or image file and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Decodes the next frame, or returns `None` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Releases any resources held by the reader.
    fn close(&mut self);
}
