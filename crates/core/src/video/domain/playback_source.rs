use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Ended,
}

/// A live frame source with a playback position, such as a video being
/// played back in real time or a webcam stream.
///
/// The sampler only pulls from a source while it reports `Playing`.
pub trait PlaybackSource {
    /// The frame at the current playback position, or `None` when no frame
    /// is available yet.
    fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>>;

    /// Playback position in seconds, monotonic within a session.
    fn current_time(&self) -> f64;

    fn state(&self) -> PlaybackState;
}
