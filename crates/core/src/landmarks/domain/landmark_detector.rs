use crate::shared::frame::Frame;
use crate::shared::point::Point2D;

/// Domain interface for facial landmark detection.
///
/// Returns one raw point sequence per detected face, in detector order.
/// Sequences are not validated here: the capture layer drops any face whose
/// point count is not 68. Implementations may be stateful, hence `&mut self`.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Vec<Point2D>>, Box<dyn std::error::Error>>;
}
