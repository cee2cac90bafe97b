use image::{ImageBuffer, Rgb};
use ndarray::ArrayView3;

/// A single sampled video/image frame: contiguous RGB bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the capture layer
/// treats pixel data as opaque and only reads the presentation timestamp.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    /// Presentation time in seconds from the start of the source.
    timestamp: f64,
}

impl Frame {
    pub fn new(
        data: Vec<u8>,
        width: u32,
        height: u32,
        channels: u8,
        index: usize,
        timestamp: f64,
    ) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    /// Borrowed `image` view for cropping and resizing. `None` unless the
    /// frame is packed 3-channel RGB.
    pub fn as_rgb_image(&self) -> Option<ImageBuffer<Rgb<u8>, &[u8]>> {
        if self.channels != 3 {
            return None;
        }
        ImageBuffer::from_raw(self.width, self.height, self.data.as_slice())
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("Frame data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5, 0.5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.timestamp(), 0.5);
        assert_eq!(frame.data(), &data[..]);
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0, 0.0);
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 24]; // 2x4x3
        let frame = Frame::new(data, 4, 2, 3, 0, 0.0);
        let arr = frame.as_ndarray();
        assert_eq!(arr.shape(), &[2, 4, 3]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_pixel_access() {
        // 2x2 RGB: set pixel (row=1, col=0) to red
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, R
        let frame = Frame::new(data, 2, 2, 3, 0, 0.0);
        let arr = frame.as_ndarray();
        assert_eq!(arr[[1, 0, 0]], 255);
        assert_eq!(arr[[1, 0, 1]], 0);
        assert_eq!(arr[[1, 0, 2]], 0);
    }

    #[test]
    fn test_as_rgb_image_pixel() {
        let mut data = vec![0u8; 12];
        data[3..6].copy_from_slice(&[10, 20, 30]);
        let frame = Frame::new(data, 2, 2, 3, 0, 0.0);
        let image = frame.as_rgb_image().unwrap();
        assert_eq!(image.dimensions(), (2, 2));
        assert_eq!(image.get_pixel(1, 0).0, [10, 20, 30]);
    }

    #[test]
    fn test_as_rgb_image_rejects_other_layouts() {
        let frame = Frame::new(vec![0u8; 8], 2, 1, 4, 0, 0.0);
        assert!(frame.as_rgb_image().is_none());
    }
}
