/// Two-stage 68-point landmark detector: a YOLO face locator followed by a
/// landmark regressor run on a square crop around each face.
use std::path::Path;

use image::imageops::{self, FilterType};

use crate::landmarks::domain::landmark_detector::LandmarkDetector;
use crate::shared::constants::LANDMARK_INPUT_SIZE;
use crate::shared::frame::Frame;
use crate::shared::point::Point2D;

use super::onnx_session::load_session;
use super::onnx_face_locator::{FaceBox, OnnxFaceLocator};

/// Extra context around the located box; regressors are trained on crops
/// that include the jaw line and brows.
const CROP_MARGIN: f64 = 0.25;

/// Region of the frame, in whole pixels, fed to the regressor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct CropRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

pub struct OnnxLandmarkDetector {
    locator: OnnxFaceLocator,
    session: ort::session::Session,
}

impl OnnxLandmarkDetector {
    pub fn new(
        locator: OnnxFaceLocator,
        landmark_model_path: &Path,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(landmark_model_path)?;
        Ok(Self { locator, session })
    }

    fn regress(
        &mut self,
        frame: &Frame,
        crop: CropRect,
    ) -> Result<Vec<Point2D>, Box<dyn std::error::Error>> {
        let input_value = ort::value::Tensor::from_array(crop_tensor(frame, crop)?)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Landmark model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let values = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        Ok(map_to_frame(values, crop))
    }
}

impl LandmarkDetector for OnnxLandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Vec<Point2D>>, Box<dyn std::error::Error>> {
        let faces = self.locator.locate(frame)?;
        let mut results = Vec::with_capacity(faces.len());
        for face in &faces {
            let Some(crop) = square_crop(face, frame.width(), frame.height()) else {
                continue;
            };
            results.push(self.regress(frame, crop)?);
        }
        Ok(results)
    }
}

/// Square around the box center, enlarged by `CROP_MARGIN` and clipped to
/// the frame. `None` when nothing of it lies inside the frame.
fn square_crop(face: &FaceBox, frame_width: u32, frame_height: u32) -> Option<CropRect> {
    let side = face.width().max(face.height()) * (1.0 + CROP_MARGIN);
    let cx = (face.x1 + face.x2) / 2.0;
    let cy = (face.y1 + face.y2) / 2.0;

    let x1 = (cx - side / 2.0).max(0.0).floor() as u32;
    let y1 = (cy - side / 2.0).max(0.0).floor() as u32;
    let x2 = ((cx + side / 2.0).ceil().max(0.0) as u32).min(frame_width);
    let y2 = ((cy + side / 2.0).ceil().max(0.0) as u32).min(frame_height);

    if x2 <= x1 || y2 <= y1 {
        return None;
    }
    Some(CropRect {
        x: x1,
        y: y1,
        width: x2 - x1,
        height: y2 - y1,
    })
}

/// Crops and resizes to `LANDMARK_INPUT_SIZE` square, as NCHW floats in [0, 1].
fn crop_tensor(
    frame: &Frame,
    crop: CropRect,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    let image = frame
        .as_rgb_image()
        .ok_or("Frame is not a packed RGB buffer")?;
    let patch = imageops::crop_imm(&image, crop.x, crop.y, crop.width, crop.height).to_image();
    let resized = imageops::resize(
        &patch,
        LANDMARK_INPUT_SIZE,
        LANDMARK_INPUT_SIZE,
        FilterType::Triangle,
    );

    let size = LANDMARK_INPUT_SIZE as usize;
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    Ok(tensor)
}

/// Maps regressor output (`x, y` pairs relative to the crop, in [0, 1]) to
/// frame pixels. A trailing unpaired value is ignored.
fn map_to_frame(values: &[f32], crop: CropRect) -> Vec<Point2D> {
    values
        .chunks_exact(2)
        .map(|pair| {
            Point2D::new(
                crop.x as f64 + pair[0] as f64 * crop.width as f64,
                crop.y as f64 + pair[1] as f64 * crop.height as f64,
            )
        })
        .collect()
}
