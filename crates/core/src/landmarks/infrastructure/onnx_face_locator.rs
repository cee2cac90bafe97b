/// YOLO face locator using ONNX Runtime via `ort`.
///
/// Letterboxes the frame, runs the model and reduces the raw candidates to
/// one box per face with greedy NMS. Boxes are in frame pixel coordinates.
use std::path::Path;

use crate::shared::frame::Frame;

use super::onnx_session::load_session;

/// Fallback YOLO model input resolution when the model doesn't specify dimensions.
const DEFAULT_INPUT_SIZE: u32 = 640;

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Axis-aligned face box `[x1, y1, x2, y2]` with its detection score.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FaceBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub confidence: f64,
}

impl FaceBox {
    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }

    fn corners(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Clips the box to a `width` × `height` frame.
    fn clamped(&self, width: u32, height: u32) -> Self {
        let (w, h) = (width as f64, height as f64);
        Self {
            x1: self.x1.clamp(0.0, w),
            y1: self.y1.clamp(0.0, h),
            x2: self.x2.clamp(0.0, w),
            y2: self.y2.clamp(0.0, h),
            confidence: self.confidence,
        }
    }
}

pub struct OnnxFaceLocator {
    session: ort::session::Session,
    confidence: f64,
    input_size: u32,
}

impl OnnxFaceLocator {
    /// Load a YOLO face model. The input resolution is read from the model's
    /// NCHW input shape, falling back to 640 when it is dynamic.
    pub fn new(model_path: &Path, confidence: f64) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| match input.dtype() {
                ort::value::ValueType::Tensor { ref shape, .. }
                    if shape.len() >= 4 && shape[2] > 0 =>
                {
                    Some(shape[2] as u32)
                }
                _ => None,
            })
            .unwrap_or(DEFAULT_INPUT_SIZE);

        Ok(Self {
            session,
            confidence,
            input_size,
        })
    }

    pub fn locate(&mut self, frame: &Frame) -> Result<Vec<FaceBox>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;

        let mut candidates = parse_candidates(data, &shape, self.confidence);
        for candidate in &mut candidates {
            *candidate = unletterbox(candidate, scale, pad_x, pad_y).clamped(frame.width(), frame.height());
        }
        candidates.retain(|b| b.width() > 1.0 && b.height() > 1.0);

        Ok(nms(&mut candidates, NMS_IOU_THRESH))
    }
}

/// Reads `[cx, cy, w, h, conf, ...]` rows above `confidence` from a YOLO
/// output of shape `[1, features, detections]` or `[1, detections, features]`.
/// Boxes stay in letterbox coordinates.
fn parse_candidates(data: &[f32], shape: &[usize], confidence: f64) -> Vec<FaceBox> {
    let transposed = shape[1] < shape[2];
    let (num_dets, num_feats) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if num_feats < 5 {
        return Vec::new();
    }

    let value = |det: usize, feat: usize| -> f64 {
        if transposed {
            data[feat * num_dets + det] as f64
        } else {
            data[det * num_feats + feat] as f64
        }
    };

    (0..num_dets)
        .filter(|&i| value(i, 4) >= confidence)
        .map(|i| {
            let (cx, cy, w, h) = (value(i, 0), value(i, 1), value(i, 2), value(i, 3));
            FaceBox {
                x1: cx - w / 2.0,
                y1: cy - h / 2.0,
                x2: cx + w / 2.0,
                y2: cy + h / 2.0,
                confidence: value(i, 4),
            }
        })
        .collect()
}

fn unletterbox(b: &FaceBox, scale: f64, pad_x: u32, pad_y: u32) -> FaceBox {
    let (px, py) = (pad_x as f64, pad_y as f64);
    FaceBox {
        x1: (b.x1 - px) / scale,
        y1: (b.y1 - py) / scale,
        x2: (b.x2 - px) / scale,
        y2: (b.y2 - py) / scale,
        confidence: b.confidence,
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padding is 114/255 gray, the YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// NMS
// ---------------------------------------------------------------------------

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(boxes: &mut [FaceBox], iou_thresh: f64) -> Vec<FaceBox> {
    boxes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut keep: Vec<FaceBox> = Vec::new();
    for candidate in boxes.iter() {
        let overlaps = keep
            .iter()
            .any(|kept| bbox_iou(&kept.corners(), &candidate.corners()) > iou_thresh);
        if !overlaps {
            keep.push(*candidate);
        }
    }
    keep
}

fn bbox_iou(a: &[f64; 4], b: &[f64; 4]) -> f64 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = a[2].min(b[2]);
    let y2 = a[3].min(b[3]);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    if inter == 0.0 {
        return 0.0;
    }
    let area_a = (a[2] - a[0]) * (a[3] - a[1]);
    let area_b = (b[2] - b[0]) * (b[3] - b[1]);
    inter / (area_a + area_b - inter)
}
