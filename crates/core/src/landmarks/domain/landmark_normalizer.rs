//! Canonical-frame normalization of 68-point landmark sets.
//!
//! The transform is applied in a fixed order: translate so the nose-bridge
//! top sits at the origin, scale so the nose bridge has unit length, then
//! rotate so the nose bridge points along +x. Rotation uses the already
//! translated and scaled anchor.
//!
//! Sets with coordinates beyond `MAX_SAFE_MAGNITUDE` are first shrunk by a
//! power of two, which is exact, so no intermediate step overflows.

use crate::landmarks::domain::landmark_set::LandmarkSet;
use crate::shared::capture_error::CaptureError;
use crate::shared::constants::{DEGENERATE_DISTANCE_EPSILON, NOSE_BRIDGE_BOTTOM, NOSE_BRIDGE_TOP};
use crate::shared::point::Point2D;

/// Largest coordinate magnitude transformed as-is.
const MAX_SAFE_MAGNITUDE: f64 = 1e150;

/// Validates `landmarks` as a 68-point set and returns it in the canonical frame.
pub fn normalize(landmarks: &[Point2D]) -> Result<LandmarkSet, CaptureError> {
    Ok(LandmarkSet::try_from(landmarks)?.normalized())
}

/// Applies the canonical transform. Callers guarantee a full 68-point set.
pub(crate) fn canonicalize(points: &[Point2D]) -> Vec<Point2D> {
    let prescale = prescale_factor(points);
    let origin = points[NOSE_BRIDGE_TOP].scaled(prescale);
    let translated: Vec<Point2D> = points
        .iter()
        .map(|p| p.scaled(prescale) - origin)
        .collect();

    let reference_distance = translated[NOSE_BRIDGE_BOTTOM].norm();
    let scale = if reference_distance > DEGENERATE_DISTANCE_EPSILON {
        1.0 / reference_distance
    } else {
        log::debug!(
            "Nose-bridge anchors coincide (distance {reference_distance:e}), skipping scale step"
        );
        1.0
    };
    let scaled: Vec<Point2D> = translated.iter().map(|p| p.scaled(scale)).collect();

    let theta = scaled[NOSE_BRIDGE_BOTTOM].angle();
    scaled.iter().map(|p| p.rotated(-theta)).collect()
}

/// 1, or the power of two that brings the largest coordinate under
/// `MAX_SAFE_MAGNITUDE`.
fn prescale_factor(points: &[Point2D]) -> f64 {
    let largest = points
        .iter()
        .flat_map(|p| [p.x.abs(), p.y.abs()])
        .filter(|v| v.is_finite())
        .fold(0.0, f64::max);
    if largest <= MAX_SAFE_MAGNITUDE {
        return 1.0;
    }
    let exponent = (largest / MAX_SAFE_MAGNITUDE).log2().ceil() as i32;
    log::debug!("Landmark coordinates up to {largest:e}, prescaling by 2^-{exponent}");
    2f64.powi(-exponent)
}
