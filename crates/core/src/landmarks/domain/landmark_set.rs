//! Fixed-size 68-point facial landmark sets.
//!
//! Indices carry anatomical meaning (jaw 0-16, brows 17-26, nose 27-35,
//! eyes 36-47, mouth 48-67), so points are never reordered or filtered.

use serde::{Deserialize, Serialize};

use crate::landmarks::domain::landmark_normalizer;
use crate::shared::capture_error::CaptureError;
use crate::shared::constants::{LANDMARK_COUNT, NOSE_BRIDGE_BOTTOM, NOSE_BRIDGE_TOP};
use crate::shared::point::Point2D;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2D>", into = "Vec<Point2D>")]
pub struct LandmarkSet {
    /// Always exactly `LANDMARK_COUNT` long.
    points: Vec<Point2D>,
}

impl LandmarkSet {
    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    pub fn get(&self, index: usize) -> Option<Point2D> {
        self.points.get(index).copied()
    }

    /// Top and bottom of the nose bridge, the canonical-frame anchors.
    pub fn nose_bridge(&self) -> (Point2D, Point2D) {
        (self.points[NOSE_BRIDGE_TOP], self.points[NOSE_BRIDGE_BOTTOM])
    }

    /// This set expressed in the canonical (translation-, scale- and
    /// rotation-invariant) frame.
    pub fn normalized(&self) -> LandmarkSet {
        LandmarkSet {
            points: landmark_normalizer::canonicalize(&self.points),
        }
    }

    pub fn is_finite(&self) -> bool {
        self.points.iter().all(Point2D::is_finite)
    }
}

impl TryFrom<Vec<Point2D>> for LandmarkSet {
    type Error = CaptureError;

    fn try_from(points: Vec<Point2D>) -> Result<Self, Self::Error> {
        if points.len() != LANDMARK_COUNT {
            return Err(CaptureError::InvalidInput {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        Ok(Self { points })
    }
}

impl TryFrom<&[Point2D]> for LandmarkSet {
    type Error = CaptureError;

    fn try_from(points: &[Point2D]) -> Result<Self, Self::Error> {
        Self::try_from(points.to_vec())
    }
}

impl From<LandmarkSet> for Vec<Point2D> {
    fn from(set: LandmarkSet) -> Self {
        set.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn grid_points(n: usize) -> Vec<Point2D> {
        (0..n)
            .map(|i| Point2D::new((i % 10) as f64 * 10.0, (i / 10) as f64 * 10.0))
            .collect()
    }

    #[test]
    fn test_accepts_exactly_68_points() {
        let set = LandmarkSet::try_from(grid_points(68)).unwrap();
        assert_eq!(set.points().len(), 68);
    }

    #[rstest]
    #[case::empty(0)]
    #[case::five_point_model(5)]
    #[case::one_short(67)]
    #[case::one_extra(69)]
    fn test_rejects_other_counts(#[case] n: usize) {
        let err = LandmarkSet::try_from(grid_points(n)).unwrap_err();
        match err {
            CaptureError::InvalidInput { expected, actual } => {
                assert_eq!(expected, 68);
                assert_eq!(actual, n);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_order_is_preserved() {
        let points = grid_points(68);
        let set = LandmarkSet::try_from(points.clone()).unwrap();
        assert_eq!(set.points(), &points[..]);
        assert_eq!(set.get(27), Some(points[27]));
        assert_eq!(set.get(68), None);
    }

    #[test]
    fn test_nose_bridge() {
        let points = grid_points(68);
        let set = LandmarkSet::try_from(points.clone()).unwrap();
        assert_eq!(set.nose_bridge(), (points[27], points[28]));
    }

    #[test]
    fn test_serde_serializes_as_point_array() {
        let set = LandmarkSet::try_from(grid_points(68)).unwrap();
        let json = serde_json::to_value(&set).unwrap();
        let array = json.as_array().unwrap();
        assert_eq!(array.len(), 68);
        assert_eq!(array[1]["x"], 10.0);
        assert_eq!(array[1]["y"], 0.0);
    }

    #[test]
    fn test_serde_rejects_wrong_count() {
        let json = serde_json::to_string(&grid_points(12)).unwrap();
        let result: Result<LandmarkSet, _> = serde_json::from_str(&json);
        assert!(result.is_err());
    }
}
