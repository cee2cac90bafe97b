//! Append-only session log of face observations.

use std::sync::{Arc, Mutex, PoisonError};

use crate::landmarks::domain::face_observation::FaceObservation;
use crate::shared::capture_error::CaptureError;

/// Immutable view of a session log at one point in time.
///
/// Cloning is cheap: clones share storage with each other and with the
/// recorder until the recorder next appends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingLog {
    observations: Arc<Vec<FaceObservation>>,
}

impl TrackingLog {
    pub fn observations(&self) -> &[FaceObservation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FaceObservation> {
        self.observations.iter()
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// The same log with every observation in canonical coordinates.
    pub fn normalized(&self) -> TrackingLog {
        TrackingLog {
            observations: Arc::new(self.iter().map(FaceObservation::normalized).collect()),
        }
    }
}

impl<'a> IntoIterator for &'a TrackingLog {
    type Item = &'a FaceObservation;
    type IntoIter = std::slice::Iter<'a, FaceObservation>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Cloneable handle to a shared session log.
///
/// One writer appends while any number of holders take snapshots; a
/// snapshot never changes after it is taken.
#[derive(Clone, Debug, Default)]
pub struct TrackingRecorder {
    observations: Arc<Mutex<Arc<Vec<FaceObservation>>>>,
}

impl TrackingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an observation.
    ///
    /// Frame index and timestamp must not go backwards; observations of one
    /// sampled frame share both.
    pub fn record(&self, observation: FaceObservation) -> Result<(), CaptureError> {
        let mut guard = self.lock();
        if let Some(last) = guard.last() {
            if observation.frame_index() < last.frame_index()
                || observation.timestamp() < last.timestamp()
            {
                return Err(CaptureError::OutOfOrder {
                    frame_index: observation.frame_index(),
                    timestamp: observation.timestamp(),
                    last_frame_index: last.frame_index(),
                    last_timestamp: last.timestamp(),
                });
            }
        }
        // Copies the vector only while a snapshot still shares it
        Arc::make_mut(&mut guard).push(observation);
        Ok(())
    }

    pub fn reset(&self) {
        *self.lock() = Arc::new(Vec::new());
    }

    pub fn snapshot(&self) -> TrackingLog {
        TrackingLog {
            observations: Arc::clone(&self.lock()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Arc<Vec<FaceObservation>>> {
        // A panicking writer never leaves the vector half-pushed
        self.observations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl TryFrom<Vec<FaceObservation>> for TrackingLog {
    type Error = CaptureError;

    /// Validates ordering the same way the recorder does.
    fn try_from(observations: Vec<FaceObservation>) -> Result<Self, Self::Error> {
        let recorder = TrackingRecorder::new();
        for observation in observations {
            recorder.record(observation)?;
        }
        Ok(recorder.snapshot())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::landmarks::domain::landmark_set::LandmarkSet;
    use crate::shared::point::Point2D;

    /// A 68-point face offset by `shift`, with a vertical nose bridge.
    pub(crate) fn landmarks(shift: f64) -> LandmarkSet {
        let points: Vec<Point2D> = (0..68)
            .map(|i| Point2D::new(shift + i as f64, shift + 2.0 * i as f64))
            .collect();
        LandmarkSet::try_from(points).unwrap()
    }

    pub(crate) fn observation(timestamp: f64, frame_index: usize) -> FaceObservation {
        FaceObservation::new(timestamp, frame_index, landmarks(frame_index as f64))
    }

    #[test]
    fn test_new_recorder_is_empty() {
        let recorder = TrackingRecorder::new();
        assert!(recorder.is_empty());
        assert!(recorder.snapshot().is_empty());
    }

    #[test]
    fn test_record_preserves_insertion_order() {
        let recorder = TrackingRecorder::new();
        for i in 0..3 {
            recorder.record(observation(i as f64 * 0.1, i)).unwrap();
        }
        let log = recorder.snapshot();
        let indices: Vec<usize> = log.iter().map(FaceObservation::frame_index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_faces_of_one_frame_share_index_and_time() {
        let recorder = TrackingRecorder::new();
        recorder.record(observation(0.1, 1)).unwrap();
        recorder.record(observation(0.1, 1)).unwrap();
        assert_eq!(recorder.len(), 2);
    }

    #[test]
    fn test_record_rejects_earlier_frame() {
        let recorder = TrackingRecorder::new();
        recorder.record(observation(0.2, 2)).unwrap();
        let err = recorder.record(observation(0.3, 1)).unwrap_err();
        assert!(matches!(
            err,
            CaptureError::OutOfOrder {
                frame_index: 1,
                last_frame_index: 2,
                ..
            }
        ));
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_record_rejects_earlier_timestamp() {
        let recorder = TrackingRecorder::new();
        recorder.record(observation(0.5, 2)).unwrap();
        assert!(recorder.record(observation(0.4, 3)).is_err());
    }

    #[test]
    fn test_snapshot_unaffected_by_later_records() {
        let recorder = TrackingRecorder::new();
        recorder.record(observation(0.0, 0)).unwrap();
        let before = recorder.snapshot();

        recorder.record(observation(0.1, 1)).unwrap();
        recorder.record(observation(0.2, 2)).unwrap();

        assert_eq!(before.len(), 1);
        assert_eq!(recorder.snapshot().len(), 3);
    }

    #[test]
    fn test_snapshot_unaffected_by_reset() {
        let recorder = TrackingRecorder::new();
        recorder.record(observation(0.0, 0)).unwrap();
        let before = recorder.snapshot();
        recorder.reset();
        assert_eq!(before.len(), 1);
        assert!(recorder.is_empty());
    }

    #[test]
    fn test_reset_allows_restarting_from_zero() {
        let recorder = TrackingRecorder::new();
        recorder.record(observation(5.0, 50)).unwrap();
        recorder.reset();
        recorder.record(observation(0.0, 0)).unwrap();
        assert_eq!(recorder.len(), 1);
    }

    #[test]
    fn test_clones_share_the_log() {
        let recorder = TrackingRecorder::new();
        let exporter_handle = recorder.clone();
        recorder.record(observation(0.0, 0)).unwrap();
        assert_eq!(exporter_handle.snapshot().len(), 1);
    }

    #[test]
    fn test_snapshot_from_another_thread_while_recording() {
        let recorder = TrackingRecorder::new();
        let reader = recorder.clone();
        let handle = std::thread::spawn(move || {
            (0..50)
                .map(|_| reader.snapshot().len())
                .collect::<Vec<_>>()
        });
        for i in 0..50 {
            recorder.record(observation(i as f64, i)).unwrap();
        }
        let lengths = handle.join().unwrap();
        assert!(lengths.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(recorder.len(), 50);
    }

    #[test]
    fn test_normalized_log_keeps_timing() {
        let recorder = TrackingRecorder::new();
        recorder.record(observation(0.5, 4)).unwrap();
        let normalized = recorder.snapshot().normalized();
        let obs = &normalized.observations()[0];
        assert_eq!(obs.frame_index(), 4);
        assert_eq!(obs.timestamp(), 0.5);
        assert_eq!(obs.landmarks().get(27), Some(Point2D::ORIGIN));
    }

    #[test]
    fn test_try_from_rejects_unordered_observations() {
        let result = TrackingLog::try_from(vec![observation(1.0, 1), observation(0.0, 0)]);
        assert!(matches!(result, Err(CaptureError::OutOfOrder { .. })));
    }
}
