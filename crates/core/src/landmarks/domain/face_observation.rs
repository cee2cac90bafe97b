use serde::{Deserialize, Serialize};

use crate::landmarks::domain::landmark_set::LandmarkSet;

/// One face's landmarks captured at one sampled frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceObservation {
    /// Source playback position in seconds.
    timestamp: f64,
    /// Index of the sampled tick that produced this observation.
    frame_index: usize,
    landmarks: LandmarkSet,
}

impl FaceObservation {
    pub fn new(timestamp: f64, frame_index: usize, landmarks: LandmarkSet) -> Self {
        Self {
            timestamp,
            frame_index,
            landmarks,
        }
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn landmarks(&self) -> &LandmarkSet {
        &self.landmarks
    }

    /// Same timing, landmarks in the canonical frame.
    pub fn normalized(&self) -> FaceObservation {
        Self {
            landmarks: self.landmarks.normalized(),
            ..self.clone()
        }
    }
}
