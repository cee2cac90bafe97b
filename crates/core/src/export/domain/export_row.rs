//! Flattening of a tracking log into spreadsheet rows.

use crate::capture::tracking_recorder::TrackingLog;
use crate::landmarks::domain::face_observation::FaceObservation;
use crate::landmarks::domain::landmark_set::LandmarkSet;

/// One spreadsheet row per observation.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportRow {
    pub frame: usize,
    pub timestamp: f64,
    /// `x,y` pairs joined by `;`, landmark 0 first.
    pub landmarks: String,
}

impl ExportRow {
    pub fn from_observation(observation: &FaceObservation) -> Self {
        Self {
            frame: observation.frame_index(),
            timestamp: observation.timestamp(),
            landmarks: flatten_landmarks(observation.landmarks()),
        }
    }
}

/// One spreadsheet row per landmark, for the minimal layout.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LandmarkPointRow {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub time: f64,
}

pub fn flatten_landmarks(landmarks: &LandmarkSet) -> String {
    landmarks
        .points()
        .iter()
        .map(|p| format!("{},{}", p.x, p.y))
        .collect::<Vec<_>>()
        .join(";")
}

pub fn observation_rows(log: &TrackingLog) -> Vec<ExportRow> {
    log.iter().map(ExportRow::from_observation).collect()
}

pub fn landmark_rows(log: &TrackingLog) -> Vec<LandmarkPointRow> {
    log.iter()
        .flat_map(|observation| {
            observation
                .landmarks()
                .points()
                .iter()
                .enumerate()
                .map(move |(index, p)| LandmarkPointRow {
                    index,
                    x: p.x,
                    y: p.y,
                    time: observation.timestamp(),
                })
        })
        .collect()
}
