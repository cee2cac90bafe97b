pub mod face_observation;
pub mod landmark_detector;
pub mod landmark_normalizer;
pub mod landmark_set;
