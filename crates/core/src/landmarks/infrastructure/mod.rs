pub mod onnx_face_locator;
pub mod onnx_landmark_detector;
pub mod onnx_session;
