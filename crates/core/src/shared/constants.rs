/// YOLO-pose face detector; no bundled download, must be supplied or cached.
pub const FACE_MODEL_NAME: &str = "yolo11n-pose_widerface.onnx";

/// 68-point regressor; no public download, must be supplied or cached.
pub const LANDMARK_MODEL_NAME: &str = "face_landmarks_68.onnx";
/// Side of the square face crop fed to the landmark regressor.
pub const LANDMARK_INPUT_SIZE: u32 = 112;
pub const DEFAULT_CONFIDENCE: f64 = 0.25;

/// Points per face in the 68-point annotation scheme.
pub const LANDMARK_COUNT: usize = 68;

/// Nose-bridge anchors used to define the canonical frame.
pub const NOSE_BRIDGE_TOP: usize = 27;
pub const NOSE_BRIDGE_BOTTOM: usize = 28;

/// Below this reference distance the scale step is skipped.
pub const DEGENERATE_DISTANCE_EPSILON: f64 = 1e-6;

pub const DEFAULT_SAMPLE_INTERVAL_MS: u64 = 100;

pub const DEFAULT_EXPORT_FILENAME: &str = "landmarks_data.xlsx";
pub const DEFAULT_SURVEY_FILENAME: &str = "survey_scores.xlsx";
pub const OBSERVATION_SHEET_NAME: &str = "Facial Data";
pub const LANDMARK_SHEET_NAME: &str = "Landmarks";
pub const SURVEY_SHEET_NAME: &str = "Survey Scores";

pub const QUESTION_COUNT: usize = 14;

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

pub const WHISPER_MODEL_FILENAME: &str = "ggml-tiny.en.bin";
pub const WHISPER_SAMPLE_RATE: u32 = 16000;
pub const WHISPER_MODEL_URL: &str =
    "https://huggingface.co/ggerganov/whisper.cpp/resolve/main/ggml-tiny.en.bin";

/// Answer recordings whose loudest sample stays below this are treated as
/// unanswered without running recognition.
pub const SILENT_ANSWER_PEAK: f32 = 0.01;
