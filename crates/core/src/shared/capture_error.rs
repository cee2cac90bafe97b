use std::path::PathBuf;

use thiserror::Error;

/// Failures surfaced by the capture, normalization and export layers.
///
/// Per-tick conditions (`DetectionFailure`, `InvalidInput`, `OutOfOrder`)
/// are isolated by the sampler and never end a session on their own.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("expected {expected} landmarks, got {actual}")]
    InvalidInput { expected: usize, actual: usize },
    #[error("landmark detection failed: {0}")]
    DetectionFailure(String),
    #[error("nothing to export: no faces were recorded")]
    EmptyLog,
    #[error(
        "observation for frame {frame_index} at {timestamp:.3}s arrived after frame {last_frame_index} at {last_timestamp:.3}s"
    )]
    OutOfOrder {
        frame_index: usize,
        timestamp: f64,
        last_frame_index: usize,
        last_timestamp: f64,
    },
    #[error("frame source unavailable: {0}")]
    SourceUnavailable(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("failed to build spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("capture log JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
