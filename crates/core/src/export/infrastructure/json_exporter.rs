use std::path::Path;

use crate::capture::tracking_recorder::TrackingLog;
use crate::export::domain::tabular_exporter::TabularExporter;
use crate::landmarks::domain::face_observation::FaceObservation;
use crate::shared::capture_error::CaptureError;

/// Pretty-printed JSON array of observations:
/// `[{"timestamp": .., "frame_index": .., "landmarks": [{"x": .., "y": ..}, ..]}, ..]`.
///
/// Unlike the spreadsheet this keeps full precision, so a capture can be
/// re-exported later (e.g. normalized) with [`load_log`].
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonExporter;

impl TabularExporter for JsonExporter {
    fn export(&self, log: &TrackingLog) -> Result<Vec<u8>, CaptureError> {
        if log.is_empty() {
            return Err(CaptureError::EmptyLog);
        }
        Ok(serde_json::to_vec_pretty(log.observations())?)
    }

    fn file_extension(&self) -> &str {
        "json"
    }
}

/// Reads a log written by [`JsonExporter`]. Every observation must have 68
/// points and the log must be in capture order.
pub fn load_log(path: &Path) -> Result<TrackingLog, CaptureError> {
    let bytes = std::fs::read(path).map_err(|source| CaptureError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let observations: Vec<FaceObservation> = serde_json::from_slice(&bytes)?;
    log::debug!("Loaded {} observations from {}", observations.len(), path.display());
    TrackingLog::try_from(observations)
}
