use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::capture::tracking_recorder::TrackingLog;
use crate::shared::capture_error::CaptureError;

/// Serializes a tracking log into a downloadable file.
pub trait TabularExporter {
    /// Encodes `log`. Fails with `EmptyLog` when there is nothing to export.
    fn export(&self, log: &TrackingLog) -> Result<Vec<u8>, CaptureError>;

    /// File extension without the dot, e.g. `xlsx`.
    fn file_extension(&self) -> &str;

    /// Encodes `log` and writes it to `path`, replacing any existing file.
    /// Nothing is written when encoding fails.
    fn export_to_file(&self, log: &TrackingLog, path: &Path) -> Result<(), CaptureError> {
        let bytes = self.export(log)?;
        std::fs::write(path, bytes).map_err(|source| CaptureError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Exported {} observations to {}", log.len(), path.display());
        Ok(())
    }
}

/// Spreadsheet row layout.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExportLayout {
    /// `Frame, Timestamp, Landmarks`: one row per observation.
    #[default]
    PerObservation,
    /// `index, x, y, time`: one row per landmark.
    PerLandmark,
}

impl ExportLayout {
    pub fn as_str(self) -> &'static str {
        match self {
            ExportLayout::PerObservation => "per-observation",
            ExportLayout::PerLandmark => "per-landmark",
        }
    }
}

impl fmt::Display for ExportLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportLayout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "per-observation" => Ok(ExportLayout::PerObservation),
            "per-landmark" => Ok(ExportLayout::PerLandmark),
            other => Err(format!(
                "unknown layout '{other}' (expected per-observation or per-landmark)"
            )),
        }
    }
}
