use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use landmark_capture_core::export::domain::tabular_exporter::ExportLayout;
use landmark_capture_core::shared::constants::{DEFAULT_CONFIDENCE, DEFAULT_SAMPLE_INTERVAL_MS};

/// Defaults remembered between runs. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub interval_ms: u64,
    pub confidence: f64,
    pub layout: ExportLayout,
    /// Store captured landmarks in the canonical frame.
    pub normalize: bool,
    pub face_model: Option<PathBuf>,
    pub landmark_model: Option<PathBuf>,
    pub whisper_model: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SAMPLE_INTERVAL_MS,
            confidence: DEFAULT_CONFIDENCE,
            layout: ExportLayout::default(),
            normalize: true,
            face_model: None,
            landmark_model: None,
            whisper_model: None,
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("Landmark Capture").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files fall back to the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("No configuration directory on this platform")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("absent.json"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            interval_ms: 250,
            confidence: 0.6,
            layout: ExportLayout::PerLandmark,
            normalize: false,
            face_model: Some(PathBuf::from("/models/faces.onnx")),
            landmark_model: Some(PathBuf::from("/models/landmarks.onnx")),
            whisper_model: None,
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "layout": "per-landmark" }"#).unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.layout, ExportLayout::PerLandmark);
        assert_eq!(settings.interval_ms, DEFAULT_SAMPLE_INTERVAL_MS);
        assert!(settings.normalize);
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
