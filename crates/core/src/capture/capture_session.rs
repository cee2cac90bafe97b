use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::capture::capture_logger::CaptureLogger;
use crate::capture::frame_sampler::{FrameSampler, SamplerOptions, SamplerReport};
use crate::capture::tracking_recorder::{TrackingLog, TrackingRecorder};
use crate::export::domain::tabular_exporter::TabularExporter;
use crate::landmarks::domain::landmark_detector::LandmarkDetector;
use crate::shared::capture_error::CaptureError;
use crate::video::domain::playback_source::PlaybackSource;

/// One capture session: the log being recorded, the sampler settings and
/// the stop flag shared with whoever may cancel the capture.
///
/// Cancelling is sticky. Once set, the flag stops the running capture and
/// any later `start` until `reset` clears it, so a cancel racing with
/// `start` is never lost.
pub struct CaptureSession {
    sampler: FrameSampler,
    options: SamplerOptions,
    recorder: TrackingRecorder,
    cancelled: Arc<AtomicBool>,
}

impl CaptureSession {
    pub fn new(sampler: FrameSampler, options: SamplerOptions) -> Self {
        Self {
            sampler,
            options,
            recorder: TrackingRecorder::new(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Captures from `source` until it stops or the session is cancelled.
    /// A new capture starts from an empty log.
    pub fn start(
        &self,
        source: &mut dyn PlaybackSource,
        detector: Box<dyn LandmarkDetector>,
        logger: &mut dyn CaptureLogger,
    ) -> Result<SamplerReport, CaptureError> {
        self.recorder.reset();
        self.sampler.run(
            source,
            detector,
            &self.recorder,
            &self.options,
            &self.cancelled,
            logger,
        )
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Flag to hand to another thread that should be able to stop the
    /// running capture.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancelled)
    }

    /// Clears the log and any pending cancel.
    pub fn reset(&self) {
        self.recorder.reset();
        self.cancelled.store(false, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TrackingLog {
        self.recorder.snapshot()
    }

    /// Exports the current log. Returns the number of observations written.
    pub fn export(&self, exporter: &dyn TabularExporter, path: &Path) -> Result<usize, CaptureError> {
        let log = self.snapshot();
        exporter.export_to_file(&log, path)?;
        Ok(log.len())
    }
}
