//! Cancellable periodic sampling of a playback source.
//!
//! Layout: `ticker → main [pull frame] → detector thread → main [record]`.
//! One tick is in flight at a time, so observations are appended in tick
//! order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::capture::capture_logger::CaptureLogger;
use crate::capture::tracking_recorder::TrackingRecorder;
use crate::landmarks::domain::face_observation::FaceObservation;
use crate::landmarks::domain::landmark_detector::LandmarkDetector;
use crate::landmarks::domain::landmark_set::LandmarkSet;
use crate::shared::capture_error::CaptureError;
use crate::shared::constants::DEFAULT_SAMPLE_INTERVAL_MS;
use crate::shared::frame::Frame;
use crate::shared::point::Point2D;
use crate::video::domain::playback_source::{PlaybackSource, PlaybackState};

/// How often a blocked wait re-checks the cancellation flag.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);

type DetectionResult = Result<Vec<Vec<Point2D>>, String>;

#[derive(Clone, Debug, Default)]
pub struct SamplerOptions {
    /// Store landmarks in the canonical frame instead of pixels.
    pub normalize: bool,
    /// Stop after this much wall-clock time.
    pub max_duration: Option<Duration>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Ended,
    Paused,
    Cancelled,
    DurationReached,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SamplerReport {
    /// Ticks that had a frame to sample.
    pub ticks: usize,
    pub observations: usize,
    /// Ticks skipped because the detector failed.
    pub failed_ticks: usize,
    /// Faces discarded for a wrong point count or out-of-order timing.
    pub dropped_faces: usize,
    pub stop_reason: StopReason,
}

impl SamplerReport {
    fn new() -> Self {
        Self {
            ticks: 0,
            observations: 0,
            failed_ticks: 0,
            dropped_faces: 0,
            stop_reason: StopReason::Ended,
        }
    }
}

pub struct FrameSampler {
    interval: Duration,
}

impl FrameSampler {
    pub fn new(interval: Duration) -> Result<Self, CaptureError> {
        if interval.is_zero() {
            return Err(CaptureError::InvalidConfig(
                "sampling interval must be greater than zero".into(),
            ));
        }
        Ok(Self { interval })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Samples `source` until it stops playing, `max_duration` elapses or
    /// `cancelled` is set.
    ///
    /// Detector failures and malformed faces skip a tick or a face; only a
    /// failing source or a dead detector thread end the run with an error.
    pub fn run(
        &self,
        source: &mut dyn PlaybackSource,
        detector: Box<dyn LandmarkDetector>,
        recorder: &TrackingRecorder,
        options: &SamplerOptions,
        cancelled: &Arc<AtomicBool>,
        logger: &mut dyn CaptureLogger,
    ) -> Result<SamplerReport, CaptureError> {
        logger.info(&format!(
            "Sampling every {} ms{}",
            self.interval.as_millis(),
            if options.normalize {
                " (normalized)"
            } else {
                ""
            }
        ));

        let mut link = DetectorLink::spawn(detector);
        let mut report = SamplerReport::new();
        let result = self.sample_loop(
            source,
            &mut link,
            recorder,
            options,
            cancelled,
            logger,
            &mut report,
        );
        link.shutdown();

        let stop_reason = result?;
        report.stop_reason = stop_reason;
        logger.info(&format!(
            "Sampling stopped ({stop_reason:?}): {} ticks, {} observations, {} failed ticks, {} dropped faces",
            report.ticks, report.observations, report.failed_ticks, report.dropped_faces
        ));
        logger.summary();
        Ok(report)
    }

    #[allow(clippy::too_many_arguments)]
    fn sample_loop(
        &self,
        source: &mut dyn PlaybackSource,
        link: &mut DetectorLink,
        recorder: &TrackingRecorder,
        options: &SamplerOptions,
        cancelled: &AtomicBool,
        logger: &mut dyn CaptureLogger,
        report: &mut SamplerReport,
    ) -> Result<StopReason, CaptureError> {
        let ticker = crossbeam_channel::tick(self.interval);
        let started = Instant::now();

        loop {
            if !wait_for_tick(&ticker, cancelled) {
                return Ok(StopReason::Cancelled);
            }
            match source.state() {
                PlaybackState::Playing => {}
                PlaybackState::Paused => return Ok(StopReason::Paused),
                PlaybackState::Ended => return Ok(StopReason::Ended),
            }
            if options
                .max_duration
                .is_some_and(|max| started.elapsed() >= max)
            {
                return Ok(StopReason::DurationReached);
            }

            let frame = match source.current_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::debug!("No frame available yet, skipping tick");
                    continue;
                }
                Err(e) => return Err(CaptureError::SourceUnavailable(e.to_string())),
            };
            let time = source.current_time();
            let frame_index = report.ticks;
            report.ticks += 1;
            logger.tick(report.ticks, time);

            let detect_start = Instant::now();
            let faces = match link.detect(frame, cancelled)? {
                None => return Ok(StopReason::Cancelled),
                Some(Ok(faces)) => faces,
                Some(Err(message)) => {
                    log::warn!("Landmark detection failed at {time:.2}s: {message}");
                    report.failed_ticks += 1;
                    continue;
                }
            };
            logger.timing("detect", detect_start.elapsed().as_secs_f64() * 1000.0);
            logger.metric("faces", faces.len() as f64);

            for points in faces {
                let landmarks = match LandmarkSet::try_from(points) {
                    Ok(set) if options.normalize => set.normalized(),
                    Ok(set) => set,
                    Err(e) => {
                        log::debug!("Dropping face at frame {frame_index}: {e}");
                        report.dropped_faces += 1;
                        continue;
                    }
                };
                match recorder.record(FaceObservation::new(time, frame_index, landmarks)) {
                    Ok(()) => report.observations += 1,
                    Err(e) => {
                        log::warn!("Dropping face: {e}");
                        report.dropped_faces += 1;
                    }
                }
            }
        }
    }
}

impl Default for FrameSampler {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_SAMPLE_INTERVAL_MS),
        }
    }
}

/// Blocks until the next tick; `false` if cancelled while waiting.
fn wait_for_tick(ticker: &Receiver<Instant>, cancelled: &AtomicBool) -> bool {
    loop {
        if cancelled.load(Ordering::Relaxed) {
            return false;
        }
        match ticker.recv_timeout(CANCEL_POLL_INTERVAL) {
            Ok(_) => return !cancelled.load(Ordering::Relaxed),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => return false,
        }
    }
}

/// Runs the detector on its own thread, one frame at a time.
struct DetectorLink {
    frame_tx: Option<Sender<Frame>>,
    result_rx: Receiver<DetectionResult>,
    handle: Option<JoinHandle<()>>,
    in_flight: bool,
}

impl DetectorLink {
    fn spawn(mut detector: Box<dyn LandmarkDetector>) -> Self {
        let (frame_tx, frame_rx) = crossbeam_channel::bounded::<Frame>(1);
        let (result_tx, result_rx) = crossbeam_channel::bounded::<DetectionResult>(1);

        let handle = std::thread::spawn(move || {
            for frame in frame_rx {
                let result = detector.detect(&frame).map_err(|e| e.to_string());
                if result_tx.send(result).is_err() {
                    break;
                }
            }
        });

        Self {
            frame_tx: Some(frame_tx),
            result_rx,
            handle: Some(handle),
            in_flight: false,
        }
    }

    /// Detects faces in `frame`. `None` when cancelled before the result
    /// was taken; a result that arrives after cancellation is discarded.
    fn detect(
        &mut self,
        frame: Frame,
        cancelled: &AtomicBool,
    ) -> Result<Option<DetectionResult>, CaptureError> {
        let thread_gone = || CaptureError::DetectionFailure("detector thread stopped".into());

        self.frame_tx
            .as_ref()
            .ok_or_else(thread_gone)?
            .send(frame)
            .map_err(|_| thread_gone())?;
        self.in_flight = true;

        loop {
            match self.result_rx.recv_timeout(CANCEL_POLL_INTERVAL) {
                Ok(result) => {
                    self.in_flight = false;
                    if cancelled.load(Ordering::Relaxed) {
                        log::debug!("Discarding detection result that arrived after cancellation");
                        return Ok(None);
                    }
                    return Ok(Some(result));
                }
                Err(RecvTimeoutError::Timeout) => {
                    if cancelled.load(Ordering::Relaxed) {
                        return Ok(None);
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    self.in_flight = false;
                    return Err(thread_gone());
                }
            }
        }
    }

    /// Closes the frame channel and joins the thread, unless a detection is
    /// still running, in which case the thread is left to finish alone.
    fn shutdown(&mut self) {
        self.frame_tx = None;
        let Some(handle) = self.handle.take() else {
            return;
        };
        if self.in_flight {
            log::debug!("Detaching detector thread with a detection in flight");
            return;
        }
        if handle.join().is_err() {
            log::warn!("Detector thread panicked");
        }
    }
}
