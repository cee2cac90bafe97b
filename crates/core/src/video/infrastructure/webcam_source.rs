use std::time::Instant;

use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType};
use nokhwa::{nokhwa_initialize, query, Camera};

use crate::shared::frame::Frame;
use crate::video::domain::playback_source::{PlaybackSource, PlaybackState};

/// Live camera stream as a [`PlaybackSource`].
///
/// Timestamps are seconds since the stream was opened. The source reports
/// `Paused` once the stream is stopped; it never ends on its own.
pub struct WebcamSource {
    camera: Camera,
    opened_at: Instant,
    last_time: f64,
    frame_index: usize,
}

impl WebcamSource {
    /// Opens the camera at `index`, or the last enumerated camera when `None`.
    pub fn open(index: Option<u32>) -> Result<Self, Box<dyn std::error::Error>> {
        nokhwa_initialize(|granted| {
            log::debug!("Camera access granted: {granted}");
        });

        let index = match index {
            Some(i) => CameraIndex::Index(i),
            None => {
                let cameras = query(ApiBackend::Auto)?;
                for camera in &cameras {
                    log::debug!("Found camera: {}", camera.human_name());
                }
                cameras
                    .last()
                    .map(|info| info.index().clone())
                    .ok_or("No camera found")?
            }
        };

        let mut camera = Camera::new(
            index,
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate),
        )?;
        camera.open_stream()?;
        log::info!("Webcam stream opened ({})", camera.info().human_name());

        Ok(Self {
            camera,
            opened_at: Instant::now(),
            last_time: 0.0,
            frame_index: 0,
        })
    }

    pub fn stop(&mut self) {
        if self.camera.is_stream_open() {
            if let Err(e) = self.camera.stop_stream() {
                log::warn!("Failed to stop webcam stream: {e}");
            }
        }
    }
}

impl PlaybackSource for WebcamSource {
    fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if !self.camera.is_stream_open() {
            return Ok(None);
        }
        let image = self.camera.frame()?.decode_image::<RgbFormat>()?;
        let (width, height) = (image.width(), image.height());
        self.last_time = self.opened_at.elapsed().as_secs_f64();
        let frame = Frame::new(
            image.into_raw(),
            width,
            height,
            3,
            self.frame_index,
            self.last_time,
        );
        self.frame_index += 1;
        Ok(Some(frame))
    }

    fn current_time(&self) -> f64 {
        self.last_time
    }

    fn state(&self) -> PlaybackState {
        if self.camera.is_stream_open() {
            PlaybackState::Playing
        } else {
            PlaybackState::Paused
        }
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        self.stop();
    }
}
