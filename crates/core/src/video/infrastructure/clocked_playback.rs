use std::path::Path;
use std::time::Instant;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::playback_source::{PlaybackSource, PlaybackState};
use crate::video::domain::video_reader::VideoReader;

/// Source of elapsed playback time in seconds.
pub trait PlaybackClock: Send {
    fn elapsed(&self) -> f64;
}

/// Real-time clock started when playback begins.
pub struct WallClock {
    started: Instant,
}

impl WallClock {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl PlaybackClock for WallClock {
    fn elapsed(&self) -> f64 {
        self.started.elapsed().as_secs_f64()
    }
}

/// Plays a [`VideoReader`] back at the pace of a [`PlaybackClock`].
///
/// The current frame is the last decoded frame whose timestamp is not after
/// the clock; frames that fall between two samples are skipped. Still images
/// are a single frame that ends playback once it has been handed out.
pub struct ClockedPlayback {
    reader: Box<dyn VideoReader>,
    metadata: VideoMetadata,
    clock: Box<dyn PlaybackClock>,
    current: Option<Frame>,
    lookahead: Option<Frame>,
    exhausted: bool,
    current_served: bool,
}

impl ClockedPlayback {
    /// Opens `path` with `reader` and starts a wall clock.
    pub fn open(
        reader: Box<dyn VideoReader>,
        path: &Path,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        Self::with_clock(reader, path, Box::new(WallClock::start()))
    }

    pub fn with_clock(
        mut reader: Box<dyn VideoReader>,
        path: &Path,
        clock: Box<dyn PlaybackClock>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let metadata = reader.open(path)?;
        log::info!(
            "Opened {} ({}x{}, {:.2} fps, {} frames)",
            path.display(),
            metadata.width,
            metadata.height,
            metadata.fps,
            metadata.total_frames
        );
        Ok(Self {
            reader,
            metadata,
            clock,
            current: None,
            lookahead: None,
            exhausted: false,
            current_served: false,
        })
    }

    /// Decodes forward until the next frame lies in the future.
    fn advance(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let elapsed = self.clock.elapsed();
        loop {
            if self.lookahead.is_none() && !self.exhausted {
                match self.reader.next_frame()? {
                    Some(frame) => self.lookahead = Some(frame),
                    None => {
                        self.exhausted = true;
                        self.reader.close();
                    }
                }
            }
            match self.lookahead.take() {
                Some(frame) if self.current.is_none() || frame.timestamp() <= elapsed => {
                    self.current = Some(frame);
                    self.current_served = false;
                }
                pending => {
                    self.lookahead = pending;
                    return Ok(());
                }
            }
        }
    }

    fn frame_duration(&self) -> f64 {
        if self.metadata.fps > 0.0 {
            1.0 / self.metadata.fps
        } else {
            0.0
        }
    }
}

impl PlaybackSource for ClockedPlayback {
    fn current_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.state() != PlaybackState::Playing {
            return Ok(None);
        }
        self.advance()?;
        self.current_served = self.current.is_some();
        Ok(self.current.clone())
    }

    fn current_time(&self) -> f64 {
        self.current.as_ref().map_or(0.0, Frame::timestamp)
    }

    fn state(&self) -> PlaybackState {
        if !self.exhausted || self.lookahead.is_some() {
            return PlaybackState::Playing;
        }
        match &self.current {
            Some(frame)
                if self.current_served
                    && self.clock.elapsed() >= frame.timestamp() + self.frame_duration() =>
            {
                PlaybackState::Ended
            }
            Some(_) => PlaybackState::Playing,
            None => PlaybackState::Ended,
        }
    }
}
