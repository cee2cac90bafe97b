use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::video_reader::VideoReader;

/// Decodes video frames via ffmpeg-next (libavformat + libavcodec).
///
/// Converts each decoded frame to RGB24 and stamps it with its presentation
/// time, derived from the frame's pts and the stream time base and measured
/// from the stream start, so the first frame is presented at 0 s even when
/// the container starts later (MPEG-TS, camera recordings).
pub struct FfmpegReader {
    decode: Option<DecodeState>,
}

/// Everything needed to pull the next frame; created by `open`.
struct DecodeState {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    video_stream_index: usize,
    time_base: f64,
    /// Pts of the stream start; taken from the first frame when the
    /// container does not declare one.
    start_pts: Option<i64>,
    fps: f64,
    frame_index: usize,
    flushing: bool,
    done: bool,
}

// Safety: FfmpegReader is only used from a single thread at a time.
// The raw pointers inside ffmpeg types are not shared across threads.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new() -> Self {
        Self { decode: None }
    }
}

impl Default for FfmpegReader {
    fn default() -> Self {
        Self::new()
    }
}

impl VideoReader for FfmpegReader {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let ictx = ffmpeg_next::format::input(path)?;

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let video_stream_index = stream.index();
        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?;
        let decoder = codec_ctx.decoder().video()?;

        let fps = rational_to_f64(stream.rate());
        let time_base = rational_to_f64(stream.time_base());
        let start_pts = Some(stream.start_time()).filter(|&t| t != NO_PTS);
        let total_frames = stream.frames() as usize;

        let width = decoder.width();
        let height = decoder.height();
        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        let metadata = VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec: decoder
                .codec()
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            source_path: Some(path.to_path_buf()),
        };

        self.decode = Some(DecodeState {
            ictx,
            decoder,
            scaler,
            width,
            height,
            video_stream_index,
            time_base,
            start_pts,
            fps,
            frame_index: 0,
            flushing: false,
            done: false,
        });

        Ok(metadata)
    }

    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let state = self.decode.as_mut().ok_or("FfmpegReader: not opened")?;
        state.next_frame()
    }

    fn close(&mut self) {
        self.decode = None;
    }
}

impl DecodeState {
    fn next_frame(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        if self.done {
            return Ok(None);
        }

        if let Some(frame) = self.try_receive()? {
            return Ok(Some(frame));
        }

        if self.flushing {
            self.done = true;
            return Ok(None);
        }

        loop {
            let Some((stream, packet)) = self.ictx.packets().next() else {
                let _ = self.decoder.send_eof();
                self.flushing = true;
                let frame = self.try_receive()?;
                if frame.is_none() {
                    self.done = true;
                }
                return Ok(frame);
            };

            if stream.index() != self.video_stream_index {
                continue;
            }

            if self.decoder.send_packet(&packet).is_err() {
                continue;
            }

            if let Some(frame) = self.try_receive()? {
                return Ok(Some(frame));
            }
        }
    }

    fn try_receive(&mut self) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        if self.decoder.receive_frame(&mut decoded).is_err() {
            return Ok(None);
        }

        let mut rgb_frame = ffmpeg_next::util::frame::video::Video::empty();
        self.scaler.run(&decoded, &mut rgb_frame)?;

        let timestamp = self.presentation_time(decoded.timestamp().or(decoded.pts()));
        let pixels = extract_rgb_pixels(&rgb_frame, self.width, self.height);
        let frame = Frame::new(
            pixels,
            self.width,
            self.height,
            3,
            self.frame_index,
            timestamp,
        );
        self.frame_index += 1;
        Ok(Some(frame))
    }

    /// Seconds since the stream start; falls back to `index / fps` when the
    /// container carries no usable timestamps.
    fn presentation_time(&mut self, pts: Option<i64>) -> f64 {
        match pts {
            Some(pts) if self.time_base > 0.0 => {
                let start = *self.start_pts.get_or_insert(pts);
                (pts.saturating_sub(start) as f64 * self.time_base).max(0.0)
            }
            _ if self.fps > 0.0 => self.frame_index as f64 / self.fps,
            _ => 0.0,
        }
    }
}

/// `AV_NOPTS_VALUE`: the stream declares no start time.
const NO_PTS: i64 = i64::MIN;

fn rational_to_f64(r: ffmpeg_next::Rational) -> f64 {
    if r.denominator() != 0 {
        r.numerator() as f64 / r.denominator() as f64
    } else {
        0.0
    }
}

/// Copies pixel data from an ffmpeg frame into a contiguous RGB buffer.
///
/// ffmpeg frames may have padding bytes at the end of each row (stride > width*3).
/// This function strips that padding to produce a tightly-packed pixel buffer.
pub(crate) fn extract_rgb_pixels(
    rgb_frame: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
) -> Vec<u8> {
    let stride = rgb_frame.stride(0);
    let data = rgb_frame.data(0);
    let w = width as usize;
    let h = height as usize;

    let mut pixels = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let row_start = row * stride;
        pixels.extend_from_slice(&data[row_start..row_start + w * 3]);
    }
    pixels
}
