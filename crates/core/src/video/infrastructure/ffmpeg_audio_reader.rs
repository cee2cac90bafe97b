use std::path::Path;

use ffmpeg_next::software::resampling;
use ffmpeg_next::util::frame::audio::Audio;

use crate::audio::domain::audio_segment::AudioSegment;
use crate::video::domain::audio_reader::AudioReader;

/// Decodes a recorded answer (any audio or video container) using ffmpeg-next,
/// downmixed to mono f32 at the requested rate.
pub struct FfmpegAudioReader;

impl AudioReader for FfmpegAudioReader {
    fn read_audio(
        &self,
        path: &Path,
        target_sample_rate: u32,
    ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;

        let mut ictx = ffmpeg_next::format::input(path)?;
        let Some(stream) = ictx.streams().best(ffmpeg_next::media::Type::Audio) else {
            return Ok(None);
        };
        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .audio()?;

        let mut mono = MonoDecoder::new(decoder, target_sample_rate)?;
        for (stream, packet) in ictx.packets() {
            if stream.index() == stream_index {
                mono.decoder.send_packet(&packet)?;
                mono.drain()?;
            }
        }
        let samples = mono.finish()?;

        let segment = AudioSegment::new(samples, target_sample_rate, 1);
        log::debug!(
            "Decoded {:.2}s of audio from {}",
            segment.duration(),
            path.display()
        );
        Ok(Some(segment))
    }
}

/// Decoder plus a resampler to planar mono f32, collecting every sample.
struct MonoDecoder {
    decoder: ffmpeg_next::decoder::Audio,
    resampler: resampling::Context,
    decoded: Audio,
    resampled: Audio,
    samples: Vec<f32>,
}

impl MonoDecoder {
    fn new(
        decoder: ffmpeg_next::decoder::Audio,
        target_sample_rate: u32,
    ) -> Result<Self, ffmpeg_next::Error> {
        let resampler = resampling::Context::get(
            decoder.format(),
            decoder.channel_layout(),
            decoder.rate(),
            ffmpeg_next::format::Sample::F32(ffmpeg_next::format::sample::Type::Planar),
            ffmpeg_next::ChannelLayout::MONO,
            target_sample_rate,
        )?;
        Ok(Self {
            decoder,
            resampler,
            decoded: Audio::empty(),
            resampled: Audio::empty(),
            samples: Vec::new(),
        })
    }

    fn drain(&mut self) -> Result<(), ffmpeg_next::Error> {
        while self.decoder.receive_frame(&mut self.decoded).is_ok() {
            self.resampler.run(&self.decoded, &mut self.resampled)?;
            append_samples(&self.resampled, &mut self.samples);
        }
        Ok(())
    }

    /// Flushes the decoder, then whatever the resampler still buffers.
    fn finish(mut self) -> Result<Vec<f32>, ffmpeg_next::Error> {
        self.decoder.send_eof()?;
        self.drain()?;
        if let Ok(Some(delay)) = self.resampler.flush(&mut self.resampled) {
            if delay.output > 0 {
                append_samples(&self.resampled, &mut self.samples);
            }
        }
        Ok(self.samples)
    }
}

fn append_samples(frame: &Audio, out: &mut Vec<f32>) {
    let count = frame.samples();
    if count == 0 {
        return;
    }
    let data = frame.data(0);
    // Plane 0 of a planar f32 frame holds `count` floats.
    let floats = unsafe { std::slice::from_raw_parts(data.as_ptr() as *const f32, count) };
    out.extend_from_slice(floats);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_read_audio_nonexistent_file() {
        let reader = FfmpegAudioReader;
        let path = if cfg!(windows) {
            Path::new("Z:\\nonexistent\\file.mp4")
        } else {
            Path::new("/nonexistent/file.mp4")
        };
        let result = reader.read_audio(path, 16000);
        assert!(result.is_err());
    }

    #[test]
    fn test_read_audio_silent_video_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("silent.mp4");
        crate::video::infrastructure::ffmpeg_reader::tests::create_test_video(&path, 3, 64, 48, 30.0);

        let reader = FfmpegAudioReader;
        assert!(reader.read_audio(&path, 16000).unwrap().is_none());
    }
}
