pub mod clocked_playback;
pub mod ffmpeg_audio_reader;
pub mod ffmpeg_reader;
pub mod image_file_reader;
#[cfg(feature = "webcam")]
pub mod webcam_source;
