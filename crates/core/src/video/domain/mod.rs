pub mod audio_reader;
pub mod playback_source;
pub mod video_reader;
