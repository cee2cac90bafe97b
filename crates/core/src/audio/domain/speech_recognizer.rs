use super::audio_segment::AudioSegment;
use super::transcript::TranscriptWord;

/// Domain interface for speech-to-text transcription.
///
/// One request, one response: the whole recorded answer goes in, its words
/// come back in spoken order.
pub trait SpeechRecognizer: Send {
    fn transcribe(
        &self,
        audio: &AudioSegment,
    ) -> Result<Vec<TranscriptWord>, Box<dyn std::error::Error>>;
}
