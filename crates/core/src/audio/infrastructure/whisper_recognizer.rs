use std::path::{Path, PathBuf};

use whisper_rs::{FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters};

use crate::audio::domain::audio_segment::AudioSegment;
use crate::audio::domain::speech_recognizer::SpeechRecognizer;
use crate::audio::domain::transcript::TranscriptWord;

/// Speech recognizer using whisper.cpp via whisper-rs.
///
/// The model is loaded once and reused for every answer. Sub-word tokens are
/// merged back into whole words.
pub struct WhisperRecognizer {
    model_path: PathBuf,
    context: WhisperContext,
}

/// One decoded token before word merging.
#[derive(Clone, Debug)]
struct RawToken {
    text: String,
    start_time: f64,
    end_time: f64,
    probability: f32,
}

impl WhisperRecognizer {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        if !model_path.exists() {
            return Err(format!("Whisper model not found at: {}", model_path.display()).into());
        }
        let context = WhisperContext::new_with_params(
            model_path.to_str().ok_or("Invalid model path")?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| format!("Failed to load Whisper model: {e}"))?;

        Ok(Self {
            model_path: model_path.to_path_buf(),
            context,
        })
    }

    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl SpeechRecognizer for WhisperRecognizer {
    fn transcribe(
        &self,
        audio: &AudioSegment,
    ) -> Result<Vec<TranscriptWord>, Box<dyn std::error::Error>> {
        let mut state = self
            .context
            .create_state()
            .map_err(|e| format!("Failed to create Whisper state: {e}"))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 0 });
        params.set_language(Some("en"));
        params.set_translate(false);
        params.set_no_context(true);
        params.set_single_segment(true);
        params.set_token_timestamps(true);
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);
        params.set_n_threads(num_cpus().min(4) as i32);

        state
            .full(params, audio.samples())
            .map_err(|e| format!("Whisper inference failed: {e}"))?;

        let mut tokens = Vec::new();
        for seg_idx in 0..state.full_n_segments() {
            let Some(segment) = state.get_segment(seg_idx) else {
                continue;
            };
            for tok_idx in 0..segment.n_tokens() {
                let Some(token) = segment.get_token(tok_idx) else {
                    continue;
                };
                let Ok(text) = token.to_str() else {
                    continue;
                };
                let token_data = token.token_data();
                // Token timestamps are in centiseconds
                tokens.push(RawToken {
                    text: text.to_string(),
                    start_time: token_data.t0 as f64 / 100.0,
                    end_time: token_data.t1 as f64 / 100.0,
                    probability: token.token_probability(),
                });
            }
        }

        let words = merge_tokens(tokens);
        log::debug!("Whisper heard {} words", words.len());
        Ok(words)
    }
}

/// Joins sub-word tokens into words. A token with a leading space starts a
/// new word; anything else (suffixes, punctuation) extends the previous one.
/// Special tokens such as `[_BEG_]` or `<|endoftext|>` are dropped.
fn merge_tokens(tokens: Vec<RawToken>) -> Vec<TranscriptWord> {
    let mut words: Vec<TranscriptWord> = Vec::new();
    for token in tokens {
        let trimmed = token.text.trim();
        if trimmed.is_empty() || trimmed.starts_with('[') || trimmed.starts_with('<') {
            continue;
        }
        let starts_word = token.text.starts_with(char::is_whitespace);
        match words.last_mut() {
            Some(word) if !starts_word => {
                word.word.push_str(trimmed);
                word.end_time = word.end_time.max(token.end_time);
                word.confidence = word.confidence.min(token.probability);
            }
            _ => words.push(TranscriptWord {
                word: trimmed.to_string(),
                start_time: token.start_time,
                end_time: token.end_time,
                confidence: token.probability,
            }),
        }
    }
    words
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
