use std::path::Path;

use crate::audio::domain::speech_recognizer::SpeechRecognizer;
use crate::audio::domain::transcript::transcript_text;
use crate::shared::constants::{SILENT_ANSWER_PEAK, WHISPER_SAMPLE_RATE};
use crate::video::domain::audio_reader::AudioReader;

use super::domain::likert_response::LikertResponse;
use super::domain::questionnaire::Questionnaire;
use super::domain::survey_error::SurveyError;

/// What was heard for one question and how it was scored.
#[derive(Clone, Debug, PartialEq)]
pub struct Answer {
    pub question: usize,
    pub transcript: String,
    pub response: Option<LikertResponse>,
}

/// Scores a recorded spoken answer: decode the audio, transcribe it and
/// record the recognized Likert response against one question.
pub struct AnswerQuestionUseCase {
    reader: Box<dyn AudioReader>,
    recognizer: Box<dyn SpeechRecognizer>,
}

impl AnswerQuestionUseCase {
    pub fn new(reader: Box<dyn AudioReader>, recognizer: Box<dyn SpeechRecognizer>) -> Self {
        Self { reader, recognizer }
    }

    pub fn run(
        &self,
        questionnaire: &mut Questionnaire,
        question: usize,
        audio_path: &Path,
    ) -> Result<Answer, SurveyError> {
        // Fail on a bad question before spending time on recognition
        questionnaire.scores(question)?;

        let audio = self
            .reader
            .read_audio(audio_path, WHISPER_SAMPLE_RATE)
            .map_err(|e| SurveyError::Recognition(e.to_string()))?
            .ok_or_else(|| SurveyError::NoAudio(audio_path.to_path_buf()))?;

        if audio.is_quiet(SILENT_ANSWER_PEAK) {
            log::info!(
                "Question {}: no speech in {} ({:.1}s)",
                question + 1,
                audio_path.display(),
                audio.duration()
            );
            return Ok(Answer {
                question,
                transcript: String::new(),
                response: None,
            });
        }

        let words = self
            .recognizer
            .transcribe(&audio)
            .map_err(|e| SurveyError::Recognition(e.to_string()))?;
        let transcript = transcript_text(&words);

        let response = questionnaire.answer(question, &transcript)?;
        log::info!(
            "Question {}: heard {transcript:?}, {}",
            question + 1,
            response.map_or("not scored".to_string(), |r| format!("scored {}", r.score()))
        );

        Ok(Answer {
            question,
            transcript,
            response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::domain::audio_segment::AudioSegment;
    use crate::audio::domain::transcript::TranscriptWord;

    struct StubAudioReader {
        has_audio: bool,
        level: f32,
    }

    impl AudioReader for StubAudioReader {
        fn read_audio(
            &self,
            _path: &Path,
            target_sample_rate: u32,
        ) -> Result<Option<AudioSegment>, Box<dyn std::error::Error>> {
            Ok(self
                .has_audio
                .then(|| AudioSegment::new(vec![self.level; 1600], target_sample_rate, 1)))
        }
    }

    struct StubRecognizer {
        words: Vec<&'static str>,
    }

    impl SpeechRecognizer for StubRecognizer {
        fn transcribe(
            &self,
            _audio: &AudioSegment,
        ) -> Result<Vec<TranscriptWord>, Box<dyn std::error::Error>> {
            Ok(self
                .words
                .iter()
                .enumerate()
                .map(|(i, w)| TranscriptWord {
                    word: w.to_string(),
                    start_time: i as f64 * 0.5,
                    end_time: i as f64 * 0.5 + 0.4,
                    confidence: 0.9,
                })
                .collect())
        }
    }

    struct FailingRecognizer;

    impl SpeechRecognizer for FailingRecognizer {
        fn transcribe(
            &self,
            _audio: &AudioSegment,
        ) -> Result<Vec<TranscriptWord>, Box<dyn std::error::Error>> {
            Err("model not loaded".into())
        }
    }

    fn use_case(has_audio: bool, recognizer: impl SpeechRecognizer + 'static) -> AnswerQuestionUseCase {
        AnswerQuestionUseCase::new(
            Box::new(StubAudioReader {
                has_audio,
                level: 0.1,
            }),
            Box::new(recognizer),
        )
    }

    #[test]
    fn test_recognized_answer_is_scored() {
        let mut questionnaire = Questionnaire::new();
        let answer = use_case(true, StubRecognizer { words: vec!["Sometimes."] })
            .run(&mut questionnaire, 3, Path::new("q4.wav"))
            .unwrap();
        assert_eq!(answer.transcript, "Sometimes.");
        assert_eq!(answer.response, Some(LikertResponse::Sometimes));
        assert_eq!(questionnaire.scores(3).unwrap(), &[3]);
    }

    #[test]
    fn test_unrecognized_answer_is_reported_not_scored() {
        let mut questionnaire = Questionnaire::new();
        let answer = use_case(true, StubRecognizer { words: vec!["pretty", "often"] })
            .run(&mut questionnaire, 0, Path::new("q1.wav"))
            .unwrap();
        assert_eq!(answer.transcript, "pretty often");
        assert_eq!(answer.response, None);
        assert!(questionnaire.is_empty());
    }

    #[test]
    fn test_missing_audio_track() {
        let mut questionnaire = Questionnaire::new();
        let result = use_case(false, StubRecognizer { words: vec![] }).run(
            &mut questionnaire,
            0,
            Path::new("silent.mp4"),
        );
        assert!(matches!(result, Err(SurveyError::NoAudio(_))));
    }

    #[test]
    fn test_silent_recording_skips_recognition() {
        let mut questionnaire = Questionnaire::new();
        let use_case = AnswerQuestionUseCase::new(
            Box::new(StubAudioReader {
                has_audio: true,
                level: 0.0,
            }),
            Box::new(FailingRecognizer),
        );
        let answer = use_case
            .run(&mut questionnaire, 2, Path::new("q3.wav"))
            .unwrap();
        assert_eq!(answer.transcript, "");
        assert_eq!(answer.response, None);
        assert!(questionnaire.is_empty());
    }

    #[test]
    fn test_recognizer_failure() {
        let mut questionnaire = Questionnaire::new();
        let result = use_case(true, FailingRecognizer).run(&mut questionnaire, 0, Path::new("q1.wav"));
        assert!(matches!(result, Err(SurveyError::Recognition(m)) if m.contains("not loaded")));
    }

    #[test]
    fn test_question_out_of_range_checked_first() {
        let mut questionnaire = Questionnaire::new();
        let result = use_case(true, FailingRecognizer).run(&mut questionnaire, 14, Path::new("q15.wav"));
        assert!(matches!(result, Err(SurveyError::QuestionOutOfRange { .. })));
    }
}
