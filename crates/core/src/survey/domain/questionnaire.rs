use crate::shared::constants::QUESTION_COUNT;

use super::likert_response::LikertResponse;
use super::survey_error::SurveyError;

/// Scores collected per question; a question may be answered several times.
///
/// Questions are addressed by zero-based index and displayed one-based.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Questionnaire {
    scores: Vec<Vec<u8>>,
}

impl Questionnaire {
    pub fn new() -> Self {
        Self::with_questions(QUESTION_COUNT)
    }

    pub fn with_questions(count: usize) -> Self {
        Self {
            scores: vec![Vec::new(); count],
        }
    }

    pub fn question_count(&self) -> usize {
        self.scores.len()
    }

    pub fn record(&mut self, question: usize, response: LikertResponse) -> Result<(), SurveyError> {
        let count = self.question_count();
        self.scores
            .get_mut(question)
            .ok_or(SurveyError::QuestionOutOfRange {
                question: question + 1,
                count,
            })?
            .push(response.score());
        Ok(())
    }

    /// Scores `transcript` against `question`. Unrecognized answers are
    /// not scored and yield `None`.
    pub fn answer(
        &mut self,
        question: usize,
        transcript: &str,
    ) -> Result<Option<LikertResponse>, SurveyError> {
        self.check_question(question)?;
        let response = LikertResponse::parse(transcript);
        match response {
            Some(r) => self.record(question, r)?,
            None => log::debug!("Unrecognized answer to question {}: {transcript:?}", question + 1),
        }
        Ok(response)
    }

    pub fn scores(&self, question: usize) -> Result<&[u8], SurveyError> {
        self.check_question(question)?;
        Ok(&self.scores[question])
    }

    pub fn question_total(&self, question: usize) -> Result<u32, SurveyError> {
        Ok(self.scores(question)?.iter().map(|&s| s as u32).sum())
    }

    /// Sum of every recorded score across all questions.
    pub fn total(&self) -> u32 {
        self.scores.iter().flatten().map(|&s| s as u32).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.iter().all(Vec::is_empty)
    }

    /// `(question index, scores)` in question order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[u8])> {
        self.scores.iter().map(Vec::as_slice).enumerate()
    }

    pub fn reset(&mut self) {
        self.scores.iter_mut().for_each(Vec::clear);
    }

    fn check_question(&self, question: usize) -> Result<(), SurveyError> {
        if question < self.question_count() {
            Ok(())
        } else {
            Err(SurveyError::QuestionOutOfRange {
                question: question + 1,
                count: self.question_count(),
            })
        }
    }
}

impl Default for Questionnaire {
    fn default() -> Self {
        Self::new()
    }
}
