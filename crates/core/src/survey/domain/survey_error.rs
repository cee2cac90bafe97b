use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("question {question} is out of range (1-{count})")]
    QuestionOutOfRange { question: usize, count: usize },
    #[error("nothing to export: no answers were scored")]
    EmptySurvey,
    #[error("speech recognition failed: {0}")]
    Recognition(String),
    #[error("no audio track in {0}")]
    NoAudio(PathBuf),
    #[error("failed to build spreadsheet: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_question_out_of_range_is_one_based() {
        let err = SurveyError::QuestionOutOfRange {
            question: 15,
            count: 14,
        };
        assert_eq!(err.to_string(), "question 15 is out of range (1-14)");
    }
}
