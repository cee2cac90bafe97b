pub mod likert_response;
pub mod questionnaire;
pub mod survey_error;
