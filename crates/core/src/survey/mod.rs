pub mod answer_question_use_case;
pub mod domain;
