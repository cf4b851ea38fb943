// src/models/question.rs

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use validator::Validate;

/// How a question is answered and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "question_type", rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Identification,
    Essay,
}

impl FromStr for QuestionType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "identification" => Ok(QuestionType::Identification),
            "essay" => Ok(QuestionType::Essay),
            _ => Err(()),
        }
    }
}

/// Represents the 'questions' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub quiz_id: i64,

    /// Zero-based order within the quiz.
    pub position: i32,

    pub question_text: String,

    /// Mapped from the database column 'type' since `type` is a reserved keyword in Rust.
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub question_type: QuestionType,

    /// Answer key for multiple_choice (a choice label) and identification.
    pub correct_answer: Option<String>,

    /// Model answer that essays are compared against.
    pub reference_answer: Option<String>,

    /// Essay scaling bounds. Ignored for objective questions.
    pub min_score: i32,
    pub max_score: i32,
}

impl Question {
    /// Points this question adds to the quiz total: 1 for objective types, `max_score` for essays.
    pub fn weight(&self) -> i64 {
        match self.question_type {
            QuestionType::MultipleChoice | QuestionType::Identification => 1,
            QuestionType::Essay => i64::from(self.max_score),
        }
    }
}

/// Represents the 'choices' table. Only multiple_choice questions own choices.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Choice {
    pub id: i64,
    pub question_id: i64,
    pub label: String,
    pub text: String,
}

/// A question with its choices, as returned to instructors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDetail {
    #[serde(flatten)]
    pub question: Question,
    pub choices: Vec<Choice>,
}

/// DTO for sending a question to a student (excludes the answer key and reference answer).
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub position: i32,
    pub question_text: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub max_score: i32,
    pub choices: Vec<Choice>,
}

impl From<&QuestionDetail> for PublicQuestion {
    fn from(detail: &QuestionDetail) -> Self {
        let q = &detail.question;
        Self {
            id: q.id,
            position: q.position,
            question_text: q.question_text.clone(),
            question_type: q.question_type,
            max_score: q.max_score,
            choices: detail.choices.clone(),
        }
    }
}

/// One entry of the `questions` array in a create-quiz request.
/// Fields are optional here so that absence is reported per field by the builder.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct QuestionSpec {
    #[validate(
        required(message = "question_text is required"),
        length(min = 1, max = 5000)
    )]
    pub question_text: Option<String>,

    #[serde(rename = "type")]
    #[validate(required(message = "type is required"))]
    pub question_type: Option<String>,

    #[validate(length(max = 1000))]
    pub correct_answer: Option<String>,

    #[validate(length(max = 10000))]
    pub reference_answer: Option<String>,

    pub min_score: Option<i32>,
    pub max_score: Option<i32>,

    #[serde(default)]
    pub choices: Option<Vec<ChoiceSpec>>,
}

/// A raw choice row; rows with an empty label or text are dropped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoiceSpec {
    pub label: Option<String>,
    pub text: Option<String>,
}

/// Validated question ready to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub correct_answer: Option<String>,
    pub reference_answer: Option<String>,
    pub min_score: i32,
    pub max_score: i32,
    pub choices: Vec<NewChoice>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewChoice {
    pub label: String,
    pub text: String,
}
