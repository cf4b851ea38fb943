// src/models/quiz.rs

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::{
    question::{NewQuestion, PublicQuestion, Question, QuestionDetail, QuestionSpec},
    submission::{Submission, SubmissionWithStudent},
};
use crate::services::window::WindowState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "quiz_type", rename_all = "snake_case")]
pub enum QuizType {
    Objective,
    Essay,
}

impl FromStr for QuizType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "objective" => Ok(QuizType::Objective),
            "essay" => Ok(QuizType::Essay),
            _ => Err(()),
        }
    }
}

/// Represents the 'quizzes' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Quiz {
    pub id: i64,
    pub class_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub quiz_type: QuizType,
    pub created_at: DateTime<Utc>,
}

/// A quiz hydrated with its ordered questions and their choices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizDetail {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub questions: Vec<QuestionDetail>,
}

impl QuizDetail {
    pub fn question_rows(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().map(|d| &d.question)
    }
}

/// DTO for creating a quiz. Required fields are `Option` so each missing one is reported.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct CreateQuizRequest {
    #[validate(required(message = "class_id is required"))]
    pub class_id: Option<i64>,

    #[validate(required(message = "title is required"), length(min = 1, max = 255))]
    pub title: Option<String>,

    #[validate(length(max = 5000))]
    pub description: Option<String>,

    #[validate(required(message = "start_time is required"))]
    pub start_time: Option<DateTime<Utc>>,

    #[validate(required(message = "end_time is required"))]
    pub end_time: Option<DateTime<Utc>>,

    #[validate(required(message = "duration_minutes is required"), range(min = 1))]
    pub duration_minutes: Option<i32>,

    #[validate(required(message = "quiz_type is required"))]
    pub quiz_type: Option<String>,

    #[validate(required(message = "questions is required"))]
    pub questions: Option<Vec<QuestionSpec>>,
}

/// Validated quiz aggregate ready to be persisted atomically.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuiz {
    pub class_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_minutes: i32,
    pub quiz_type: QuizType,
    pub questions: Vec<NewQuestion>,
}

/// Listing entry for instructors: full answer keys plus every attempt.
#[derive(Debug, Serialize)]
pub struct InstructorQuizView {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub total_possible: i64,
    pub questions: Vec<QuestionDetail>,
    pub submissions: Vec<SubmissionWithStudent>,
}

/// Listing entry for students: no answer keys, only their own attempt.
#[derive(Debug, Serialize)]
pub struct StudentQuizView {
    #[serde(flatten)]
    pub quiz: Quiz,
    pub total_possible: i64,
    pub questions: Vec<PublicQuestion>,
    pub my_submission: Option<Submission>,
    pub window: WindowState,
}
