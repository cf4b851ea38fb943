// src/models/submission.rs

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};
use validator::Validate;

/// Submitted answers keyed by question id. `None` and `""` both mean "not answered".
pub type AnswerSheet = BTreeMap<i64, Option<String>>;

/// Only completed attempts are ever stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "submission_status", rename_all = "snake_case")]
pub enum SubmissionStatus {
    Finished,
}

/// Represents the 'quiz_submissions' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Submission {
    pub id: i64,
    pub quiz_id: i64,
    pub student_id: i64,
    pub answers: Json<AnswerSheet>,
    pub score: i64,
    pub status: SubmissionStatus,
    pub created_at: DateTime<Utc>,
}

/// A submission joined with the student's display name, for instructor review.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct SubmissionWithStudent {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub submission: Submission,
    pub student_name: String,
}

/// Row to insert once scoring is done.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub quiz_id: i64,
    pub student_id: i64,
    pub answers: AnswerSheet,
    pub score: i64,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitQuizRequest {
    /// Key: question id. Value: choice label or free text, possibly null.
    #[validate(required(message = "answers is required"))]
    pub answers: Option<AnswerSheet>,
}

/// Result of a successful submit.
#[derive(Debug, Clone, Serialize)]
pub struct SubmitOutcome {
    pub score: i64,
    pub total: i64,
    pub submission: Submission,
}
