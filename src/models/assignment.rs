// src/models/assignment.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'assignments' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Assignment {
    pub id: i64,
    pub class_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'assignment_submissions' table. `grade` is free text as entered by the instructor.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct AssignmentSubmission {
    pub id: i64,
    pub assignment_id: i64,
    pub student_id: i64,
    pub grade: Option<String>,
    pub feedback: Option<String>,
    pub status: String,
    pub updated_at: DateTime<Utc>,
}

impl AssignmentSubmission {
    /// Numeric value of the grade; missing or non-numeric grades count as zero.
    pub fn grade_value(&self) -> f64 {
        self.grade
            .as_deref()
            .and_then(|g| g.trim().parse::<f64>().ok())
            .filter(|g| g.is_finite())
            .unwrap_or(0.0)
    }
}

/// DTO for creating an assignment. File attachments are handled elsewhere.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssignmentRequest {
    #[validate(length(min = 1, max = 255, message = "Title length must be between 1 and 255 chars"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub due_date: DateTime<Utc>,
}

/// DTO for grading a student's assignment.
#[derive(Debug, Deserialize, Validate)]
pub struct GradeAssignmentRequest {
    #[validate(length(min = 1, max = 10))]
    pub grade: String,
    #[validate(length(max = 1000))]
    pub feedback: Option<String>,
}
