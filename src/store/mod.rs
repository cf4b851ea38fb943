// src/store/mod.rs

//! Persistence boundary. Everything the engine reads or writes goes through [`QuizStore`].

pub mod memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, AssignmentSubmission},
        quiz::{NewQuiz, QuizDetail},
        submission::{NewSubmission, Submission, SubmissionWithStudent},
        user::Student,
    },
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type SharedStore = Arc<dyn QuizStore>;

/// Assignment fields the engine writes. Attachments live outside this service.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAssignment {
    pub class_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub due_date: chrono::DateTime<chrono::Utc>,
}

#[async_trait]
pub trait QuizStore: Send + Sync {
    async fn class_exists(&self, class_id: i64) -> Result<bool, AppError>;

    /// Enrolled students in roster order.
    async fn class_roster(&self, class_id: i64) -> Result<Vec<Student>, AppError>;

    async fn is_enrolled(&self, class_id: i64, student_id: i64) -> Result<bool, AppError>;

    /// Persists the quiz, its questions and choices as one unit; nothing is kept on failure.
    async fn insert_quiz(&self, quiz: NewQuiz) -> Result<QuizDetail, AppError>;

    async fn get_quiz(&self, quiz_id: i64) -> Result<Option<QuizDetail>, AppError>;

    /// Quizzes of a class in creation order.
    async fn list_quizzes(&self, class_id: i64) -> Result<Vec<QuizDetail>, AppError>;

    /// Removes the quiz with its questions, choices and submissions. `false` if it did not exist.
    async fn delete_quiz(&self, quiz_id: i64) -> Result<bool, AppError>;

    async fn find_finished_submission(
        &self,
        quiz_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>, AppError>;

    /// Stores a finished attempt. Fails with `AlreadySubmitted` when one already exists
    /// for `(quiz_id, student_id)`, including when two inserts race.
    async fn insert_submission(&self, submission: NewSubmission) -> Result<Submission, AppError>;

    async fn list_student_submissions(&self, student_id: i64) -> Result<Vec<Submission>, AppError>;

    async fn list_quiz_submissions(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<SubmissionWithStudent>, AppError>;

    /// Every quiz submission belonging to any quiz of the class.
    async fn list_class_submissions(&self, class_id: i64) -> Result<Vec<Submission>, AppError>;

    async fn insert_assignment(&self, assignment: NewAssignment) -> Result<Assignment, AppError>;

    async fn get_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, AppError>;

    /// Assignments of a class in creation order.
    async fn list_assignments(&self, class_id: i64) -> Result<Vec<Assignment>, AppError>;

    async fn list_assignment_submissions(
        &self,
        class_id: i64,
    ) -> Result<Vec<AssignmentSubmission>, AppError>;

    /// Sets the grade on the student's assignment submission, creating it if needed.
    async fn upsert_assignment_grade(
        &self,
        assignment_id: i64,
        student_id: i64,
        grade: String,
        feedback: Option<String>,
    ) -> Result<AssignmentSubmission, AppError>;
}
