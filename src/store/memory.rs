// src/store/memory.rs

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use sqlx::types::Json;
use tokio::sync::RwLock;

use crate::{
    error::AppError,
    models::{
        assignment::{Assignment, AssignmentSubmission},
        question::{Choice, Question, QuestionDetail},
        quiz::{NewQuiz, Quiz, QuizDetail},
        submission::{NewSubmission, Submission, SubmissionStatus, SubmissionWithStudent},
        user::Student,
    },
    store::{NewAssignment, QuizStore},
};

/// In-process store. A single write lock is the serialization point for submits.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    classes: BTreeMap<i64, String>,
    rosters: HashMap<i64, Vec<i64>>,
    students: HashMap<i64, String>,
    quizzes: BTreeMap<i64, QuizDetail>,
    submissions: Vec<Submission>,
    assignments: BTreeMap<i64, Assignment>,
    assignment_submissions: Vec<AssignmentSubmission>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn student_name(&self, student_id: i64) -> String {
        self.students.get(&student_id).cloned().unwrap_or_default()
    }

    fn class_quiz_ids(&self, class_id: i64) -> Vec<i64> {
        self.quizzes
            .values()
            .filter(|q| q.quiz.class_id == class_id)
            .map(|q| q.quiz.id)
            .collect()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a class and returns its id.
    pub async fn create_class(&self, name: &str) -> i64 {
        let mut inner = self.inner.write().await;
        let id = inner.next_id();
        inner.classes.insert(id, name.to_string());
        inner.rosters.insert(id, Vec::new());
        id
    }

    /// Adds a student to the end of a class roster. Re-enrolling is a no-op.
    pub async fn enroll(&self, class_id: i64, student: Student) {
        let mut inner = self.inner.write().await;
        inner.students.insert(student.id, student.name);
        let roster = inner.rosters.entry(class_id).or_default();
        if !roster.contains(&student.id) {
            roster.push(student.id);
        }
    }
}

#[async_trait]
impl QuizStore for MemoryStore {
    async fn class_exists(&self, class_id: i64) -> Result<bool, AppError> {
        Ok(self.inner.read().await.classes.contains_key(&class_id))
    }

    async fn class_roster(&self, class_id: i64) -> Result<Vec<Student>, AppError> {
        let inner = self.inner.read().await;
        let roster = inner.rosters.get(&class_id).cloned().unwrap_or_default();
        Ok(roster
            .into_iter()
            .map(|id| Student {
                id,
                name: inner.student_name(id),
            })
            .collect())
    }

    async fn is_enrolled(&self, class_id: i64, student_id: i64) -> Result<bool, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .rosters
            .get(&class_id)
            .is_some_and(|r| r.contains(&student_id)))
    }

    async fn insert_quiz(&self, new: NewQuiz) -> Result<QuizDetail, AppError> {
        let mut inner = self.inner.write().await;

        let quiz_id = inner.next_id();
        let quiz = Quiz {
            id: quiz_id,
            class_id: new.class_id,
            title: new.title,
            description: new.description,
            start_time: new.start_time,
            end_time: new.end_time,
            duration_minutes: new.duration_minutes,
            quiz_type: new.quiz_type,
            created_at: Utc::now(),
        };

        let mut questions = Vec::with_capacity(new.questions.len());
        for (position, q) in new.questions.into_iter().enumerate() {
            let question_id = inner.next_id();
            let mut choices = Vec::with_capacity(q.choices.len());
            for c in q.choices {
                choices.push(Choice {
                    id: inner.next_id(),
                    question_id,
                    label: c.label,
                    text: c.text,
                });
            }
            questions.push(QuestionDetail {
                question: Question {
                    id: question_id,
                    quiz_id,
                    position: position as i32,
                    question_text: q.question_text,
                    question_type: q.question_type,
                    correct_answer: q.correct_answer,
                    reference_answer: q.reference_answer,
                    min_score: q.min_score,
                    max_score: q.max_score,
                },
                choices,
            });
        }

        let detail = QuizDetail { quiz, questions };
        inner.quizzes.insert(quiz_id, detail.clone());
        Ok(detail)
    }

    async fn get_quiz(&self, quiz_id: i64) -> Result<Option<QuizDetail>, AppError> {
        Ok(self.inner.read().await.quizzes.get(&quiz_id).cloned())
    }

    async fn list_quizzes(&self, class_id: i64) -> Result<Vec<QuizDetail>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .quizzes
            .values()
            .filter(|q| q.quiz.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn delete_quiz(&self, quiz_id: i64) -> Result<bool, AppError> {
        let mut inner = self.inner.write().await;
        if inner.quizzes.remove(&quiz_id).is_none() {
            return Ok(false);
        }
        inner.submissions.retain(|s| s.quiz_id != quiz_id);
        Ok(true)
    }

    async fn find_finished_submission(
        &self,
        quiz_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .submissions
            .iter()
            .find(|s| {
                s.quiz_id == quiz_id
                    && s.student_id == student_id
                    && s.status == SubmissionStatus::Finished
            })
            .cloned())
    }

    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission, AppError> {
        let mut inner = self.inner.write().await;

        let duplicate = inner.submissions.iter().any(|s| {
            s.quiz_id == new.quiz_id
                && s.student_id == new.student_id
                && s.status == SubmissionStatus::Finished
        });
        if duplicate {
            return Err(AppError::AlreadySubmitted);
        }
        if !inner.quizzes.contains_key(&new.quiz_id) {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }

        let submission = Submission {
            id: inner.next_id(),
            quiz_id: new.quiz_id,
            student_id: new.student_id,
            answers: Json(new.answers),
            score: new.score,
            status: SubmissionStatus::Finished,
            created_at: Utc::now(),
        };
        inner.submissions.push(submission.clone());
        Ok(submission)
    }

    async fn list_student_submissions(&self, student_id: i64) -> Result<Vec<Submission>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .submissions
            .iter()
            .filter(|s| s.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn list_quiz_submissions(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<SubmissionWithStudent>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .submissions
            .iter()
            .filter(|s| s.quiz_id == quiz_id)
            .map(|s| SubmissionWithStudent {
                submission: s.clone(),
                student_name: inner.student_name(s.student_id),
            })
            .collect())
    }

    async fn list_class_submissions(&self, class_id: i64) -> Result<Vec<Submission>, AppError> {
        let inner = self.inner.read().await;
        let quiz_ids = inner.class_quiz_ids(class_id);
        Ok(inner
            .submissions
            .iter()
            .filter(|s| quiz_ids.contains(&s.quiz_id))
            .cloned()
            .collect())
    }

    async fn insert_assignment(&self, new: NewAssignment) -> Result<Assignment, AppError> {
        let mut inner = self.inner.write().await;
        let assignment = Assignment {
            id: inner.next_id(),
            class_id: new.class_id,
            title: new.title,
            description: new.description,
            due_date: new.due_date,
            created_at: Utc::now(),
        };
        inner.assignments.insert(assignment.id, assignment.clone());
        Ok(assignment)
    }

    async fn get_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, AppError> {
        Ok(self.inner.read().await.assignments.get(&assignment_id).cloned())
    }

    async fn list_assignments(&self, class_id: i64) -> Result<Vec<Assignment>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .assignments
            .values()
            .filter(|a| a.class_id == class_id)
            .cloned()
            .collect())
    }

    async fn list_assignment_submissions(
        &self,
        class_id: i64,
    ) -> Result<Vec<AssignmentSubmission>, AppError> {
        let inner = self.inner.read().await;
        Ok(inner
            .assignment_submissions
            .iter()
            .filter(|s| {
                inner
                    .assignments
                    .get(&s.assignment_id)
                    .is_some_and(|a| a.class_id == class_id)
            })
            .cloned()
            .collect())
    }

    async fn upsert_assignment_grade(
        &self,
        assignment_id: i64,
        student_id: i64,
        grade: String,
        feedback: Option<String>,
    ) -> Result<AssignmentSubmission, AppError> {
        let mut inner = self.inner.write().await;

        if let Some(existing) = inner
            .assignment_submissions
            .iter_mut()
            .find(|s| s.assignment_id == assignment_id && s.student_id == student_id)
        {
            existing.grade = Some(grade);
            existing.feedback = feedback;
            existing.status = "completed".to_string();
            existing.updated_at = Utc::now();
            return Ok(existing.clone());
        }

        let row = AssignmentSubmission {
            id: inner.next_id(),
            assignment_id,
            student_id,
            grade: Some(grade),
            feedback,
            status: "completed".to_string(),
            updated_at: Utc::now(),
        };
        inner.assignment_submissions.push(row.clone());
        Ok(row)
    }
}
