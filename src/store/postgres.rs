// src/store/postgres.rs

use std::{collections::HashMap, str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    PgPool,
    postgres::{PgConnectOptions, PgPoolOptions},
    types::Json,
};

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

const QUIZ_COLUMNS: &str =
    "id, class_id, title, description, start_time, end_time, duration_minutes, quiz_type, created_at";
const QUESTION_COLUMNS: &str =
    "id, quiz_id, position, question_text, type, correct_answer, reference_answer, min_score, max_score";
const SUBMISSION_COLUMNS: &str = "id, quiz_id, student_id, answers, score, status, created_at";
const ASSIGNMENT_COLUMNS: &str = "id, class_id, title, description, due_date, created_at";
const ASSIGNMENT_SUBMISSION_COLUMNS: &str =
    "id, assignment_id, student_id, grade, feedback, status, updated_at";

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Connects with a bounded acquire wait and a server-side `statement_timeout`,
    /// so a stuck query surfaces as an error instead of hanging the request.
    pub async fn connect(database_url: &str, timeout: Duration) -> Result<Self, sqlx::Error> {
        let statement_timeout = format!("{}", timeout.as_millis());
        let options = PgConnectOptions::from_str(database_url)?
            .options([("statement_timeout", statement_timeout.as_str())]);

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(timeout)
            .connect_with(options)
            .await?;

        Ok(Self::new(pool))
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Attaches questions (by position) and choices to each quiz.
    async fn hydrate(&self, quizzes: Vec<Quiz>) -> Result<Vec<QuizDetail>, AppError> {
        if quizzes.is_empty() {
            return Ok(Vec::new());
        }

        let quiz_ids: Vec<i64> = quizzes.iter().map(|q| q.id).collect();
        let questions = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE quiz_id = ANY($1) ORDER BY quiz_id, position"
        ))
        .bind(&quiz_ids)
        .fetch_all(&self.pool)
        .await?;

        let question_ids: Vec<i64> = questions.iter().map(|q| q.id).collect();
        let choices = sqlx::query_as::<_, Choice>(
            "SELECT id, question_id, label, text FROM choices WHERE question_id = ANY($1) ORDER BY id",
        )
        .bind(&question_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut choices_by_question: HashMap<i64, Vec<Choice>> = HashMap::new();
        for choice in choices {
            choices_by_question
                .entry(choice.question_id)
                .or_default()
                .push(choice);
        }

        let mut questions_by_quiz: HashMap<i64, Vec<QuestionDetail>> = HashMap::new();
        for question in questions {
            let choices = choices_by_question.remove(&question.id).unwrap_or_default();
            questions_by_quiz
                .entry(question.quiz_id)
                .or_default()
                .push(QuestionDetail { question, choices });
        }

        Ok(quizzes
            .into_iter()
            .map(|quiz| QuizDetail {
                questions: questions_by_quiz.remove(&quiz.id).unwrap_or_default(),
                quiz,
            })
            .collect())
    }
}

fn construction_failed(err: sqlx::Error) -> AppError {
    tracing::error!("Quiz construction rolled back: {:?}", err);
    AppError::Persistence(format!("Failed to create quiz: {}", err))
}

#[async_trait]
impl QuizStore for PgStore {
    async fn class_exists(&self, class_id: i64) -> Result<bool, AppError> {
        let found = sqlx::query_scalar::<_, i64>("SELECT id FROM classes WHERE id = $1")
            .bind(class_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    async fn class_roster(&self, class_id: i64) -> Result<Vec<Student>, AppError> {
        let roster = sqlx::query_as::<_, Student>(
            r#"
            SELECT u.id, u.name
            FROM class_students cs
            JOIN users u ON u.id = cs.student_id
            WHERE cs.class_id = $1
            ORDER BY cs.id
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(roster)
    }

    async fn is_enrolled(&self, class_id: i64, student_id: i64) -> Result<bool, AppError> {
        let found = sqlx::query_scalar::<_, i64>(
            "SELECT id FROM class_students WHERE class_id = $1 AND student_id = $2",
        )
        .bind(class_id)
        .bind(student_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(found.is_some())
    }

    async fn insert_quiz(&self, new: NewQuiz) -> Result<QuizDetail, AppError> {
        // Dropping `tx` without commit rolls every insert back.
        let mut tx = self.pool.begin().await.map_err(construction_failed)?;

        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            r#"
            INSERT INTO quizzes (class_id, title, description, start_time, end_time, duration_minutes, quiz_type)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {QUIZ_COLUMNS}
            "#
        ))
        .bind(new.class_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(new.duration_minutes)
        .bind(new.quiz_type)
        .fetch_one(&mut *tx)
        .await
        .map_err(construction_failed)?;

        let mut questions = Vec::with_capacity(new.questions.len());
        for (position, q) in new.questions.iter().enumerate() {
            let question = sqlx::query_as::<_, Question>(&format!(
                r#"
                INSERT INTO questions
                    (quiz_id, position, question_text, type, correct_answer, reference_answer, min_score, max_score)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING {QUESTION_COLUMNS}
                "#
            ))
            .bind(quiz.id)
            .bind(position as i32)
            .bind(&q.question_text)
            .bind(q.question_type)
            .bind(&q.correct_answer)
            .bind(&q.reference_answer)
            .bind(q.min_score)
            .bind(q.max_score)
            .fetch_one(&mut *tx)
            .await
            .map_err(construction_failed)?;

            let mut choices = Vec::with_capacity(q.choices.len());
            for c in &q.choices {
                let choice = sqlx::query_as::<_, Choice>(
                    r#"
                    INSERT INTO choices (question_id, label, text)
                    VALUES ($1, $2, $3)
                    RETURNING id, question_id, label, text
                    "#,
                )
                .bind(question.id)
                .bind(&c.label)
                .bind(&c.text)
                .fetch_one(&mut *tx)
                .await
                .map_err(construction_failed)?;
                choices.push(choice);
            }

            questions.push(QuestionDetail { question, choices });
        }

        tx.commit().await.map_err(construction_failed)?;

        Ok(QuizDetail { quiz, questions })
    }

    async fn get_quiz(&self, quiz_id: i64) -> Result<Option<QuizDetail>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE id = $1"
        ))
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        match quiz {
            Some(quiz) => Ok(self.hydrate(vec![quiz]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_quizzes(&self, class_id: i64) -> Result<Vec<QuizDetail>, AppError> {
        let quizzes = sqlx::query_as::<_, Quiz>(&format!(
            "SELECT {QUIZ_COLUMNS} FROM quizzes WHERE class_id = $1 ORDER BY id"
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;

        self.hydrate(quizzes).await
    }

    async fn delete_quiz(&self, quiz_id: i64) -> Result<bool, AppError> {
        // questions, choices and quiz_submissions cascade.
        let result = sqlx::query("DELETE FROM quizzes WHERE id = $1")
            .bind(quiz_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_finished_submission(
        &self,
        quiz_id: i64,
        student_id: i64,
    ) -> Result<Option<Submission>, AppError> {
        let submission = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions WHERE quiz_id = $1 AND student_id = $2 AND status = $3"
        ))
        .bind(quiz_id)
        .bind(student_id)
        .bind(SubmissionStatus::Finished)
        .fetch_optional(&self.pool)
        .await?;
        Ok(submission)
    }

    async fn insert_submission(&self, new: NewSubmission) -> Result<Submission, AppError> {
        // The partial unique index on (quiz_id, student_id) is the serialization point:
        // of two racing inserts, exactly one returns a row.
        let inserted = sqlx::query_as::<_, Submission>(&format!(
            r#"
            INSERT INTO quiz_submissions (quiz_id, student_id, answers, score, status)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (quiz_id, student_id) WHERE status = 'finished' DO NOTHING
            RETURNING {SUBMISSION_COLUMNS}
            "#
        ))
        .bind(new.quiz_id)
        .bind(new.student_id)
        .bind(Json(&new.answers))
        .bind(new.score)
        .bind(SubmissionStatus::Finished)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::AlreadySubmitted;
                }
                if db.is_foreign_key_violation() {
                    return AppError::NotFound("Quiz not found".to_string());
                }
            }
            AppError::from(e)
        })?;

        inserted.ok_or(AppError::AlreadySubmitted)
    }

    async fn list_student_submissions(&self, student_id: i64) -> Result<Vec<Submission>, AppError> {
        let submissions = sqlx::query_as::<_, Submission>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM quiz_submissions WHERE student_id = $1 ORDER BY created_at, id"
        ))
        .bind(student_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    async fn list_quiz_submissions(
        &self,
        quiz_id: i64,
    ) -> Result<Vec<SubmissionWithStudent>, AppError> {
        let submissions = sqlx::query_as::<_, SubmissionWithStudent>(
            r#"
            SELECT
                s.id, s.quiz_id, s.student_id, s.answers, s.score, s.status, s.created_at,
                u.name AS student_name
            FROM quiz_submissions s
            JOIN users u ON u.id = s.student_id
            WHERE s.quiz_id = $1
            ORDER BY s.created_at, s.id
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    async fn list_class_submissions(&self, class_id: i64) -> Result<Vec<Submission>, AppError> {
        let submissions = sqlx::query_as::<_, Submission>(
            r#"
            SELECT s.id, s.quiz_id, s.student_id, s.answers, s.score, s.status, s.created_at
            FROM quiz_submissions s
            JOIN quizzes q ON q.id = s.quiz_id
            WHERE q.class_id = $1
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    async fn insert_assignment(&self, new: NewAssignment) -> Result<Assignment, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(&format!(
            r#"
            INSERT INTO assignments (class_id, title, description, due_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {ASSIGNMENT_COLUMNS}
            "#
        ))
        .bind(new.class_id)
        .bind(&new.title)
        .bind(&new.description)
        .bind(new.due_date)
        .fetch_one(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn get_assignment(&self, assignment_id: i64) -> Result<Option<Assignment>, AppError> {
        let assignment = sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE id = $1"
        ))
        .bind(assignment_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(assignment)
    }

    async fn list_assignments(&self, class_id: i64) -> Result<Vec<Assignment>, AppError> {
        let assignments = sqlx::query_as::<_, Assignment>(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM assignments WHERE class_id = $1 ORDER BY id"
        ))
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(assignments)
    }

    async fn list_assignment_submissions(
        &self,
        class_id: i64,
    ) -> Result<Vec<AssignmentSubmission>, AppError> {
        let rows = sqlx::query_as::<_, AssignmentSubmission>(
            r#"
            SELECT s.id, s.assignment_id, s.student_id, s.grade, s.feedback, s.status, s.updated_at
            FROM assignment_submissions s
            JOIN assignments a ON a.id = s.assignment_id
            WHERE a.class_id = $1
            "#,
        )
        .bind(class_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_assignment_grade(
        &self,
        assignment_id: i64,
        student_id: i64,
        grade: String,
        feedback: Option<String>,
    ) -> Result<AssignmentSubmission, AppError> {
        let row = sqlx::query_as::<_, AssignmentSubmission>(&format!(
            r#"
            INSERT INTO assignment_submissions (assignment_id, student_id, grade, feedback, status)
            VALUES ($1, $2, $3, $4, 'completed')
            ON CONFLICT (assignment_id, student_id) DO UPDATE SET
                grade = EXCLUDED.grade,
                feedback = EXCLUDED.feedback,
                status = 'completed',
                updated_at = NOW()
            RETURNING {ASSIGNMENT_SUBMISSION_COLUMNS}
            "#
        ))
        .bind(assignment_id)
        .bind(student_id)
        .bind(grade)
        .bind(feedback)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }
}
