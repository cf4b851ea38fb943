// src/services/ledger.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    error::{AppError, FieldError},
    models::{
        question::{PublicQuestion, Question},
        quiz::{InstructorQuizView, QuizDetail, StudentQuizView},
        submission::{AnswerSheet, NewSubmission, Submission, SubmissionWithStudent, SubmitOutcome},
        user::Actor,
    },
    services::{scoring, window},
    store::QuizStore,
};

/// Longest free-text answer accepted per question, in characters.
pub const MAX_ANSWER_CHARS: usize = 10_000;

/// Records a student's single scored attempt.
///
/// Order of checks: quiz exists, caller is an enrolled student, no prior
/// finished attempt, the clock is inside the delivery window, every answer
/// key names a question of this quiz. The store insert re-checks the
/// `(quiz, student)` key atomically, so a concurrent duplicate still fails
/// with `AlreadySubmitted`.
pub async fn submit_quiz(
    store: &dyn QuizStore,
    actor: Actor,
    quiz_id: i64,
    answers: AnswerSheet,
    now: DateTime<Utc>,
) -> Result<SubmitOutcome, AppError> {
    if actor.is_instructor() {
        return Err(AppError::Forbidden("Only students can submit quizzes".to_string()));
    }

    let quiz = store
        .get_quiz(quiz_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    if !store.is_enrolled(quiz.quiz.class_id, actor.id).await? {
        return Err(AppError::Forbidden("You are not enrolled in this class".to_string()));
    }

    if store.find_finished_submission(quiz_id, actor.id).await?.is_some() {
        tracing::warn!(quiz_id, student_id = actor.id, "duplicate quiz submission rejected");
        return Err(AppError::AlreadySubmitted);
    }

    window::ensure_within_window(&quiz.quiz, now)?;

    validate_answers(&quiz, &answers)?;

    // Essay similarity is CPU-bound; keep it off the async workers.
    let questions: Vec<Question> = quiz.question_rows().cloned().collect();
    let (report, answers) = tokio::task::spawn_blocking(move || {
        let report = scoring::score_answers(&questions, &answers);
        (report, answers)
    })
    .await
    .map_err(|e| AppError::InternalServerError(format!("Scoring task failed: {}", e)))?;

    let submission = store
        .insert_submission(NewSubmission {
            quiz_id,
            student_id: actor.id,
            answers,
            score: report.score,
        })
        .await
        .inspect_err(|e| {
            if matches!(e, AppError::AlreadySubmitted) {
                tracing::warn!(
                    quiz_id,
                    student_id = actor.id,
                    "concurrent quiz submission lost the race"
                );
            }
        })?;

    tracing::info!(
        quiz_id,
        student_id = actor.id,
        score = report.score,
        total = report.total,
        "quiz submitted"
    );

    Ok(SubmitOutcome {
        score: report.score,
        total: report.total,
        submission,
    })
}

/// Every key must be a question of this quiz; free text is length-capped.
pub fn validate_answers(quiz: &QuizDetail, answers: &AnswerSheet) -> Result<(), AppError> {
    let mut errors = Vec::new();

    for (question_id, answer) in answers {
        let field = format!("answers.{}", question_id);
        if !quiz.question_rows().any(|q| q.id == *question_id) {
            errors.push(FieldError::new(
                field,
                "unknown_question",
                format!("question {} is not part of this quiz", question_id),
            ));
        } else if answer
            .as_deref()
            .is_some_and(|a| a.chars().count() > MAX_ANSWER_CHARS)
        {
            errors.push(FieldError::new(
                field,
                "length",
                format!("answer exceeds {} characters", MAX_ANSWER_CHARS),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub async fn list_my_submissions(
    store: &dyn QuizStore,
    actor: Actor,
) -> Result<Vec<Submission>, AppError> {
    store.list_student_submissions(actor.id).await
}

/// Instructor review: all attempts at a quiz with the student's name.
pub async fn list_quiz_submissions(
    store: &dyn QuizStore,
    actor: Actor,
    quiz_id: i64,
) -> Result<Vec<SubmissionWithStudent>, AppError> {
    if !actor.is_instructor() {
        return Err(AppError::Forbidden("Only instructors can review submissions".to_string()));
    }
    if store.get_quiz(quiz_id).await?.is_none() {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    store.list_quiz_submissions(quiz_id).await
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QuizListing {
    Instructor(Vec<InstructorQuizView>),
    Student(Vec<StudentQuizView>),
}

/// Quizzes of a class, newest first, shaped for the caller's role.
pub async fn list_quizzes(
    store: &dyn QuizStore,
    actor: Actor,
    class_id: i64,
    now: DateTime<Utc>,
) -> Result<QuizListing, AppError> {
    if !store.class_exists(class_id).await? {
        return Err(AppError::NotFound("Class not found".to_string()));
    }

    let mut quizzes = store.list_quizzes(class_id).await?;
    quizzes.sort_by(|a, b| {
        (b.quiz.created_at, b.quiz.id).cmp(&(a.quiz.created_at, a.quiz.id))
    });

    if actor.is_instructor() {
        let mut views = Vec::with_capacity(quizzes.len());
        for detail in quizzes {
            let submissions = store.list_quiz_submissions(detail.quiz.id).await?;
            views.push(InstructorQuizView {
                total_possible: scoring::total_possible(detail.question_rows()),
                quiz: detail.quiz,
                questions: detail.questions,
                submissions,
            });
        }
        return Ok(QuizListing::Instructor(views));
    }

    if !store.is_enrolled(class_id, actor.id).await? {
        return Err(AppError::Forbidden("You are not enrolled in this class".to_string()));
    }

    let mut mine: HashMap<i64, Submission> = store
        .list_student_submissions(actor.id)
        .await?
        .into_iter()
        .map(|s| (s.quiz_id, s))
        .collect();

    let views = quizzes
        .into_iter()
        .map(|detail| {
            let my_submission = mine.remove(&detail.quiz.id);
            StudentQuizView {
                total_possible: scoring::total_possible(detail.question_rows()),
                window: window::classify_quiz(&detail.quiz, now, my_submission.is_some()),
                questions: detail.questions.iter().map(PublicQuestion::from).collect(),
                quiz: detail.quiz,
                my_submission,
            }
        })
        .collect();

    Ok(QuizListing::Student(views))
}

pub async fn delete_quiz(
    store: &dyn QuizStore,
    actor: Actor,
    quiz_id: i64,
) -> Result<(), AppError> {
    if !actor.is_instructor() {
        return Err(AppError::Forbidden("Only instructors can delete quizzes".to_string()));
    }
    if !store.delete_quiz(quiz_id).await? {
        return Err(AppError::NotFound("Quiz not found".to_string()));
    }
    tracing::info!(quiz_id, instructor_id = actor.id, "quiz deleted");
    Ok(())
}
