// src/handlers/quiz.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    error::AppError,
    models::{quiz::CreateQuizRequest, submission::SubmitQuizRequest},
    services::{builder, ledger},
    store::SharedStore,
    utils::{json::AppJson, jwt::Claims},
};

/// Creates a quiz with its questions and choices in one step.
///
/// * Instructor only.
/// * Returns 201 with the fully hydrated quiz so the client can render it immediately.
pub async fn create_quiz(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    AppJson(payload): AppJson<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let quiz = builder::create_quiz(store.as_ref(), actor, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "Quiz created successfully",
            "quiz": quiz,
        })),
    ))
}

/// Lists a class's quizzes, newest first.
/// Students get questions without answer keys and their own window state.
pub async fn list_quizzes(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let quizzes = ledger::list_quizzes(store.as_ref(), actor, class_id, Utc::now()).await?;

    Ok(Json(serde_json::json!({ "quizzes": quizzes })))
}

/// Submits the caller's answers and returns the computed score.
///
/// * Rejects a second attempt with 409.
/// * Rejects attempts outside the delivery window with 403, whatever the client timer says.
pub async fn submit_quiz(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
    AppJson(payload): AppJson<SubmitQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let actor = claims.actor()?;
    let answers = payload.answers.unwrap_or_default();

    let outcome = ledger::submit_quiz(store.as_ref(), actor, quiz_id, answers, Utc::now()).await?;

    Ok(Json(serde_json::json!({
        "message": "Quiz submitted successfully",
        "score": outcome.score,
        "total": outcome.total,
        "submission": outcome.submission,
    })))
}

/// Instructor review of every attempt at a quiz.
pub async fn list_quiz_submissions(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let submissions = ledger::list_quiz_submissions(store.as_ref(), actor, quiz_id).await?;

    Ok(Json(serde_json::json!({ "submissions": submissions })))
}

/// The caller's own finished attempts; clients use it to disable taken quizzes.
pub async fn my_submissions(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let submissions = ledger::list_my_submissions(store.as_ref(), actor).await?;

    Ok(Json(serde_json::json!({ "quiz_submissions": submissions })))
}

pub async fn delete_quiz(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(quiz_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    ledger::delete_quiz(store.as_ref(), actor, quiz_id).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}
