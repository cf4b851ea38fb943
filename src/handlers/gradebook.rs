// src/handlers/gradebook.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    models::assignment::{CreateAssignmentRequest, GradeAssignmentRequest},
    services::gradebook,
    store::SharedStore,
    utils::{json::AppJson, jwt::Claims},
};

/// Per-student grade table for a class. Recomputed on every request.
pub async fn get_gradebook(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let actor = claims.actor()?;
    let book = gradebook::gradebook_for_class(store.as_ref(), actor, class_id).await?;

    Ok(Json(book))
}

pub async fn create_assignment(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path(class_id): Path<i64>,
    AppJson(payload): AppJson<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let actor = claims.actor()?;
    let assignment = gradebook::create_assignment(store.as_ref(), actor, class_id, payload).await?;

    Ok((StatusCode::CREATED, Json(serde_json::json!({ "assignment": assignment }))))
}

/// Records (or overwrites) a student's grade on an assignment.
pub async fn grade_assignment(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
    Path((assignment_id, student_id)): Path<(i64, i64)>,
    AppJson(payload): AppJson<GradeAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let actor = claims.actor()?;
    let submission =
        gradebook::grade_assignment(store.as_ref(), actor, assignment_id, student_id, payload)
            .await?;

    Ok(Json(serde_json::json!({ "success": true, "submission": submission })))
}
