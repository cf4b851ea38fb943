// src/routes.rs

use axum::{
    Router,
    http::{HeaderValue, Method, StatusCode},
    middleware,
    routing::{delete, get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::{
    handlers::{gradebook, quiz},
    state::AppState,
    utils::jwt::{auth_middleware, instructor_middleware},
};

/// Assembles the main application router.
///
/// * Every route requires a bearer token; authoring and grading routes also require the instructor role.
/// * Applies global middleware (Trace, CORS, request timeout).
/// * Injects global state (store + config).
pub fn create_router(state: AppState) -> Router {
    let origins = [
        HeaderValue::from_static("http://localhost:3000"),
        HeaderValue::from_static("http://127.0.0.1:3000"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    // Students and instructors
    let member_routes = Router::new()
        .route("/classes/{class_id}/quizzes", get(quiz::list_quizzes))
        .route("/quizzes/{quiz_id}/submit", post(quiz::submit_quiz))
        .route("/submissions/mine", get(quiz::my_submissions));

    // Instructor only: auth first, then the role check
    let instructor_routes = Router::new()
        .route("/quizzes", post(quiz::create_quiz))
        .route("/quizzes/{quiz_id}", delete(quiz::delete_quiz))
        .route("/quizzes/{quiz_id}/submissions", get(quiz::list_quiz_submissions))
        .route("/classes/{class_id}/gradebook", get(gradebook::get_gradebook))
        .route("/classes/{class_id}/assignments", post(gradebook::create_assignment))
        .route(
            "/assignments/{assignment_id}/grades/{student_id}",
            put(gradebook::grade_assignment),
        )
        .layer(middleware::from_fn(instructor_middleware));

    let api = member_routes
        .merge(instructor_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", api)
        // Global Middleware (applied from outside in)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(TimeoutLayer::with_status_code(
                    StatusCode::REQUEST_TIMEOUT,
                    state.config.request_timeout,
                )),
        )
        .with_state(state)
}
