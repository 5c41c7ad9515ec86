// src/routes.rs

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Method,
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::{
    handlers::{answer, auth, exam, question, upload},
    state::AppState,
    utils::jwt::{admin_middleware, auth_middleware},
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (auth, users, exams, questions, answers, uploads).
/// * Applies global middleware (Trace, CORS) and serves the upload directory.
/// * Injects global state (pool, config, token blacklist).
///
/// Authentication runs per sub-router; role enforcement happens inside the
/// handlers via `Role` capability checks, except for the Admin-only routes
/// which share a dedicated middleware.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let authenticated = middleware::from_fn_with_state(state.clone(), auth_middleware);

    let auth_routes = Router::new()
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .layer(authenticated.clone()),
        )
        .merge(
            Router::new()
                .route("/register", post(auth::register))
                // Double middleware protection: Auth first, then Admin check
                .layer(middleware::from_fn(admin_middleware))
                .layer(authenticated.clone()),
        );

    let user_routes = Router::new()
        .route("/", get(auth::list_users))
        .layer(middleware::from_fn(admin_middleware))
        .layer(authenticated.clone());

    let exam_routes = Router::new()
        .route("/", post(exam::create_exam).get(exam::list_exams))
        .route(
            "/{id}",
            get(exam::get_exam)
                .put(exam::update_exam)
                .delete(exam::delete_exam),
        )
        .layer(authenticated.clone());

    let question_routes = Router::new()
        .route("/", post(question::create_question))
        .route("/guru", get(question::list_for_teacher))
        .route("/siswa", get(question::list_for_student))
        .route("/random/{exam_id}", get(question::random_question))
        .route(
            "/{id}",
            get(question::get_question)
                .put(question::update_question)
                .delete(question::delete_question),
        )
        .route("/{id}/image", get(question::download_image))
        .layer(authenticated.clone());

    let answer_routes = Router::new()
        .route("/", post(answer::submit_answer).get(answer::list_answers))
        .layer(authenticated.clone());

    let upload_routes = Router::new()
        .route("/questions", post(upload::upload_question_image))
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .layer(authenticated.clone());

    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api/users", user_routes)
        .nest("/api/exams", exam_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/answers", answer_routes)
        .nest("/api/uploads", upload_routes)
        .nest_service("/uploads", ServeDir::new(&state.config.upload_dir))
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
