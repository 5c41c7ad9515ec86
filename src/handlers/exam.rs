// src/handlers/exam.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    error::AppError,
    models::exam::{CreateExamRequest, Exam, UpdateExamRequest},
    utils::jwt::Claims,
};

/// Loads an exam and checks the caller may take it right now.
///
/// Fails with NotFound for a missing or soft-deleted exam, Forbidden when
/// the caller is not on the roster or the current time is outside the
/// exam window. Pure read/check: gates both question fetching and answer
/// submission, with no side effects.
pub(crate) async fn validate_participant_access(
    pool: &SqlitePool,
    exam_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Exam, AppError> {
    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = ?")
        .bind(exam_id)
        .fetch_optional(pool)
        .await?
        .filter(|e| e.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))?;

    if !exam.is_enrolled(user_id) {
        return Err(AppError::Forbidden(
            "You are not enrolled in this exam".to_string(),
        ));
    }

    if !exam.has_started(now) {
        return Err(AppError::Forbidden(
            "Exam has not started yet. Wait for the start time.".to_string(),
        ));
    }

    if exam.has_ended(now) {
        return Err(AppError::Forbidden("Exam time is over.".to_string()));
    }

    Ok(exam)
}

async fn fetch_exam(pool: &SqlitePool, id: i64) -> Result<Exam, AppError> {
    sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .filter(|e| e.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound("Exam not found".to_string()))
}

/// Creates a new exam. Guru only.
pub async fn create_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_manage_exams() {
        return Err(AppError::Forbidden(
            "Only Guru can manage exams".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    if payload.start_at > payload.end_at {
        return Err(AppError::BadRequest(
            "start_at must not be after end_at".to_string(),
        ));
    }

    let participants = serde_json::to_string(&payload.participants)?;

    let result = sqlx::query(
        "INSERT INTO exams (class_term_id, kind, participants, start_at, end_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(payload.class_term_id)
    .bind(&payload.kind)
    .bind(&participants)
    .bind(payload.start_at)
    .bind(payload.end_at)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let exam = sqlx::query_as::<_, Exam>("SELECT * FROM exams WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&pool)
        .await?;

    Ok((StatusCode::CREATED, Json(exam)))
}

#[derive(Debug, Deserialize)]
pub struct ListExamsParams {
    pub class_term_id: Option<i64>,
}

/// Lists non-deleted exams, optionally filtered by class offering.
/// Guru/Admin only.
pub async fn list_exams(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListExamsParams>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_review_answers() {
        return Err(AppError::Forbidden(
            "Only Guru / Admin can access this endpoint".to_string(),
        ));
    }

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM exams WHERE deleted_at IS NULL");

    if let Some(class_term_id) = params.class_term_id {
        builder.push(" AND class_term_id = ");
        builder.push_bind(class_term_id);
    }

    builder.push(" ORDER BY created_at DESC, id DESC");

    let exams: Vec<Exam> = builder.build_query_as().fetch_all(&pool).await?;

    Ok(Json(exams))
}

/// Fetches one exam by id. Guru/Admin only.
pub async fn get_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_review_answers() {
        return Err(AppError::Forbidden(
            "Only Guru / Admin can access this endpoint".to_string(),
        ));
    }

    let exam = fetch_exam(&pool, id).await?;

    Ok(Json(exam))
}

/// Updates an exam. Guru only. Fields are optional; the window invariant
/// (start <= end) is re-checked against the effective values.
pub async fn update_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateExamRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_manage_exams() {
        return Err(AppError::Forbidden(
            "Only Guru can manage exams".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let exam = fetch_exam(&pool, id).await?;

    let start_at = payload.start_at.unwrap_or(exam.start_at);
    let end_at = payload.end_at.unwrap_or(exam.end_at);
    if start_at > end_at {
        return Err(AppError::BadRequest(
            "start_at must not be after end_at".to_string(),
        ));
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE exams SET ");
    let mut separated = builder.separated(", ");

    if let Some(class_term_id) = payload.class_term_id {
        separated.push("class_term_id = ");
        separated.push_bind_unseparated(class_term_id);
    }

    if let Some(kind) = payload.kind {
        separated.push("kind = ");
        separated.push_bind_unseparated(kind);
    }

    if let Some(participants) = payload.participants {
        separated.push("participants = ");
        separated.push_bind_unseparated(serde_json::to_string(&participants)?);
    }

    if let Some(start_at) = payload.start_at {
        separated.push("start_at = ");
        separated.push_bind_unseparated(start_at);
    }

    if let Some(end_at) = payload.end_at {
        separated.push("end_at = ");
        separated.push_bind_unseparated(end_at);
    }

    separated.push("updated_at = CURRENT_TIMESTAMP");

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let exam = fetch_exam(&pool, id).await?;

    Ok(Json(exam))
}

/// Soft-deletes an exam. Guru only.
pub async fn delete_exam(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_manage_exams() {
        return Err(AppError::Forbidden(
            "Only Guru can manage exams".to_string(),
        ));
    }

    let result = sqlx::query(
        "UPDATE exams SET deleted_at = CURRENT_TIMESTAMP WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to delete exam: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    Ok(StatusCode::NO_CONTENT)
}
