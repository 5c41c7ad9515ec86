// src/handlers/answer.rs

use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    handlers::{auth::is_unique_violation, exam::validate_participant_access},
    models::{
        answer::{Answer, SubmitAnswerRequest},
        question::Question,
    },
    utils::jwt::Claims,
};

/// Records one participant's answer to one question. Siswa only.
///
/// At most one answer per (participant, question): the existence check
/// catches the common case with a friendly message, and the UNIQUE
/// constraint on the answers table catches the race between two
/// concurrent submissions, both surfacing as 409.
///
/// `points_awarded` starts at 0. Grading happens only through the
/// re-grading pass when the question is edited.
pub async fn submit_answer(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<SubmitAnswerRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_take_exams() {
        return Err(AppError::Forbidden(
            "Only Siswa can submit answers".to_string(),
        ));
    }

    let question_id = payload
        .question_id
        .ok_or_else(|| AppError::BadRequest("question_id is required".to_string()))?;

    let user_id = claims.user_id();

    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(question_id)
        .fetch_optional(&pool)
        .await?
        .filter(|q| q.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    validate_participant_access(&pool, question.exam_id, user_id, Utc::now()).await?;

    let existing = sqlx::query_scalar::<_, i64>(
        "SELECT id FROM answers WHERE user_id = ? AND question_id = ?",
    )
    .bind(user_id)
    .bind(question_id)
    .fetch_optional(&pool)
    .await?;

    if existing.is_some() {
        return Err(AppError::Conflict(
            "You have already answered this question".to_string(),
        ));
    }

    let result = sqlx::query(
        "INSERT INTO answers (user_id, question_id, answer, status, note) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(question_id)
    .bind(&payload.answer)
    .bind(&payload.status)
    .bind(&payload.note)
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("You have already answered this question".to_string())
        } else {
            tracing::error!("Failed to save answer: {:?}", e);
            AppError::InternalServerError(e.to_string())
        }
    })?;

    let answer = sqlx::query_as::<_, Answer>("SELECT * FROM answers WHERE id = ?")
        .bind(result.last_insert_rowid())
        .fetch_one(&pool)
        .await?;

    Ok((StatusCode::CREATED, Json(answer)))
}

#[derive(Debug, Deserialize)]
pub struct ListAnswersParams {
    pub question_id: Option<i64>,
}

/// Lists all answers to one question, newest first. Guru/Admin only.
pub async fn list_answers(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListAnswersParams>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_review_answers() {
        return Err(AppError::Forbidden(
            "Only Guru / Admin can access this endpoint".to_string(),
        ));
    }

    let question_id = params
        .question_id
        .ok_or_else(|| AppError::BadRequest("question_id parameter is required".to_string()))?;

    let answers = sqlx::query_as::<_, Answer>(
        "SELECT * FROM answers WHERE question_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(question_id)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list answers: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    Ok(Json(answers))
}
