// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::Utc;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    grading,
    handlers::exam::validate_participant_access,
    models::question::{
        CreateQuestionRequest, PublicQuestion, Question, QuestionKind, UpdateQuestionRequest,
    },
    utils::jwt::Claims,
};

/// Teacher-facing question payload: the full row plus a ready-made URL for
/// the image attachment.
#[derive(Debug, Serialize)]
struct QuestionWithUrl {
    #[serde(flatten)]
    question: Question,
    image_url: Option<String>,
}

impl From<Question> for QuestionWithUrl {
    fn from(question: Question) -> Self {
        let image_url = question
            .image
            .as_deref()
            .map(|f| format!("/uploads/questions/{}", f));
        QuestionWithUrl {
            question,
            image_url,
        }
    }
}

async fn fetch_question(pool: &SqlitePool, id: i64) -> Result<Question, AppError> {
    sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .filter(|q| q.deleted_at.is_none())
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
}

fn parse_kind(s: &str) -> Result<QuestionKind, AppError> {
    QuestionKind::from_str(s).ok_or_else(|| {
        AppError::BadRequest(
            "Kind must be one of pilihan_ganda_satu, pilihan_ganda_banyak, isian, uraian"
                .to_string(),
        )
    })
}

fn validate_choices(choices: &[String]) -> Result<(), AppError> {
    if choices.is_empty() {
        return Err(AppError::BadRequest("Choices cannot be empty".to_string()));
    }
    for c in choices {
        if c.len() > 500 {
            return Err(AppError::BadRequest(
                "Each choice must be at most 500 characters".to_string(),
            ));
        }
    }
    Ok(())
}

/// An image reference must be a bare filename as produced by the upload
/// endpoint. Separators or parent components would let the stored value
/// escape the questions directory when it is later read or removed.
fn validate_image_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(AppError::BadRequest(
            "image must be a plain filename returned by the upload endpoint".to_string(),
        ));
    }
    Ok(())
}

/// A multi-choice answer key must itself be a JSON array.
fn validate_answer_key(kind: QuestionKind, key: &str) -> Result<(), AppError> {
    if kind == QuestionKind::MultiChoice && serde_json::from_str::<Vec<String>>(key).is_err() {
        return Err(AppError::BadRequest(
            "answer_key must be a JSON array for multi-choice questions".to_string(),
        ));
    }
    Ok(())
}

/// Creates a new question. Guru only.
pub async fn create_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_manage_exams() {
        return Err(AppError::Forbidden(
            "Only Guru can manage questions".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let kind = parse_kind(&payload.kind)?;

    if let Some(choices) = &payload.choices {
        validate_choices(choices)?;
    }
    if let Some(key) = &payload.answer_key {
        validate_answer_key(kind, key)?;
    }
    if let Some(image) = &payload.image {
        validate_image_name(image)?;
    }

    // Reject questions for unknown or removed exams up front.
    let exam_exists =
        sqlx::query_scalar::<_, i64>("SELECT id FROM exams WHERE id = ? AND deleted_at IS NULL")
            .bind(payload.exam_id)
            .fetch_optional(&pool)
            .await?;
    if exam_exists.is_none() {
        return Err(AppError::NotFound("Exam not found".to_string()));
    }

    let choices = payload
        .choices
        .map(|c| serde_json::to_string(&c))
        .transpose()?;

    let result = sqlx::query(
        "INSERT INTO questions (exam_id, kind, prompt, choices, answer_key, image, points)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(payload.exam_id)
    .bind(kind)
    .bind(&payload.prompt)
    .bind(&choices)
    .bind(&payload.answer_key)
    .bind(&payload.image)
    .bind(payload.points.unwrap_or(0))
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    let question = fetch_question(&pool, result.last_insert_rowid()).await?;

    Ok((StatusCode::CREATED, Json(QuestionWithUrl::from(question))))
}

#[derive(Debug, Deserialize)]
pub struct ListQuestionsParams {
    pub exam_id: Option<i64>,
}

async fn list_questions(
    pool: &SqlitePool,
    exam_id: Option<i64>,
) -> Result<Vec<Question>, AppError> {
    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM questions WHERE deleted_at IS NULL");

    if let Some(exam_id) = exam_id {
        builder.push(" AND exam_id = ");
        builder.push_bind(exam_id);
    }

    builder.push(" ORDER BY created_at DESC, id DESC");

    Ok(builder.build_query_as().fetch_all(pool).await?)
}

/// Lists questions with their answer keys. Guru/Admin only.
pub async fn list_for_teacher(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_review_answers() {
        return Err(AppError::Forbidden(
            "Only Guru / Admin can access this endpoint".to_string(),
        ));
    }

    let questions = list_questions(&pool, params.exam_id).await?;
    let data: Vec<QuestionWithUrl> = questions.into_iter().map(Into::into).collect();

    Ok(Json(data))
}

/// Lists questions with answer keys stripped. Siswa only.
pub async fn list_for_student(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<ListQuestionsParams>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_take_exams() {
        return Err(AppError::Forbidden(
            "Only Siswa can access this endpoint".to_string(),
        ));
    }

    let questions = list_questions(&pool, params.exam_id).await?;
    let data: Vec<PublicQuestion> = questions.into_iter().map(Into::into).collect();

    Ok(Json(data))
}

/// Picks one candidate, preferring choice-type questions so the
/// auto-gradable ones are delivered first.
fn pick_candidate(candidates: &[Question]) -> Option<&Question> {
    let mut rng = rand::thread_rng();

    let choice: Vec<&Question> = candidates.iter().filter(|q| q.kind.is_choice()).collect();
    if !choice.is_empty() {
        return choice.choose(&mut rng).copied();
    }

    let free: Vec<&Question> = candidates.iter().filter(|q| !q.kind.is_choice()).collect();
    free.choose(&mut rng).copied()
}

/// Hands the caller one random question they have not answered yet.
/// Siswa only; the exam gate (enrollment + time window) runs first.
///
/// Exhaustion is not an error: once every question is answered the
/// response carries `data: null` so the client can show the exam as done.
pub async fn random_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(exam_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_take_exams() {
        return Err(AppError::Forbidden(
            "Only Siswa can take exams".to_string(),
        ));
    }

    let user_id = claims.user_id();
    validate_participant_access(&pool, exam_id, user_id, Utc::now()).await?;

    let answered: Vec<i64> =
        sqlx::query_scalar("SELECT question_id FROM answers WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&pool)
            .await?;

    let mut builder: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT * FROM questions WHERE deleted_at IS NULL AND exam_id = ");
    builder.push_bind(exam_id);

    if !answered.is_empty() {
        builder.push(" AND id NOT IN (");
        let mut separated = builder.separated(",");
        for id in &answered {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
    }

    let candidates: Vec<Question> = builder.build_query_as().fetch_all(&pool).await?;

    let Some(selected) = pick_candidate(&candidates) else {
        return Ok(Json(json!({
            "message": "All questions have been answered",
            "data": null,
        })));
    };

    let public = PublicQuestion::from(selected.clone());

    Ok(Json(json!({
        "message": "success",
        "data": public,
    })))
}

/// Fetches one question by id. Any authenticated user; the answer key is
/// stripped unless the caller may review answers.
pub async fn get_question(
    State(pool): State<SqlitePool>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<axum::response::Response, AppError> {
    let question = fetch_question(&pool, id).await?;

    if claims.role.can_review_answers() {
        Ok(Json(QuestionWithUrl::from(question)).into_response())
    } else {
        Ok(Json(PublicQuestion::from(question)).into_response())
    }
}

/// Updates a question. Guru only.
///
/// When the point value and/or answer key of a choice-type question
/// changes, every previously submitted answer is re-graded against the
/// new key before the response is returned.
pub async fn update_question(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
    Json(payload): Json<UpdateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_manage_exams() {
        return Err(AppError::Forbidden(
            "Only Guru can manage questions".to_string(),
        ));
    }

    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let existing = fetch_question(&pool, id).await?;

    let kind = match &payload.kind {
        Some(s) => parse_kind(s)?,
        None => existing.kind,
    };

    if let Some(choices) = &payload.choices {
        validate_choices(choices)?;
    }
    if let Some(key) = &payload.answer_key {
        validate_answer_key(kind, key)?;
    }
    if let Some(image) = &payload.image {
        validate_image_name(image)?;
    }

    // Any re-save touching the key or the point value schedules a grading
    // pass, including a re-save with unchanged values; per-answer writes
    // are still skipped when the awarded points did not move.
    let regrade_requested = payload.points.is_some() || payload.answer_key.is_some();

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE questions SET ");
    let mut separated = builder.separated(", ");

    if let Some(kind) = &payload.kind {
        separated.push("kind = ");
        separated.push_bind_unseparated(kind.clone());
    }

    if let Some(prompt) = &payload.prompt {
        separated.push("prompt = ");
        separated.push_bind_unseparated(prompt.clone());
    }

    if let Some(choices) = &payload.choices {
        separated.push("choices = ");
        separated.push_bind_unseparated(serde_json::to_string(choices)?);
    }

    if let Some(key) = &payload.answer_key {
        separated.push("answer_key = ");
        separated.push_bind_unseparated(key.clone());
    }

    if let Some(image) = &payload.image {
        separated.push("image = ");
        separated.push_bind_unseparated(image.clone());
    }

    if let Some(points) = payload.points {
        separated.push("points = ");
        separated.push_bind_unseparated(points);
    }

    separated.push("updated_at = CURRENT_TIMESTAMP");

    builder.push(" WHERE id = ");
    builder.push_bind(id);

    builder.build().execute(&pool).await.map_err(|e| {
        tracing::error!("Failed to update question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    // A replaced attachment leaves its old file orphaned; remove it.
    if let Some(new_image) = &payload.image {
        if let Some(old_image) = &existing.image {
            if new_image != old_image {
                remove_image_file(&config, old_image).await;
            }
        }
    }

    let question = fetch_question(&pool, id).await?;

    if regrade_requested && question.kind.is_choice() {
        grading::regrade_question(&pool, &question).await?;
    }

    Ok(Json(QuestionWithUrl::from(question)))
}

/// Hard-deletes a question together with all answers to it. Guru only.
/// The image attachment, if any, is removed from disk afterwards.
pub async fn delete_question(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_manage_exams() {
        return Err(AppError::Forbidden(
            "Only Guru can manage questions".to_string(),
        ));
    }

    let question = sqlx::query_as::<_, Question>("SELECT * FROM questions WHERE id = ?")
        .bind(id)
        .fetch_optional(&pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM answers WHERE question_id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    sqlx::query("DELETE FROM questions WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await.map_err(|e| {
        tracing::error!("Failed to delete question: {:?}", e);
        AppError::InternalServerError(e.to_string())
    })?;

    if let Some(image) = &question.image {
        remove_image_file(&config, image).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Downloads the image attachment of a question. Any authenticated user.
pub async fn download_image(
    State(pool): State<SqlitePool>,
    State(config): State<Config>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let question = fetch_question(&pool, id).await?;

    let image = question
        .image
        .ok_or_else(|| AppError::NotFound("Question has no image".to_string()))?;

    let path = std::path::Path::new(&config.upload_dir)
        .join("questions")
        .join(&image);

    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|_| AppError::NotFound("Image file not found".to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, "application/octet-stream".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", image),
        ),
    ];

    Ok((headers, bytes))
}

async fn remove_image_file(config: &Config, filename: &str) {
    let path = std::path::Path::new(&config.upload_dir)
        .join("questions")
        .join(filename);
    if let Err(e) = tokio::fs::remove_file(&path).await {
        tracing::warn!("Failed to remove image file {:?}: {}", path, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn question(id: i64, kind: QuestionKind) -> Question {
        let now = Utc::now();
        Question {
            id,
            exam_id: 1,
            kind,
            prompt: format!("Question {}", id),
            choices: None,
            answer_key: None,
            image: None,
            points: 10,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn selection_prefers_choice_questions() {
        let candidates = vec![
            question(1, QuestionKind::SingleChoice),
            question(2, QuestionKind::MultiChoice),
            question(3, QuestionKind::Essay),
        ];

        for _ in 0..50 {
            let picked = pick_candidate(&candidates).unwrap();
            assert!(picked.kind.is_choice(), "essay picked before choice kinds");
        }
    }

    #[test]
    fn selection_falls_back_to_free_response() {
        let candidates = vec![
            question(1, QuestionKind::Essay),
            question(2, QuestionKind::ShortAnswer),
        ];

        let picked = pick_candidate(&candidates).unwrap();
        assert!(!picked.kind.is_choice());
    }

    #[test]
    fn selection_on_empty_set_returns_none() {
        assert!(pick_candidate(&[]).is_none());
    }

    #[test]
    fn image_names_must_stay_inside_the_questions_directory() {
        assert!(validate_image_name("gambar-123-abc.png").is_ok());

        assert!(validate_image_name("").is_err());
        assert!(validate_image_name("../secret.txt").is_err());
        assert!(validate_image_name("..").is_err());
        assert!(validate_image_name("sub/dir.png").is_err());
        assert!(validate_image_name("..\\windows.png").is_err());
    }
}
