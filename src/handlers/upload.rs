// src/handlers/upload.rs

use axum::{Extension, Json, extract::Multipart, extract::State, http::StatusCode, response::IntoResponse};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{config::Config, error::AppError, utils::jwt::Claims};

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Accepts a question image upload and returns the stored filename.
/// Guru only. Images only, one file per request.
///
/// Questions reference the returned filename in their `image` field; the
/// file itself is served under /uploads/questions/.
pub async fn upload_question_image(
    State(config): State<Config>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, AppError> {
    if !claims.role.can_manage_exams() {
        return Err(AppError::Forbidden(
            "Only Guru can upload question images".to_string(),
        ));
    }

    let mut stored: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("gambar") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(|s| s.to_string())
            .ok_or_else(|| AppError::BadRequest("Missing file name".to_string()))?;

        let extension = std::path::Path::new(&file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(AppError::BadRequest(
                "Only image files (jpg, jpeg, png, gif) are allowed".to_string(),
            ));
        }

        let is_image = field
            .content_type()
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Err(AppError::BadRequest(
                "Only image files (jpg, jpeg, png, gif) are allowed".to_string(),
            ));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let filename = format!(
            "gambar-{}-{}.{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4(),
            extension
        );

        let dir = std::path::Path::new(&config.upload_dir).join("questions");
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;
        tokio::fs::write(dir.join(&filename), &bytes)
            .await
            .map_err(|e| AppError::InternalServerError(e.to_string()))?;

        stored = Some(filename);
        break;
    }

    let filename =
        stored.ok_or_else(|| AppError::BadRequest("Missing 'gambar' file field".to_string()))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "filename": filename,
            "url": format!("/uploads/questions/{}", filename),
        })),
    ))
}
