// src/models/answer.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Represents the 'answers' table in the database.
///
/// One row per (participant, question) pair, enforced by a UNIQUE
/// constraint. `points_awarded` is derived state: it starts at 0 and is
/// only recomputed by the re-grading pass when the question's answer key
/// or point value changes.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Answer {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,

    /// Raw answer payload: a choice label, JSON array text for
    /// multi-choice, or free text.
    pub answer: Option<String>,

    pub points_awarded: i64,

    pub status: Option<String>,
    pub note: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// DTO for submitting an answer. The participant id comes from the
/// authenticated session, never from the body.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswerRequest {
    pub question_id: Option<i64>,
    pub answer: Option<String>,
    pub status: Option<String>,
    pub note: Option<String>,
}
