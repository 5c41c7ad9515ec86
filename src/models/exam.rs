// src/models/exam.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use validator::Validate;

/// Represents the 'exams' table in the database.
///
/// An exam is a time-boxed, enrollment-gated container of questions.
/// The participant list is stored as a JSON-encoded array of user ids in a
/// single TEXT column; decoding happens at the boundary and a malformed
/// value is treated as the empty set, so a corrupted roster locks the exam
/// rather than opening it to everyone.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Exam {
    pub id: i64,

    /// Owning class-offering (class/term pairing, managed elsewhere).
    pub class_term_id: i64,

    /// Exam kind, e.g. 'UTS' or 'UAS'. Free text.
    pub kind: String,

    /// JSON array of user ids allowed to take this exam.
    #[serde(serialize_with = "serialize_participants")]
    pub participants: String,

    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Exam {
    /// Decodes the participant list, failing closed on malformed JSON.
    pub fn participant_ids(&self) -> Vec<i64> {
        serde_json::from_str(&self.participants).unwrap_or_default()
    }

    pub fn is_enrolled(&self, user_id: i64) -> bool {
        self.participant_ids().contains(&user_id)
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        now >= self.start_at
    }

    pub fn has_ended(&self, now: DateTime<Utc>) -> bool {
        now > self.end_at
    }
}

/// Exposes the roster as a JSON array rather than the raw TEXT column.
fn serialize_participants<S: Serializer>(raw: &String, s: S) -> Result<S::Ok, S::Error> {
    let ids: Vec<i64> = serde_json::from_str(raw).unwrap_or_default();
    ids.serialize(s)
}

/// DTO for creating an exam.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateExamRequest {
    pub class_term_id: i64,
    #[validate(length(min = 1, max = 50))]
    pub kind: String,
    pub participants: Vec<i64>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
}

/// DTO for updating an exam. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateExamRequest {
    pub class_term_id: Option<i64>,
    #[validate(length(min = 1, max = 50))]
    pub kind: Option<String>,
    pub participants: Option<Vec<i64>>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}
