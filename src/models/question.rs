// src/models/question.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use sqlx::FromRow;
use validator::Validate;

/// Closed set of question kinds, stored by their canonical names.
///
/// Choice kinds are mechanically gradable; short-answer and essay require
/// human judgment and are never auto-graded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum QuestionKind {
    #[serde(rename = "pilihan_ganda_satu")]
    #[sqlx(rename = "pilihan_ganda_satu")]
    SingleChoice,
    #[serde(rename = "pilihan_ganda_banyak")]
    #[sqlx(rename = "pilihan_ganda_banyak")]
    MultiChoice,
    #[serde(rename = "isian")]
    #[sqlx(rename = "isian")]
    ShortAnswer,
    #[serde(rename = "uraian")]
    #[sqlx(rename = "uraian")]
    Essay,
}

impl QuestionKind {
    pub fn is_choice(self) -> bool {
        matches!(self, QuestionKind::SingleChoice | QuestionKind::MultiChoice)
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pilihan_ganda_satu" => Some(QuestionKind::SingleChoice),
            "pilihan_ganda_banyak" => Some(QuestionKind::MultiChoice),
            "isian" => Some(QuestionKind::ShortAnswer),
            "uraian" => Some(QuestionKind::Essay),
            _ => None,
        }
    }
}

/// Represents the 'questions' table in the database.
///
/// Serializing this struct exposes the answer key, so it is reserved for
/// teacher/admin responses; students get [`PublicQuestion`].
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Question {
    pub id: i64,
    pub exam_id: i64,
    pub kind: QuestionKind,
    pub prompt: String,

    /// JSON array of candidate choices, NULL for free-response kinds.
    #[serde(serialize_with = "serialize_choices")]
    pub choices: Option<String>,

    /// Plain string for single-choice/short-answer, JSON array text for
    /// multi-choice.
    pub answer_key: Option<String>,

    /// Stored filename of the image attachment, if any.
    pub image: Option<String>,

    /// Point value in [0, 100].
    pub points: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Question {
    /// Decodes the choice list, treating malformed JSON as no choices.
    pub fn choice_list(&self) -> Option<Vec<String>> {
        self.choices
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

fn serialize_choices<S: Serializer>(raw: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
    let choices: Option<Vec<String>> = raw.as_deref().and_then(|r| serde_json::from_str(r).ok());
    choices.serialize(s)
}

/// DTO for sending a question to an exam-taker. The answer key is stripped.
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    pub exam_id: i64,
    pub kind: QuestionKind,
    pub prompt: String,
    pub choices: Option<Vec<String>>,
    pub image: Option<String>,
    pub image_url: Option<String>,
    pub points: i64,
}

impl From<Question> for PublicQuestion {
    fn from(q: Question) -> Self {
        let choices = q.choice_list();
        let image_url = q
            .image
            .as_deref()
            .map(|f| format!("/uploads/questions/{}", f));
        PublicQuestion {
            id: q.id,
            exam_id: q.exam_id,
            kind: q.kind,
            prompt: q.prompt,
            choices,
            image: q.image,
            image_url,
            points: q.points,
        }
    }
}

/// DTO for creating a new question.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateQuestionRequest {
    pub exam_id: i64,
    /// One of the canonical kind names.
    pub kind: String,
    #[validate(length(min = 1, max = 2000))]
    pub prompt: String,
    pub choices: Option<Vec<String>>,
    pub answer_key: Option<String>,
    /// Stored filename returned by the upload endpoint.
    pub image: Option<String>,
    #[validate(range(min = 0, max = 100, message = "points must be between 0 and 100"))]
    pub points: Option<i64>,
}

/// DTO for updating a question. Fields are optional.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateQuestionRequest {
    pub kind: Option<String>,
    #[validate(length(min = 1, max = 2000))]
    pub prompt: Option<String>,
    pub choices: Option<Vec<String>>,
    pub answer_key: Option<String>,
    pub image: Option<String>,
    #[validate(range(min = 0, max = 100, message = "points must be between 0 and 100"))]
    pub points: Option<i64>,
}
