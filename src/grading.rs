// src/grading.rs
//
// Point recomputation for choice-type questions. Triggered by question
// edits, never by the initial submission (answers start at 0 points and
// stay there until the owning question is re-saved).

use sqlx::SqlitePool;

use crate::error::AppError;
use crate::models::{
    answer::Answer,
    question::{Question, QuestionKind},
};

/// Returns the points a stored raw answer earns under the given key.
///
/// Single-choice: exact, case-sensitive string equality.
/// Multi-choice: JSON-array set equality, order-independent.
/// Free-response kinds always map to 0; they are graded by hand.
pub fn score_answer(
    kind: QuestionKind,
    submitted: Option<&str>,
    key: Option<&str>,
    points: i64,
) -> i64 {
    match kind {
        QuestionKind::SingleChoice => match (submitted, key) {
            (Some(s), Some(k)) if s == k => points,
            _ => 0,
        },
        QuestionKind::MultiChoice => {
            if sets_equal(submitted.unwrap_or("[]"), key.unwrap_or("[]")) {
                points
            } else {
                0
            }
        }
        QuestionKind::ShortAnswer | QuestionKind::Essay => 0,
    }
}

/// JSON-array set equality: same length and every submitted element present
/// in the key. A parse failure on either side counts as a non-match.
fn sets_equal(submitted: &str, key: &str) -> bool {
    let Ok(submitted) = serde_json::from_str::<Vec<String>>(submitted) else {
        return false;
    };
    let Ok(key) = serde_json::from_str::<Vec<String>>(key) else {
        return false;
    };
    submitted.len() == key.len() && submitted.iter().all(|v| key.contains(v))
}

/// Recomputes `points_awarded` for every answer to `question` and persists
/// the ones whose value changed. Returns the number of rows updated.
///
/// The pass visits every answer; a malformed answer payload scores 0 via
/// [`score_answer`] instead of aborting the loop. Answers inserted while
/// the pass is running are picked up by the next question edit.
pub async fn regrade_question(pool: &SqlitePool, question: &Question) -> Result<u64, AppError> {
    let answers = sqlx::query_as::<_, Answer>("SELECT * FROM answers WHERE question_id = ?")
        .bind(question.id)
        .fetch_all(pool)
        .await?;

    let mut updated = 0;
    for ans in &answers {
        let new_points = score_answer(
            question.kind,
            ans.answer.as_deref(),
            question.answer_key.as_deref(),
            question.points,
        );

        if new_points != ans.points_awarded {
            sqlx::query("UPDATE answers SET points_awarded = ? WHERE id = ?")
                .bind(new_points)
                .bind(ans.id)
                .execute(pool)
                .await?;
            updated += 1;
        }
    }

    if updated > 0 {
        tracing::info!(
            "Re-graded question {}: {}/{} answers updated",
            question.id,
            updated,
            answers.len()
        );
    }

    Ok(updated)
}
