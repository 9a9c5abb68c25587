//! Lesson CRUD operations

use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::guard::{self, LESSONS_IN_CHAPTER};
use crate::error::StoreError;
use crate::ordering;

/// Lesson row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LessonRow {
    pub id: String,
    pub chapter_id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_key: Option<String>,
    pub thumbnail_key: Option<String>,
    pub position: i64,
}

impl LessonRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            chapter_id: row.get("chapter_id")?,
            title: row.get("title")?,
            description: row.get("description")?,
            video_key: row.get("video_key")?,
            thumbnail_key: row.get("thumbnail_key")?,
            position: row.get("position")?,
        })
    }
}

/// Input for creating a lesson
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLessonInput {
    pub chapter_id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub video_key: Option<String>,
    #[serde(default)]
    pub thumbnail_key: Option<String>,
}

/// Create a lesson at the end of its chapter's lesson list.
pub fn create_lesson(
    conn: &mut Connection,
    input: CreateLessonInput,
) -> Result<LessonRow, StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StoreError::Internal(format!("Transaction failed: {}", e)))?;

    let chapter_exists: bool = tx
        .query_row(
            "SELECT 1 FROM chapters WHERE id = ?",
            params![input.chapter_id],
            |_| Ok(true),
        )
        .unwrap_or(false);
    if !chapter_exists {
        return Err(StoreError::NotFound(format!(
            "chapter {} not found",
            input.chapter_id
        )));
    }

    let siblings = guard::children_of(&tx, LESSONS_IN_CHAPTER, &input.chapter_id)?;
    let positions: Vec<i64> = siblings.iter().map(|(_, p)| *p).collect();
    let position = ordering::next_position(&positions);

    let id = uuid::Uuid::new_v4().to_string();
    tx.execute(
        r#"
        INSERT INTO lessons (id, chapter_id, title, description, video_key, thumbnail_key, position)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            id,
            input.chapter_id,
            input.title,
            input.description,
            input.video_key,
            input.thumbnail_key,
            position,
        ],
    )
    .map_err(|e| StoreError::Internal(format!("Lesson insert failed: {}", e)))?;

    tx.commit()
        .map_err(|e| StoreError::Internal(format!("Commit failed: {}", e)))?;

    get_lesson(conn, &id)?
        .ok_or_else(|| StoreError::Internal("Lesson not found after insert".to_string()))
}

/// Get lesson by ID
pub fn get_lesson(conn: &Connection, id: &str) -> Result<Option<LessonRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT * FROM lessons WHERE id = ?")
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![id])
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?;

    if let Some(row) = rows
        .next()
        .map_err(|e| StoreError::Internal(format!("Row fetch failed: {}", e)))?
    {
        let lesson = LessonRow::from_row(row)
            .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;
        Ok(Some(lesson))
    } else {
        Ok(None)
    }
}

/// Get all lessons of a chapter, ordered by position
pub fn get_lessons_for_chapter(
    conn: &Connection,
    chapter_id: &str,
) -> Result<Vec<LessonRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT * FROM lessons WHERE chapter_id = ? ORDER BY position, id")
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let lessons: Vec<LessonRow> = stmt
        .query_map(params![chapter_id], |row| LessonRow::from_row(row))
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;

    Ok(lessons)
}

/// Delete a lesson and renumber its chapter's remaining lessons, in one
/// transaction. `chapter_id` is the caller's scope claim.
pub fn delete_lesson(
    conn: &mut Connection,
    chapter_id: &str,
    lesson_id: &str,
) -> Result<(), StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StoreError::Internal(format!("Transaction failed: {}", e)))?;

    guard::verify_child(&tx, LESSONS_IN_CHAPTER, chapter_id, lesson_id)?;

    tx.execute("DELETE FROM lessons WHERE id = ?", params![lesson_id])
        .map_err(|e| StoreError::Internal(format!("Lesson delete failed: {}", e)))?;

    renumber_lessons(&tx, chapter_id)?;

    tx.commit()
        .map_err(|e| StoreError::Internal(format!("Commit failed: {}", e)))?;

    debug!(chapter = %chapter_id, lesson = %lesson_id, "Deleted lesson");
    Ok(())
}

/// Rewrite the chapter's lesson positions as 0..n-1, preserving order.
fn renumber_lessons(conn: &Connection, chapter_id: &str) -> Result<(), StoreError> {
    let remaining = guard::children_of(conn, LESSONS_IN_CHAPTER, chapter_id)?;
    let ordered_ids: Vec<String> = remaining.into_iter().map(|(id, _)| id).collect();

    for (id, position) in ordering::renumber(&ordered_ids) {
        conn.execute(
            "UPDATE lessons SET position = ? WHERE id = ?",
            params![position, id],
        )
        .map_err(|e| StoreError::Internal(format!("Renumber failed: {}", e)))?;
    }

    Ok(())
}
