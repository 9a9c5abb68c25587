//! Chapter CRUD operations
//!
//! Chapters are ordered within their course. Inserts take the next free
//! position; deletes renumber the remaining siblings in the same transaction.

use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::guard::{self, CHAPTERS_IN_COURSE};
use crate::db::lessons::LessonRow;
use crate::error::StoreError;
use crate::ordering;

/// Chapter row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChapterRow {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub position: i64,
}

impl ChapterRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            course_id: row.get("course_id")?,
            title: row.get("title")?,
            position: row.get("position")?,
        })
    }
}

/// Chapter with its lessons, ordered by position
#[derive(Debug, Clone, Serialize)]
pub struct ChapterWithLessons {
    pub chapter: ChapterRow,
    pub lessons: Vec<LessonRow>,
}

/// Input for creating a chapter
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChapterInput {
    pub course_id: String,
    pub title: String,
}

/// Create a chapter at the end of its course's chapter list.
pub fn create_chapter(
    conn: &mut Connection,
    input: CreateChapterInput,
) -> Result<ChapterRow, StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StoreError::Internal(format!("Transaction failed: {}", e)))?;

    let course_exists: bool = tx
        .query_row(
            "SELECT 1 FROM courses WHERE id = ?",
            params![input.course_id],
            |_| Ok(true),
        )
        .unwrap_or(false);
    if !course_exists {
        return Err(StoreError::NotFound(format!(
            "course {} not found",
            input.course_id
        )));
    }

    let siblings = guard::children_of(&tx, CHAPTERS_IN_COURSE, &input.course_id)?;
    let positions: Vec<i64> = siblings.iter().map(|(_, p)| *p).collect();
    let position = ordering::next_position(&positions);

    let id = uuid::Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO chapters (id, course_id, title, position) VALUES (?, ?, ?, ?)",
        params![id, input.course_id, input.title, position],
    )
    .map_err(|e| StoreError::Internal(format!("Chapter insert failed: {}", e)))?;

    tx.commit()
        .map_err(|e| StoreError::Internal(format!("Commit failed: {}", e)))?;

    get_chapter(conn, &id)?
        .ok_or_else(|| StoreError::Internal("Chapter not found after insert".to_string()))
}

/// Get chapter by ID
pub fn get_chapter(conn: &Connection, id: &str) -> Result<Option<ChapterRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT * FROM chapters WHERE id = ?")
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![id])
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?;

    if let Some(row) = rows
        .next()
        .map_err(|e| StoreError::Internal(format!("Row fetch failed: {}", e)))?
    {
        let chapter = ChapterRow::from_row(row)
            .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;
        Ok(Some(chapter))
    } else {
        Ok(None)
    }
}

/// Get all chapters of a course, ordered by position
pub fn get_chapters_for_course(
    conn: &Connection,
    course_id: &str,
) -> Result<Vec<ChapterRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT * FROM chapters WHERE course_id = ? ORDER BY position, id")
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let chapters: Vec<ChapterRow> = stmt
        .query_map(params![course_id], |row| ChapterRow::from_row(row))
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;

    Ok(chapters)
}

/// Delete a chapter and its lessons, then renumber the course's remaining
/// chapters, all in one transaction.
///
/// `course_id` is the caller's scope claim; a mismatch with the stored parent
/// fails before anything is touched.
pub fn delete_chapter(
    conn: &mut Connection,
    course_id: &str,
    chapter_id: &str,
) -> Result<(), StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StoreError::Internal(format!("Transaction failed: {}", e)))?;

    guard::verify_child(&tx, CHAPTERS_IN_COURSE, course_id, chapter_id)?;

    tx.execute("DELETE FROM lessons WHERE chapter_id = ?", params![chapter_id])
        .map_err(|e| StoreError::Internal(format!("Lesson cascade failed: {}", e)))?;

    tx.execute("DELETE FROM chapters WHERE id = ?", params![chapter_id])
        .map_err(|e| StoreError::Internal(format!("Chapter delete failed: {}", e)))?;

    renumber_chapters(&tx, course_id)?;

    tx.commit()
        .map_err(|e| StoreError::Internal(format!("Commit failed: {}", e)))?;

    debug!(course = %course_id, chapter = %chapter_id, "Deleted chapter");
    Ok(())
}

/// Rewrite the course's chapter positions as 0..n-1, preserving order.
fn renumber_chapters(conn: &Connection, course_id: &str) -> Result<(), StoreError> {
    let remaining = guard::children_of(conn, CHAPTERS_IN_COURSE, course_id)?;
    let ordered_ids: Vec<String> = remaining.into_iter().map(|(id, _)| id).collect();

    for (id, position) in ordering::renumber(&ordered_ids) {
        conn.execute(
            "UPDATE chapters SET position = ? WHERE id = ?",
            params![position, id],
        )
        .map_err(|e| StoreError::Internal(format!("Renumber failed: {}", e)))?;
    }

    Ok(())
}
