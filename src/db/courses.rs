//! Course CRUD operations

use chrono::Utc;
use rusqlite::{params, Connection, Row, TransactionBehavior};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::{chapters, lessons};
use crate::error::StoreError;

/// Course row from database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub slug: String,
    pub small_description: Option<String>,
    pub description: Option<String>,
    pub file_key: Option<String>,
    pub category: String,
    pub level: String,
    pub duration: i64,
    pub price: i64,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl CourseRow {
    fn from_row(row: &Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            user_id: row.get("user_id")?,
            title: row.get("title")?,
            slug: row.get("slug")?,
            small_description: row.get("small_description")?,
            description: row.get("description")?,
            file_key: row.get("file_key")?,
            category: row.get("category")?,
            level: row.get("level")?,
            duration: row.get("duration")?,
            price: row.get("price")?,
            status: row.get("status")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// Input for creating a course
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCourseInput {
    pub user_id: String,
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub small_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub price: i64,
    #[serde(default = "default_status")]
    pub status: String,
}

impl Default for CreateCourseInput {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            title: String::new(),
            slug: String::new(),
            small_description: None,
            description: None,
            file_key: None,
            category: default_category(),
            level: default_level(),
            duration: 0,
            price: 0,
            status: default_status(),
        }
    }
}

fn default_category() -> String {
    "general".to_string()
}
fn default_level() -> String {
    "beginner".to_string()
}
fn default_status() -> String {
    "draft".to_string()
}

/// Input for updating course metadata (full form replacement)
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCourseInput {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub small_description: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub file_key: Option<String>,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub price: i64,
    #[serde(default = "default_status")]
    pub status: String,
}

/// Create a course
pub fn create_course(
    conn: &mut Connection,
    input: CreateCourseInput,
) -> Result<CourseRow, StoreError> {
    let id = uuid::Uuid::new_v4().to_string();

    conn.execute(
        r#"
        INSERT INTO courses (
            id, user_id, title, slug, small_description, description,
            file_key, category, level, duration, price, status
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            id,
            input.user_id,
            input.title,
            input.slug,
            input.small_description,
            input.description,
            input.file_key,
            input.category,
            input.level,
            input.duration,
            input.price,
            input.status,
        ],
    )
    .map_err(|e| StoreError::Internal(format!("Course insert failed: {}", e)))?;

    get_course(conn, &id)?
        .ok_or_else(|| StoreError::Internal("Course not found after insert".to_string()))
}

/// Get course by ID
pub fn get_course(conn: &Connection, id: &str) -> Result<Option<CourseRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT * FROM courses WHERE id = ?")
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let mut rows = stmt
        .query(params![id])
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?;

    if let Some(row) = rows
        .next()
        .map_err(|e| StoreError::Internal(format!("Row fetch failed: {}", e)))?
    {
        let course = CourseRow::from_row(row)
            .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;
        Ok(Some(course))
    } else {
        Ok(None)
    }
}

/// List courses with pagination
pub fn list_courses(
    conn: &Connection,
    limit: u32,
    offset: u32,
) -> Result<Vec<CourseRow>, StoreError> {
    let mut stmt = conn
        .prepare("SELECT * FROM courses ORDER BY created_at DESC, id LIMIT ? OFFSET ?")
        .map_err(|e| StoreError::Internal(format!("Prepare failed: {}", e)))?;

    let courses: Vec<CourseRow> = stmt
        .query_map(params![limit as i64, offset as i64], |row| {
            CourseRow::from_row(row)
        })
        .map_err(|e| StoreError::Internal(format!("Query failed: {}", e)))?
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| StoreError::Internal(format!("Row parse failed: {}", e)))?;

    Ok(courses)
}

/// Update course metadata.
///
/// `owner` is the acting principal's id; `None` means the caller holds
/// elevated privilege and skips the ownership check.
pub fn update_course(
    conn: &mut Connection,
    id: &str,
    owner: Option<&str>,
    input: UpdateCourseInput,
) -> Result<CourseRow, StoreError> {
    check_ownership(conn, id, owner)?;

    let updated_at = Utc::now().to_rfc3339();
    conn.execute(
        r#"
        UPDATE courses SET
            title = ?, slug = ?, small_description = ?, description = ?,
            file_key = ?, category = ?, level = ?, duration = ?, price = ?,
            status = ?, updated_at = ?
        WHERE id = ?
        "#,
        params![
            input.title,
            input.slug,
            input.small_description,
            input.description,
            input.file_key,
            input.category,
            input.level,
            input.duration,
            input.price,
            input.status,
            updated_at,
            id,
        ],
    )
    .map_err(|e| StoreError::Internal(format!("Course update failed: {}", e)))?;

    get_course(conn, id)?
        .ok_or_else(|| StoreError::Internal("Course not found after update".to_string()))
}

/// Delete a course with its chapters and their lessons, in one transaction.
pub fn delete_course(
    conn: &mut Connection,
    id: &str,
    owner: Option<&str>,
) -> Result<(), StoreError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .map_err(|e| StoreError::Internal(format!("Transaction failed: {}", e)))?;

    check_ownership(&tx, id, owner)?;

    tx.execute(
        "DELETE FROM lessons WHERE chapter_id IN (SELECT id FROM chapters WHERE course_id = ?)",
        params![id],
    )
    .map_err(|e| StoreError::Internal(format!("Lesson cascade failed: {}", e)))?;

    tx.execute("DELETE FROM chapters WHERE course_id = ?", params![id])
        .map_err(|e| StoreError::Internal(format!("Chapter cascade failed: {}", e)))?;

    tx.execute("DELETE FROM courses WHERE id = ?", params![id])
        .map_err(|e| StoreError::Internal(format!("Course delete failed: {}", e)))?;

    tx.commit()
        .map_err(|e| StoreError::Internal(format!("Commit failed: {}", e)))?;

    debug!(course = %id, "Deleted course subtree");
    Ok(())
}

/// Verify the course exists and, when `owner` is given, that it owns the row.
fn check_ownership(conn: &Connection, id: &str, owner: Option<&str>) -> Result<(), StoreError> {
    let stored: Option<String> = conn
        .query_row("SELECT user_id FROM courses WHERE id = ?", params![id], |row| {
            row.get(0)
        })
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(StoreError::Internal(format!("Query failed: {}", other))),
        })?;

    match stored {
        None => Err(StoreError::NotFound(format!("course {} not found", id))),
        Some(user_id) => match owner {
            Some(acting) if acting != user_id => Err(StoreError::Unauthorized(format!(
                "course {} belongs to another author",
                id
            ))),
            _ => Ok(()),
        },
    }
}

/// Course with its full chapter/lesson tree, ordered by position
#[derive(Debug, Clone, Serialize)]
pub struct CourseStructure {
    pub course: CourseRow,
    pub chapters: Vec<chapters::ChapterWithLessons>,
}

/// Get a course with all chapters and their lessons
pub fn get_course_structure(
    conn: &Connection,
    id: &str,
) -> Result<Option<CourseStructure>, StoreError> {
    let course = match get_course(conn, id)? {
        Some(c) => c,
        None => return Ok(None),
    };

    let chapter_rows = chapters::get_chapters_for_course(conn, id)?;
    let mut chapters_out = Vec::with_capacity(chapter_rows.len());
    for chapter in chapter_rows {
        let lessons = lessons::get_lessons_for_chapter(conn, &chapter.id)?;
        chapters_out.push(chapters::ChapterWithLessons { chapter, lessons });
    }

    Ok(Some(CourseStructure {
        course,
        chapters: chapters_out,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CourseDb, CreateChapterInput, CreateLessonInput};

    fn input(slug: &str) -> CreateCourseInput {
        CreateCourseInput {
            user_id: "author-1".into(),
            title: "Course".into(),
            slug: slug.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_and_fetch_roundtrip() {
        let db = CourseDb::open_in_memory().unwrap();
        let course = db
            .with_conn_mut(|conn| create_course(conn, input("slug-a")))
            .unwrap();
        assert_eq!(course.status, "draft");
        assert_eq!(course.level, "beginner");

        let fetched = db
            .with_conn(|conn| get_course(conn, &course.id))
            .unwrap()
            .unwrap();
        assert_eq!(fetched.slug, "slug-a");
    }

    #[test]
    fn update_requires_owner() {
        let db = CourseDb::open_in_memory().unwrap();
        let course = db
            .with_conn_mut(|conn| create_course(conn, input("slug-b")))
            .unwrap();

        let update = UpdateCourseInput {
            title: "New Title".into(),
            slug: "slug-b".into(),
            small_description: None,
            description: None,
            file_key: None,
            category: "general".into(),
            level: "beginner".into(),
            duration: 2,
            price: 0,
            status: "published".into(),
        };

        let err = db
            .with_conn_mut(|conn| {
                update_course(conn, &course.id, Some("someone-else"), update.clone())
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::Unauthorized(_)));

        let updated = db
            .with_conn_mut(|conn| update_course(conn, &course.id, Some("author-1"), update))
            .unwrap();
        assert_eq!(updated.title, "New Title");
        assert_eq!(updated.status, "published");
    }

    #[test]
    fn update_missing_course_is_not_found() {
        let db = CourseDb::open_in_memory().unwrap();
        let err = db
            .with_conn_mut(|conn| {
                update_course(
                    conn,
                    "ghost",
                    None,
                    UpdateCourseInput {
                        title: "T".into(),
                        slug: "s".into(),
                        small_description: None,
                        description: None,
                        file_key: None,
                        category: "general".into(),
                        level: "beginner".into(),
                        duration: 0,
                        price: 0,
                        status: "draft".into(),
                    },
                )
            })
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[test]
    fn delete_cascades_whole_subtree() {
        let db = CourseDb::open_in_memory().unwrap();
        let course = db
            .with_conn_mut(|conn| create_course(conn, input("slug-c")))
            .unwrap();

        db.with_conn_mut(|conn| {
            let chapter = crate::db::chapters::create_chapter(
                conn,
                CreateChapterInput {
                    course_id: course.id.clone(),
                    title: "Ch".into(),
                },
            )?;
            for title in ["L1", "L2", "L3"] {
                crate::db::lessons::create_lesson(
                    conn,
                    CreateLessonInput {
                        chapter_id: chapter.id.clone(),
                        title: title.into(),
                        ..Default::default()
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();

        db.with_conn_mut(|conn| delete_course(conn, &course.id, Some("author-1")))
            .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.course_count, 0);
        assert_eq!(stats.chapter_count, 0);
        assert_eq!(stats.lesson_count, 0);
    }

    #[test]
    fn structure_lists_children_in_position_order() {
        let db = CourseDb::open_in_memory().unwrap();
        let course = db
            .with_conn_mut(|conn| create_course(conn, input("slug-d")))
            .unwrap();

        db.with_conn_mut(|conn| {
            for title in ["First", "Second"] {
                crate::db::chapters::create_chapter(
                    conn,
                    CreateChapterInput {
                        course_id: course.id.clone(),
                        title: title.into(),
                    },
                )?;
            }
            Ok(())
        })
        .unwrap();

        let structure = db
            .with_conn(|conn| get_course_structure(conn, &course.id))
            .unwrap()
            .unwrap();
        assert_eq!(structure.chapters.len(), 2);
        assert_eq!(structure.chapters[0].chapter.title, "First");
        assert_eq!(structure.chapters[0].chapter.position, 0);
        assert_eq!(structure.chapters[1].chapter.position, 1);
    }
}
